//! Ledger entry types.
//!
//! `LedgerEvent` is what callers hand to the writer. `LedgerEntry` is what
//! the store holds once the writer has assigned an id and linked the event
//! into the chain. Entries are never updated or deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SentinelError;

/// Outcome of the audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Error,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Success => "success",
            EntryStatus::Error => "error",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(EntryStatus::Success),
            "error" => Ok(EntryStatus::Error),
            other => Err(SentinelError::validation(format!(
                "invalid entry status '{other}': expected success or error"
            ))),
        }
    }
}

/// A security-relevant event waiting to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// When the event happened. Truncated to microseconds by the writer.
    pub timestamp: DateTime<Utc>,
    /// The acting user, or `None` for system-originated events.
    pub actor_id: Option<i64>,
    /// Namespaced action, e.g. `"phi.view"`.
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub status: EntryStatus,
    pub error_message: Option<String>,
    /// Opaque payload, stored verbatim.
    pub metadata: Value,
}

impl LedgerEvent {
    /// A successful, system-originated event stamped with the current time.
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_id: None,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            status: EntryStatus::Success,
            error_message: None,
            metadata: Value::Null,
        }
    }

    pub fn actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Mark the event as a failed action.
    pub fn failed(mut self, error_message: impl Into<String>) -> Self {
        self.status = EntryStatus::Error;
        self.error_message = Some(error_message.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The timestamp at the precision every backend can store exactly.
    pub fn normalized_timestamp(&self) -> DateTime<Utc> {
        self.timestamp.trunc_subsecs(6)
    }
}

/// One immutable, hash-linked row of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Store-assigned sequence number, starting at 1 and never reused.
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<i64>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub status: EntryStatus,
    pub error_message: Option<String>,
    pub metadata: Value,
    /// `entry_hash` of entry `id - 1`; `None` only for the genesis entry.
    pub previous_hash: Option<String>,
    /// Lowercase hex SHA-256 over every other field plus `previous_hash`.
    pub entry_hash: String,
}

impl LedgerEntry {
    pub fn is_genesis(&self) -> bool {
        self.id == 1
    }
}
