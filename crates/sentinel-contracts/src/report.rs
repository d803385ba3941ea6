//! Structured outputs of the verifier, the attestor, and the dispatcher.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Integrity ─────────────────────────────────────────────────────────────────

/// One ledger entry whose stored data disagrees with the hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperedLogRecord {
    pub log_id: u64,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    /// What the chain says `previous_hash` should be.
    pub expected_previous_hash: Option<String>,
    pub stored_previous_hash: Option<String>,
    /// Human-readable description of every mismatch found on this entry.
    pub issue: String,
}

/// Result of replaying the whole ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub total_logs: u64,
    pub verified_logs: u64,
    pub tampered_logs: Vec<TamperedLogRecord>,
    pub message: String,
    /// Stored `entry_hash` of the last entry; `None` for an empty ledger.
    pub head_hash: Option<String>,
}

// ── Immutability ──────────────────────────────────────────────────────────────

/// Whether a storage-layer write block is in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProtectionStatus {
    Active,
    Missing,
    /// The storage layer could not be inspected.
    Unknown,
}

impl fmt::Display for ProtectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtectionStatus::Active => "ACTIVE",
            ProtectionStatus::Missing => "MISSING",
            ProtectionStatus::Unknown => "UNKNOWN",
        })
    }
}

/// Which write path a mechanism blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionKind {
    BlocksDelete,
    BlocksUpdate,
}

/// A write-blocking mechanism discovered by inspecting the store itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionMechanism {
    /// The store's own name for the mechanism, e.g. a trigger name.
    pub name: String,
    pub kind: ProtectionKind,
    /// The definition as reported by the store.
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutabilityReport {
    pub delete_protection: ProtectionStatus,
    pub update_protection: ProtectionStatus,
    pub is_fully_protected: bool,
    pub mechanisms: Vec<ProtectionMechanism>,
    pub message: String,
}

// ── Notification ──────────────────────────────────────────────────────────────

/// What a `NotificationSender` reports for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub success: bool,
    pub error: Option<String>,
}

impl DeliveryReceipt {
    pub fn delivered() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate result of dispatching one alert.
///
/// `success` means delivery was attempted to a non-empty audience, not that
/// every send went through; compare `success_count` with `recipients_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub success: bool,
    pub recipients_count: usize,
    pub success_count: usize,
    pub message: Option<String>,
}

impl DispatchOutcome {
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: false,
            recipients_count: 0,
            success_count: 0,
            message: Some(message.into()),
        }
    }
}
