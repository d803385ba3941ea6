//! The ledger writer: the only path that creates ledger entries.
//!
//! `LedgerWriter::append` validates the event, then asks the store to run
//! the sealing step under its exclusive tail lock. Reading the tail hash,
//! computing the new hash, and inserting the row therefore happen in one
//! atomic unit, and two concurrent appends can never link to the same
//! predecessor.

use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::Datelike;
use tracing::{debug, warn};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    ledger::{EntryStatus, LedgerEntry, LedgerEvent},
};
use sentinel_core::traits::LedgerStore;

use crate::chain::compute_entry_hash;

pub struct LedgerWriter {
    store: Arc<dyn LedgerStore>,
}

impl LedgerWriter {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Append one event to the ledger and return the committed entry.
    ///
    /// Either a correctly linked entry is committed or nothing is. If the
    /// store is unavailable the error is returned and the event is lost;
    /// there is no retry queue.
    pub fn append(&self, event: LedgerEvent) -> SentinelResult<LedgerEntry> {
        validate_event(&event)?;

        let timestamp = event.normalized_timestamp();
        let entry = self
            .store
            .append(&mut |id, tail_hash| seal_entry(id, tail_hash, &event, timestamp))
            .inspect_err(|e| {
                warn!(action = %event.action, error = %e, "ledger append failed");
            })?;

        debug!(
            entry_id = entry.id,
            action = %entry.action,
            entry_hash = %entry.entry_hash,
            "ledger entry appended"
        );
        Ok(entry)
    }
}

/// Build the full entry for slot `id`, linked to `tail_hash`.
fn seal_entry(
    id: u64,
    tail_hash: Option<&str>,
    event: &LedgerEvent,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> LedgerEntry {
    let mut entry = LedgerEntry {
        id,
        timestamp,
        actor_id: event.actor_id,
        action: event.action.clone(),
        resource_type: event.resource_type.clone(),
        resource_id: event.resource_id.clone(),
        status: event.status,
        error_message: event.error_message.clone(),
        metadata: event.metadata.clone(),
        previous_hash: tail_hash.map(str::to_string),
        entry_hash: String::new(),
    };
    entry.entry_hash = compute_entry_hash(&entry);
    entry
}

/// Years a timestamp can carry and still round-trip as four-digit RFC 3339.
const LEDGER_YEARS: RangeInclusive<i32> = 0..=9999;

/// Reject events that would produce an unreadable audit trail.
///
/// `action` must be namespaced: at least two non-empty dot-separated
/// segments, e.g. `phi.view` or `security_alert.resolve`. The timestamp
/// must fall within years 0000 to 9999; a committed row can never be
/// removed, so one unreadable timestamp would break every later read.
pub fn validate_event(event: &LedgerEvent) -> SentinelResult<()> {
    let action = event.action.trim();
    if action.is_empty() {
        return Err(SentinelError::validation("ledger event action is required"));
    }
    let segments: Vec<&str> = action.split('.').collect();
    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return Err(SentinelError::validation(format!(
            "ledger event action '{}' must be namespaced as <namespace>.<verb>",
            event.action
        )));
    }
    if event.resource_type.trim().is_empty() {
        return Err(SentinelError::validation("ledger event resource_type is required"));
    }
    if !LEDGER_YEARS.contains(&event.timestamp.year()) {
        return Err(SentinelError::validation(format!(
            "ledger event timestamp {} is outside years 0000-9999",
            event.timestamp
        )));
    }
    if event.status == EntryStatus::Error
        && event.error_message.as_deref().map_or(true, |m| m.trim().is_empty())
    {
        return Err(SentinelError::validation(
            "ledger event with status error must carry an error_message",
        ));
    }
    Ok(())
}
