//! Integrity verification: replay the ledger and recompute every link.
//!
//! The verifier treats stored rows as untrusted input. Nothing the writer
//! recorded about validity is consulted; both rules are recomputed from
//! scratch for every entry:
//!
//! 1. **Linkage**: an entry's `previous_hash` equals its predecessor's
//!    `entry_hash` (`None` for the genesis entry), and ids are contiguous.
//! 2. **Self-hash**: an entry's `entry_hash` equals the hash recomputed
//!    from its own fields.
//!
//! A broken link is attributed to the entry whose stored data disagrees
//! with the chain. If a predecessor's `entry_hash` column alone was
//! overwritten, its successor still links to the hash recomputed from the
//! predecessor's fields and is not reported.

use std::sync::Arc;

use tracing::{error, info, warn};

use sentinel_contracts::{
    error::SentinelResult,
    ledger::LedgerEntry,
    report::{IntegrityReport, TamperedLogRecord},
};
use sentinel_core::traits::LedgerStore;

use crate::chain::compute_entry_hash;

pub struct IntegrityVerifier {
    store: Arc<dyn LedgerStore>,
}

impl IntegrityVerifier {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Read every entry in ascending id order and verify the chain.
    ///
    /// Read-only. A store failure is returned as an error; tampering is not
    /// an error and is reported in `IntegrityReport::tampered_logs`.
    pub fn verify(&self) -> SentinelResult<IntegrityReport> {
        let entries = self.store.entries()?;
        let report = verify_entries(&entries);

        if report.is_valid {
            info!(total_logs = report.total_logs, "ledger integrity verified");
        } else {
            for record in &report.tampered_logs {
                warn!(log_id = record.log_id, action = %record.action, issue = %record.issue, "tampered ledger entry");
            }
            error!(
                total_logs = report.total_logs,
                tampered = report.tampered_logs.len(),
                "ledger integrity check failed"
            );
        }
        Ok(report)
    }
}

/// Verify a slice of entries already sorted by ascending id.
pub fn verify_entries(entries: &[LedgerEntry]) -> IntegrityReport {
    let mut tampered_logs = Vec::new();
    // (predecessor, hash recomputed from the predecessor's fields)
    let mut prior: Option<(&LedgerEntry, String)> = None;

    for entry in entries {
        let mut issues = Vec::new();
        let recomputed = compute_entry_hash(entry);

        let expected_previous_hash = match &prior {
            None => {
                if !entry.is_genesis() {
                    issues.push(format!("first entry has id {}, expected 1", entry.id));
                }
                if entry.previous_hash.is_some() {
                    issues.push("genesis entry carries a previous hash".to_string());
                }
                None
            }
            Some((prev, prev_recomputed)) => {
                if entry.id != prev.id + 1 {
                    issues.push(format!(
                        "sequence gap: expected id {}, found {}",
                        prev.id + 1,
                        entry.id
                    ));
                }
                let stored = entry.previous_hash.as_deref();
                let linked =
                    stored == Some(prev.entry_hash.as_str()) || stored == Some(prev_recomputed.as_str());
                if !linked {
                    issues.push(format!(
                        "previous hash does not match entry {}",
                        prev.id
                    ));
                }
                Some(prev.entry_hash.clone())
            }
        };

        if recomputed != entry.entry_hash {
            issues.push(format!(
                "entry hash mismatch: stored {}, recomputed {}",
                entry.entry_hash, recomputed
            ));
        }

        if !issues.is_empty() {
            tampered_logs.push(TamperedLogRecord {
                log_id: entry.id,
                timestamp: entry.timestamp,
                action: entry.action.clone(),
                expected_previous_hash,
                stored_previous_hash: entry.previous_hash.clone(),
                issue: issues.join("; "),
            });
        }

        prior = Some((entry, recomputed));
    }

    let total_logs = entries.len() as u64;
    let verified_logs = total_logs - tampered_logs.len() as u64;
    let is_valid = tampered_logs.is_empty();
    let message = if total_logs == 0 {
        "no logs found".to_string()
    } else if is_valid {
        format!("{total_logs} logs verified, no tampering detected")
    } else {
        format!(
            "tampering detected: {} of {} logs failed verification",
            tampered_logs.len(),
            total_logs
        )
    };

    IntegrityReport {
        is_valid,
        total_logs,
        verified_logs,
        tampered_logs,
        message,
        head_hash: entries.last().map(|e| e.entry_hash.clone()),
    }
}
