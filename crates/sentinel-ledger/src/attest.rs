//! Immutability attestation: confirm the store itself blocks writes.
//!
//! The attestor asks the storage layer which write-blocking mechanisms are
//! installed on the ledger table. It never trusts an application-side flag,
//! so a compromised process cannot report protection it has removed.

use std::sync::Arc;

use tracing::{info, warn};

use sentinel_contracts::report::{
    ImmutabilityReport, ProtectionKind, ProtectionMechanism, ProtectionStatus,
};
use sentinel_core::traits::LedgerStore;

pub struct ImmutabilityAttestor {
    store: Arc<dyn LedgerStore>,
}

impl ImmutabilityAttestor {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Inspect the store's protections. Never fails: an inspection error
    /// yields `UNKNOWN` for both protections.
    pub fn check_status(&self) -> ImmutabilityReport {
        match self.store.write_protections() {
            Ok(mechanisms) => {
                let report = assess(mechanisms);
                if report.is_fully_protected {
                    info!(mechanisms = report.mechanisms.len(), "ledger immutability confirmed");
                } else {
                    warn!(
                        delete_protection = %report.delete_protection,
                        update_protection = %report.update_protection,
                        "ledger immutability incomplete"
                    );
                }
                report
            }
            Err(e) => {
                warn!(error = %e, "failed to inspect ledger protections");
                ImmutabilityReport {
                    delete_protection: ProtectionStatus::Unknown,
                    update_protection: ProtectionStatus::Unknown,
                    is_fully_protected: false,
                    mechanisms: Vec::new(),
                    message: format!("unable to inspect storage-layer protections: {e}"),
                }
            }
        }
    }
}

/// Classify a set of discovered mechanisms.
pub fn assess(mechanisms: Vec<ProtectionMechanism>) -> ImmutabilityReport {
    let status_for = |kind: ProtectionKind| {
        if mechanisms.iter().any(|m| m.kind == kind) {
            ProtectionStatus::Active
        } else {
            ProtectionStatus::Missing
        }
    };
    let delete_protection = status_for(ProtectionKind::BlocksDelete);
    let update_protection = status_for(ProtectionKind::BlocksUpdate);
    let is_fully_protected = delete_protection == ProtectionStatus::Active
        && update_protection == ProtectionStatus::Active;

    let message = if is_fully_protected {
        "ledger is fully protected: UPDATE and DELETE are blocked by the storage layer".to_string()
    } else {
        let mut missing = Vec::new();
        if delete_protection != ProtectionStatus::Active {
            missing.push("DELETE");
        }
        if update_protection != ProtectionStatus::Active {
            missing.push("UPDATE");
        }
        format!(
            "ledger protection incomplete: {} not blocked by the storage layer",
            missing.join(" and ")
        )
    };

    ImmutabilityReport {
        delete_protection,
        update_protection,
        is_fully_protected,
        mechanisms,
        message,
    }
}
