//! Scripted end-to-end walkthroughs.
//!
//! Each scenario builds a `SecurityCore` over fresh in-memory stores, drives
//! it through one story, prints what happens, and fails if the core does
//! not behave as the story expects.

pub mod fanout;
pub mod lockout;
pub mod tamper;

use std::sync::Arc;

use sentinel_alerts::InMemorySecurityStore;
use sentinel_contracts::error::{SentinelError, SentinelResult};
use sentinel_core::{
    traits::{LedgerStore, NotificationSender},
    SentinelConfig,
};
use sentinel_ledger::InMemoryLedgerStore;
use sentinel_service::{SecurityCore, Stores};

/// A core plus direct handles on its stores.
pub(crate) struct Fixture {
    pub core: SecurityCore,
    pub ledger: InMemoryLedgerStore,
    pub security: InMemorySecurityStore,
}

/// Admin 1 and security-team address receive notifications; user 42 is a
/// clinician whose account the scenarios lock.
pub(crate) fn make_fixture(
    sender: Arc<dyn NotificationSender>,
    config: &SentinelConfig,
) -> SentinelResult<Fixture> {
    let (stores, ledger, security) = Stores::in_memory();
    security.add_account(1, Some("privacy.officer@clinic.test"), true)?;
    security.add_account(42, Some("dr.patel@clinic.test"), false)?;
    security.add_security_team_member(Some("soc@clinic.test"))?;

    let core = SecurityCore::new(stores, sender, config)?;
    Ok(Fixture {
        core,
        ledger,
        security,
    })
}

impl Fixture {
    /// One line per ledger entry, oldest first.
    pub fn ledger_actions(&self) -> SentinelResult<Vec<String>> {
        Ok(self
            .ledger
            .entries()?
            .into_iter()
            .map(|e| format!("#{} {} ({})", e.id, e.action, e.status))
            .collect())
    }
}

pub(crate) fn ensure(condition: bool, what: &str) -> SentinelResult<()> {
    if condition {
        Ok(())
    } else {
        Err(SentinelError::validation(format!("scenario expectation failed: {what}")))
    }
}
