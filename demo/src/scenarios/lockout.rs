//! Scenario 1: Account Lockout and Recovery
//!
//! A clinician mistypes a password five times. The third failure raises a
//! `multiple_failed_logins` warning; the fifth raises a `lockout_threshold`
//! alert, which is dispatched because it is high severity. The security
//! officer acknowledges and resolves it, and resolving clears the lockout.
//! Every step lands in the ledger, which still verifies at the end.

use std::sync::Arc;

use sentinel_contracts::{
    alert::{AlertStatus, AlertType},
    error::{SentinelError, SentinelResult},
};
use sentinel_core::{traits::LoginCounterStore, SentinelConfig};

use super::{ensure, make_fixture};
use crate::outbox::LogSender;
use crate::render;

const CLINICIAN: i64 = 42;
const OFFICER: i64 = 1;

pub fn run_scenario() -> SentinelResult<()> {
    println!("=== Scenario 1: Account Lockout and Recovery ===");
    println!();

    let fixture = make_fixture(Arc::new(LogSender), &SentinelConfig::default())?;
    let core = &fixture.core;

    println!("  User {CLINICIAN} fails to log in five times from 198.51.100.23");
    let mut lockout = None;
    for _ in 0..5 {
        let report = core.record_login_failure(CLINICIAN, Some("198.51.100.23"))?;
        match &report.raised {
            Some(raised) => {
                println!(
                    "  attempt {}: raised {} ({})",
                    report.failed_attempts, raised.alert.alert_type, raised.alert.severity
                );
                render::notification(raised.notification.as_ref());
                if raised.alert.alert_type == AlertType::LockoutThreshold {
                    lockout = Some(raised.alert.clone());
                }
            }
            None => println!("  attempt {}: counted", report.failed_attempts),
        }
    }
    println!();

    let lockout =
        lockout.ok_or_else(|| SentinelError::validation("no lockout alert was raised"))?;

    println!("  Officer {OFFICER} acknowledges alert {}", lockout.id);
    core.acknowledge_alert(lockout.id, OFFICER)?;
    let second = core.acknowledge_alert(lockout.id, OFFICER);
    println!(
        "  Acknowledging again:      {}",
        match &second {
            Ok(_) => "accepted".to_string(),
            Err(e) => format!("refused ({e})"),
        }
    );
    ensure(second.is_err(), "a second acknowledge must be refused")?;

    println!("  Officer {OFFICER} resolves alert {}", lockout.id);
    let resolved = core.resolve_alert(lockout.id, OFFICER)?;
    let counter = fixture.security.failed_login_count(CLINICIAN)?;
    println!("  Alert status:             {}", resolved.status);
    println!("  Failed-login counter:     {counter} (lockout cleared)");
    ensure(resolved.status == AlertStatus::Resolved, "alert resolved")?;
    ensure(counter == 0, "resolving the lockout resets the counter")?;
    println!();

    let report = core.verify_ledger_integrity()?;
    println!("  Ledger: {}", report.message);
    for entry in fixture.ledger_actions()? {
        println!("    - {entry}");
    }
    ensure(report.is_valid, "ledger verifies")?;

    println!("  RESULT: SUCCESS (expected)");
    println!();
    Ok(())
}
