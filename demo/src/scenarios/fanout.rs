//! Scenario 3: Notification Fan-out
//!
//! A critical alert goes to every privileged admin and security-team
//! member. One relay is down; delivery to the others still happens and
//! the alert exists regardless. With notifications switched off in
//! configuration, nothing is sent and the directory is not consulted.

use std::sync::{Arc, Mutex};

use sentinel_contracts::{
    alert::{AlertType, CreateAlertRequest, Severity},
    error::{SentinelError, SentinelResult},
    report::DeliveryReceipt,
};
use sentinel_core::{traits::NotificationSender, SentinelConfig};

use super::{ensure, make_fixture};
use crate::render;

/// Fails every send to one domain, as a dead relay would.
struct PartialOutage {
    down_domain: &'static str,
    log: Mutex<Vec<String>>,
}

impl NotificationSender for PartialOutage {
    fn send(&self, recipient: &str, _subject: &str, _body: &str) -> SentinelResult<DeliveryReceipt> {
        let delivered = !recipient.ends_with(self.down_domain);
        if let Ok(mut log) = self.log.lock() {
            log.push(format!(
                "{recipient}: {}",
                if delivered { "delivered" } else { "relay timeout" }
            ));
        }
        if delivered {
            Ok(DeliveryReceipt::delivered())
        } else {
            Err(SentinelError::storage("relay timeout"))
        }
    }
}

fn bulk_export_alert() -> CreateAlertRequest {
    CreateAlertRequest::new(
        AlertType::BulkDataExport,
        Severity::Critical,
        "12,000 patient records exported in one session",
    )
    .subject(42)
    .source_ip("10.20.30.40")
}

pub fn run_scenario() -> SentinelResult<()> {
    println!("=== Scenario 3: Notification Fan-out ===");
    println!();

    let sender = Arc::new(PartialOutage {
        down_domain: "@backup-soc.test",
        log: Mutex::new(Vec::new()),
    });
    let fixture = make_fixture(sender.clone(), &SentinelConfig::default())?;
    fixture.security.add_account(2, Some("CISO@clinic.test"), true)?;
    fixture.security.add_security_team_member(Some("ciso@clinic.test"))?;
    fixture.security.add_security_team_member(Some("oncall@backup-soc.test"))?;
    fixture.security.add_security_team_member(None)?;

    println!("  Sub-case A: one of four recipients is unreachable");
    let created = fixture.core.create_alert(bulk_export_alert())?;
    render::alert(&created.alert);
    render::notification(created.notification.as_ref());
    if let Ok(log) = sender.log.lock() {
        for line in log.iter() {
            println!("    - {line}");
        }
    }
    let outcome = created
        .notification
        .ok_or_else(|| SentinelError::validation("critical alert was not dispatched"))?;
    ensure(outcome.success, "dispatch reports an attempt")?;
    ensure(outcome.recipients_count == 4, "duplicates and blanks are dropped")?;
    ensure(outcome.success_count == 3, "the dead relay costs one delivery")?;
    println!();

    println!("  Sub-case B: notifications disabled in configuration");
    let mut config = SentinelConfig::default();
    config.notifications.enabled = false;
    let quiet = make_fixture(sender.clone(), &config)?;
    let created = quiet.core.create_alert(bulk_export_alert())?;
    render::notification(created.notification.as_ref());
    ensure(
        created.notification.is_some_and(|o| !o.success),
        "disabled dispatch is reported as skipped",
    )?;
    ensure(created.alert.id > 0, "the alert exists without a notification")?;

    println!("  RESULT: SUCCESS (expected)");
    println!();
    Ok(())
}
