//! `SecurityCore`: the read/write API the rest of the platform calls.
//!
//! The facade wires writer, verifier, attestor, alert engine, dispatcher,
//! and detector over one set of stores, and records every alert transition
//! in the ledger:
//!
//!   request → Alert Engine → (persisted) → ledger audit → [dispatch]
//!
//! The alert change always lands first. If the audit append then fails,
//! the error is returned to the caller but the alert change stands; the
//! ledger offers at-most-once, never exactly-once, for these events.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info};

use sentinel_alerts::{
    AlertEngine, FailedLoginDetector, NotificationDispatcher, RecipientResolver,
};
use sentinel_contracts::{
    alert::{AlertPage, AlertPatch, AlertQuery, CreateAlertRequest, SecurityAlert, Severity},
    error::SentinelResult,
    ledger::{LedgerEntry, LedgerEvent},
    report::{DispatchOutcome, ImmutabilityReport, IntegrityReport},
};
use sentinel_core::{config::SentinelConfig, traits::NotificationSender};
use sentinel_ledger::{ImmutabilityAttestor, IntegrityVerifier, LedgerReader, LedgerWriter};

use crate::stores::Stores;

const ALERT_RESOURCE: &str = "security_alert";
const ACCOUNT_RESOURCE: &str = "user_account";

/// An alert returned by a create call, with the outcome of the automatic
/// notification when the alert's severity triggered one.
#[derive(Debug, Clone)]
pub struct CreatedAlert {
    pub alert: SecurityAlert,
    pub notification: Option<DispatchOutcome>,
}

#[derive(Debug, Clone)]
pub struct LoginFailureReport {
    pub user_id: i64,
    pub failed_attempts: u32,
    /// The alert raised by this failure, if it crossed a threshold.
    pub raised: Option<CreatedAlert>,
}

pub struct SecurityCore {
    writer: LedgerWriter,
    reader: LedgerReader,
    verifier: IntegrityVerifier,
    attestor: ImmutabilityAttestor,
    engine: Arc<AlertEngine>,
    dispatcher: NotificationDispatcher,
    detector: FailedLoginDetector,
    min_severity: Severity,
}

impl SecurityCore {
    /// Build the core over `stores`.
    ///
    /// # Errors
    ///
    /// `Config` if `config` fails validation.
    pub fn new(
        stores: Stores,
        sender: Arc<dyn NotificationSender>,
        config: &SentinelConfig,
    ) -> SentinelResult<Self> {
        config.validate()?;

        let engine = Arc::new(AlertEngine::new(stores.alerts, config.alerts.clone()));
        let dispatcher = NotificationDispatcher::new(
            RecipientResolver::new(stores.directory),
            sender,
            config.notifications.clone(),
        );
        let detector = FailedLoginDetector::new(
            stores.counters,
            Arc::clone(&engine),
            config.detection.clone(),
        );

        info!(
            notifications_enabled = dispatcher.is_enabled(),
            min_severity = %config.notifications.min_severity,
            "security core ready"
        );

        Ok(Self {
            writer: LedgerWriter::new(Arc::clone(&stores.ledger)),
            reader: LedgerReader::new(Arc::clone(&stores.ledger)),
            verifier: IntegrityVerifier::new(Arc::clone(&stores.ledger)),
            attestor: ImmutabilityAttestor::new(stores.ledger),
            engine,
            dispatcher,
            detector,
            min_severity: config.notifications.min_severity,
        })
    }

    // ── Ledger ────────────────────────────────────────────────────────────────

    pub fn append_ledger_event(&self, event: LedgerEvent) -> SentinelResult<LedgerEntry> {
        self.writer.append(event)
    }

    pub fn verify_ledger_integrity(&self) -> SentinelResult<IntegrityReport> {
        self.verifier.verify()
    }

    pub fn verify_immutability_status(&self) -> ImmutabilityReport {
        self.attestor.check_status()
    }

    /// Read-only access for report export and retention tooling.
    pub fn ledger(&self) -> &LedgerReader {
        &self.reader
    }

    // ── Alerts ────────────────────────────────────────────────────────────────

    /// Create an alert, audit it, and notify the security audience if its
    /// severity is at or above the configured threshold.
    ///
    /// A notification problem never fails the call; it is reported in
    /// `CreatedAlert::notification`.
    pub fn create_alert(&self, request: CreateAlertRequest) -> SentinelResult<CreatedAlert> {
        let alert = self.engine.create_alert(request)?;
        self.after_create(alert)
    }

    pub fn list_alerts(&self, query: AlertQuery) -> SentinelResult<AlertPage> {
        self.engine.list_alerts(query)
    }

    pub fn get_alert(&self, id: i64) -> SentinelResult<SecurityAlert> {
        self.engine.get_alert(id)
    }

    pub fn acknowledge_alert(&self, id: i64, actor_id: i64) -> SentinelResult<SecurityAlert> {
        let result = self.engine.acknowledge_alert(id, actor_id);
        let event = alert_event("acknowledge", id, &result).actor(actor_id);
        self.audit(event, result)
    }

    pub fn update_alert(&self, id: i64, actor_id: i64, patch: AlertPatch) -> SentinelResult<SecurityAlert> {
        let changed: Vec<&str> = [
            patch.message.as_ref().map(|_| "message"),
            patch.details.as_ref().map(|_| "details"),
        ]
        .into_iter()
        .flatten()
        .collect();

        let result = self.engine.update_alert(id, patch);
        let event = alert_event("update", id, &result)
            .actor(actor_id)
            .metadata(json!({ "changed": changed }));
        self.audit(event, result)
    }

    /// Resolve an alert. Resolving a lockout alert also clears the lockout;
    /// the audit entry records that.
    pub fn resolve_alert(&self, id: i64, actor_id: i64) -> SentinelResult<SecurityAlert> {
        let result = self.engine.resolve_alert(id, actor_id);
        let mut event = alert_event("resolve", id, &result).actor(actor_id);
        if let Ok(alert) = &result {
            let cleared_for = sentinel_alerts::lockout_compensation(alert).and(alert.subject_user_id);
            event = event.metadata(json!({
                "alert_type": alert.alert_type,
                "lockout_cleared_for": cleared_for,
            }));
        }
        self.audit(event, result)
    }

    /// Send a notification for `alert` now, whatever its severity.
    pub fn dispatch_alert_notification(
        &self,
        alert: Option<&SecurityAlert>,
    ) -> SentinelResult<DispatchOutcome> {
        self.dispatcher.dispatch(alert)
    }

    // ── Authentication ────────────────────────────────────────────────────────

    /// Record a failed login, raising and dispatching an alert when the
    /// user's counter crosses a threshold.
    pub fn record_login_failure(
        &self,
        user_id: i64,
        source_ip: Option<&str>,
    ) -> SentinelResult<LoginFailureReport> {
        let outcome = self.detector.record_failure(user_id, source_ip)?;

        let event = LedgerEvent::new("auth.login_failed", ACCOUNT_RESOURCE)
            .actor(user_id)
            .resource_id(user_id.to_string())
            .failed("authentication failed")
            .metadata(json!({
                "failed_attempts": outcome.failed_attempts,
                "source_ip": source_ip,
            }));
        let logged = self.writer.append(event);

        // A raised alert is already persisted; it is dispatched and audited
        // before any ledger failure for the login event surfaces.
        let raised = outcome.alert.map(|alert| self.after_create(alert)).transpose();
        logged?;
        let raised = raised?;
        Ok(LoginFailureReport {
            user_id,
            failed_attempts: outcome.failed_attempts,
            raised,
        })
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn after_create(&self, alert: SecurityAlert) -> SentinelResult<CreatedAlert> {
        let notification = if alert.severity >= self.min_severity {
            match self.dispatcher.dispatch(Some(&alert)) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!(alert_id = alert.id, error = %e, "alert notification dispatch failed");
                    None
                }
            }
        } else {
            debug!(alert_id = alert.id, severity = %alert.severity, "below notification threshold");
            None
        };

        let event = LedgerEvent::new("security_alert.create", ALERT_RESOURCE)
            .resource_id(alert.id.to_string())
            .metadata(json!({
                "alert_type": alert.alert_type,
                "severity": alert.severity,
                "subject_user_id": alert.subject_user_id,
                "notified": notification.as_ref().map(|n| n.success_count),
            }));
        self.writer.append(event)?;

        Ok(CreatedAlert {
            alert,
            notification,
        })
    }

    /// Append `event` and hand back `result`.
    ///
    /// A failed transition is audited with status `error`; if that audit
    /// append also fails, the original error wins and the ledger failure is
    /// only logged. A successful transition whose audit fails returns the
    /// ledger error.
    fn audit<T>(&self, event: LedgerEvent, result: SentinelResult<T>) -> SentinelResult<T> {
        let appended = self.writer.append(event);
        match (result, appended) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(ledger_err)) => {
                error!(error = %ledger_err, "failed to audit rejected alert transition");
                Err(e)
            }
        }
    }
}

fn alert_event<T>(verb: &str, id: i64, result: &SentinelResult<T>) -> LedgerEvent {
    let event = LedgerEvent::new(format!("security_alert.{verb}"), ALERT_RESOURCE)
        .resource_id(id.to_string());
    match result {
        Ok(_) => event,
        Err(e) => event.failed(e.to_string()),
    }
}
