//! Best-effort notification dispatch for security alerts.
//!
//! Every recipient is attempted independently; one failed send never stops
//! the rest. The returned `success` means "delivery was attempted to a
//! non-empty audience". Actual deliveries are counted in `success_count`,
//! which may be anything from zero to `recipients_count`. Failed sends are
//! logged and reported, never retried.

use std::sync::Arc;

use tracing::{info, warn};

use sentinel_contracts::{
    alert::SecurityAlert,
    error::{SentinelError, SentinelResult},
    report::DispatchOutcome,
};
use sentinel_core::{config::NotificationConfig, traits::NotificationSender};

use crate::recipients::RecipientResolver;

pub const DISABLED_MESSAGE: &str = "Email notifications disabled";
pub const NO_RECIPIENTS_MESSAGE: &str = "No alert recipients found";

/// The outcome of sending one alert to one recipient. Lives only for the
/// duration of a dispatch.
#[derive(Debug, Clone)]
struct NotificationAttempt {
    recipient: String,
    delivered: bool,
    error: Option<String>,
}

pub struct NotificationDispatcher {
    resolver: RecipientResolver,
    sender: Arc<dyn NotificationSender>,
    config: NotificationConfig,
}

impl NotificationDispatcher {
    /// `config.enabled` is fixed for the lifetime of the dispatcher.
    pub fn new(
        resolver: RecipientResolver,
        sender: Arc<dyn NotificationSender>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            resolver,
            sender,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Notify the resolved audience about `alert`.
    ///
    /// # Errors
    ///
    /// Only `Validation` when `alert` is `None`. Delivery problems are
    /// reported in the outcome, never as an error.
    pub fn dispatch(&self, alert: Option<&SecurityAlert>) -> SentinelResult<DispatchOutcome> {
        let alert = alert.ok_or_else(|| SentinelError::validation("alert is required"))?;

        if !self.config.enabled {
            return Ok(DispatchOutcome::skipped(DISABLED_MESSAGE));
        }

        let recipients = self.resolver.resolve_recipients();
        if recipients.is_empty() {
            warn!(alert_id = alert.id, "no recipients for security alert");
            return Ok(DispatchOutcome::skipped(NO_RECIPIENTS_MESSAGE));
        }

        let subject = render_subject(&self.config.subject_prefix, alert);
        let body = render_body(alert);

        let attempts: Vec<NotificationAttempt> = recipients
            .into_iter()
            .map(|recipient| self.attempt(recipient, &subject, &body))
            .collect();

        for failed in attempts.iter().filter(|a| !a.delivered) {
            warn!(
                alert_id = alert.id,
                recipient = %failed.recipient,
                error = failed.error.as_deref().unwrap_or("unknown"),
                "alert notification failed"
            );
        }

        let recipients_count = attempts.len();
        let success_count = attempts.iter().filter(|a| a.delivered).count();
        info!(
            alert_id = alert.id,
            recipients_count,
            success_count,
            "alert notifications dispatched"
        );

        Ok(DispatchOutcome {
            success: true,
            recipients_count,
            success_count,
            message: None,
        })
    }

    fn attempt(&self, recipient: String, subject: &str, body: &str) -> NotificationAttempt {
        let (delivered, error) = match self.sender.send(&recipient, subject, body) {
            Ok(receipt) => (receipt.success, receipt.error),
            Err(e) => (false, Some(e.to_string())),
        };
        NotificationAttempt {
            recipient,
            delivered,
            error,
        }
    }
}

pub fn render_subject(prefix: &str, alert: &SecurityAlert) -> String {
    format!(
        "{} {}: {}",
        prefix,
        alert.severity.as_str().to_uppercase(),
        alert.alert_type
    )
}

pub fn render_body(alert: &SecurityAlert) -> String {
    let mut body = format!(
        "A security alert requires attention.\n\n\
         Alert ID:   {}\n\
         Type:       {}\n\
         Severity:   {}\n\
         Raised at:  {}\n",
        alert.id,
        alert.alert_type,
        alert.severity,
        alert.created_at.to_rfc3339(),
    );
    if let Some(user_id) = alert.subject_user_id {
        body.push_str(&format!("User ID:    {user_id}\n"));
    }
    if let Some(ip) = &alert.source_ip {
        body.push_str(&format!("Source IP:  {ip}\n"));
    }
    body.push_str(&format!("\n{}\n", alert.message));
    if alert.details.as_object().is_some_and(|d| !d.is_empty()) {
        body.push_str(&format!("\nDetails:\n{:#}\n", alert.details));
    }
    body.push_str("\nReview and acknowledge this alert from the security dashboard.\n");
    body
}
