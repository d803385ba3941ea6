//! Failed-login detection.
//!
//! Each recorded failure increments the user's counter. Crossing the
//! warning threshold raises a `multiple_failed_logins` alert; crossing the
//! lockout threshold raises a `lockout_threshold` alert, which stays open
//! until someone resolves it and thereby resets the counter. One alert is
//! raised per crossing, not per failure.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use sentinel_contracts::{
    alert::{AlertType, CreateAlertRequest, SecurityAlert, Severity},
    error::SentinelResult,
};
use sentinel_core::{config::DetectionConfig, traits::LoginCounterStore};

use crate::engine::{parse_source_ip, AlertEngine};

#[derive(Debug, Clone)]
pub struct LoginFailureOutcome {
    pub user_id: i64,
    /// The counter value after this failure.
    pub failed_attempts: u32,
    /// The alert raised by this failure, if it crossed a threshold.
    pub alert: Option<SecurityAlert>,
}

pub struct FailedLoginDetector {
    counters: Arc<dyn LoginCounterStore>,
    engine: Arc<AlertEngine>,
    config: DetectionConfig,
}

impl FailedLoginDetector {
    pub fn new(
        counters: Arc<dyn LoginCounterStore>,
        engine: Arc<AlertEngine>,
        config: DetectionConfig,
    ) -> Self {
        Self {
            counters,
            engine,
            config,
        }
    }

    /// Count one failure for `user_id`.
    ///
    /// A malformed `source_ip` is rejected before the counter moves, so a
    /// crossing is never consumed by a failure that could not raise its
    /// alert.
    pub fn record_failure(
        &self,
        user_id: i64,
        source_ip: Option<&str>,
    ) -> SentinelResult<LoginFailureOutcome> {
        let source_ip = parse_source_ip(source_ip)?;
        let failed_attempts = self.counters.record_failed_login(user_id)?;
        debug!(user_id, failed_attempts, "failed login recorded");

        let alert = match self.classify(failed_attempts) {
            Some((alert_type, severity, message)) => {
                let mut request = CreateAlertRequest::new(alert_type, severity, message)
                    .subject(user_id)
                    .details(json!({
                        "failed_attempts": failed_attempts,
                        "lockout_threshold": self.config.lockout_threshold,
                    }));
                if let Some(ip) = &source_ip {
                    request = request.source_ip(ip.as_str());
                }
                Some(self.engine.create_alert(request)?)
            }
            None => None,
        };

        Ok(LoginFailureOutcome {
            user_id,
            failed_attempts,
            alert,
        })
    }

    fn classify(&self, failed_attempts: u32) -> Option<(AlertType, Severity, String)> {
        if failed_attempts == self.config.lockout_threshold {
            Some((
                AlertType::LockoutThreshold,
                Severity::High,
                format!("Account locked after {failed_attempts} failed login attempts"),
            ))
        } else if failed_attempts == self.config.failed_login_alert_threshold {
            Some((
                AlertType::MultipleFailedLogins,
                Severity::Medium,
                format!("{failed_attempts} consecutive failed login attempts"),
            ))
        } else {
            None
        }
    }
}
