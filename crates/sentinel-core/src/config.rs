//! TOML configuration for the Sentinel runtime.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```toml
//! [storage]
//! database_path = "/var/lib/clinic/sentinel.db"
//! busy_timeout_ms = 5000
//!
//! [notifications]
//! enabled = true
//! subject_prefix = "[Security Alert]"
//! min_severity = "high"
//!
//! [alerts]
//! default_page_size = 20
//! max_page_size = 100
//!
//! [detection]
//! failed_login_alert_threshold = 3
//! lockout_threshold = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use sentinel_contracts::{
    alert::Severity,
    error::{SentinelError, SentinelResult},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub alerts: AlertConfig,
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    /// Upper bound on any wait for a store lock.
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("sentinel.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// When false the dispatcher skips every alert without resolving recipients.
    pub enabled: bool,
    pub subject_prefix: String,
    /// Alerts at or above this severity are dispatched as soon as they are created.
    pub min_severity: Severity,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subject_prefix: "[Security Alert]".to_string(),
            min_severity: Severity::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Failed-login count that raises a `multiple_failed_logins` alert.
    pub failed_login_alert_threshold: u32,
    /// Failed-login count that raises a `lockout_threshold` alert.
    pub lockout_threshold: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            failed_login_alert_threshold: 3,
            lockout_threshold: 5,
        }
    }
}

impl SentinelConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `SentinelError::Config` if the TOML is malformed or a value
    /// is out of range.
    pub fn from_toml_str(s: &str) -> SentinelResult<Self> {
        let config: SentinelConfig = toml::from_str(s).map_err(|e| SentinelError::Config {
            reason: format!("failed to parse config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as Sentinel configuration.
    pub fn from_file(path: &Path) -> SentinelResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SentinelError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "loaded sentinel config");
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> SentinelResult<()> {
        let alerts = &self.alerts;
        if alerts.default_page_size == 0 || alerts.max_page_size == 0 {
            return Err(config_error("alert page sizes must be greater than zero"));
        }
        if alerts.default_page_size > alerts.max_page_size {
            return Err(config_error(format!(
                "default_page_size ({}) exceeds max_page_size ({})",
                alerts.default_page_size, alerts.max_page_size
            )));
        }

        let detection = &self.detection;
        if detection.failed_login_alert_threshold == 0 || detection.lockout_threshold == 0 {
            return Err(config_error("detection thresholds must be greater than zero"));
        }
        if detection.failed_login_alert_threshold > detection.lockout_threshold {
            return Err(config_error(format!(
                "failed_login_alert_threshold ({}) exceeds lockout_threshold ({})",
                detection.failed_login_alert_threshold, detection.lockout_threshold
            )));
        }
        Ok(())
    }
}

fn config_error(reason: impl Into<String>) -> SentinelError {
    SentinelError::Config {
        reason: reason.into(),
    }
}
