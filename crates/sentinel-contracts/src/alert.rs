//! Security alert types and their lifecycle.
//!
//! An alert moves strictly forward: `new → acknowledged → resolved`, or
//! `new → resolved`. Once resolved it is frozen. Alerts are never deleted;
//! they are part of the audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SentinelError;

// ── Alert type ────────────────────────────────────────────────────────────────

/// The detected condition an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    MultipleFailedLogins,
    /// Raised when a user's failed-login count reaches the lockout limit.
    /// Resolving it clears that user's counter.
    LockoutThreshold,
    SuspiciousActivity,
    UnauthorizedAccess,
    PrivilegeEscalation,
    BulkDataExport,
    LedgerTampering,
}

impl AlertType {
    pub const ALL: [AlertType; 7] = [
        AlertType::MultipleFailedLogins,
        AlertType::LockoutThreshold,
        AlertType::SuspiciousActivity,
        AlertType::UnauthorizedAccess,
        AlertType::PrivilegeEscalation,
        AlertType::BulkDataExport,
        AlertType::LedgerTampering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::MultipleFailedLogins => "multiple_failed_logins",
            AlertType::LockoutThreshold => "lockout_threshold",
            AlertType::SuspiciousActivity => "suspicious_activity",
            AlertType::UnauthorizedAccess => "unauthorized_access",
            AlertType::PrivilegeEscalation => "privilege_escalation",
            AlertType::BulkDataExport => "bulk_data_export",
            AlertType::LedgerTampering => "ledger_tampering",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SentinelError::validation(format!("invalid alert type '{s}'")))
    }
}

// ── Severity ──────────────────────────────────────────────────────────────────

/// Alert severity, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| {
                SentinelError::validation(format!(
                    "invalid severity '{s}': expected one of low, medium, high, critical"
                ))
            })
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    New,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New => "new",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    /// True if moving from `self` to `next` is a forward step.
    pub fn can_advance_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::New, AlertStatus::Acknowledged)
                | (AlertStatus::New, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(AlertStatus::New),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(SentinelError::validation(format!(
                "invalid alert status '{other}': expected new, acknowledged or resolved"
            ))),
        }
    }
}

// ── Alert ─────────────────────────────────────────────────────────────────────

/// A persisted security alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub id: i64,
    pub alert_type: AlertType,
    pub severity: Severity,
    /// The user the alert is about, if any.
    pub subject_user_id: Option<i64>,
    pub source_ip: Option<String>,
    pub message: String,
    pub details: Value,
    pub status: AlertStatus,
    pub acknowledged_by: Option<i64>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Raw, unvalidated input for `create_alert`.
///
/// Fields are strings so the engine can reject missing or unknown values
/// with a `Validation` error rather than relying on the caller's parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAlertRequest {
    pub alert_type: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
    pub subject_user_id: Option<i64>,
    pub source_ip: Option<String>,
    pub details: Option<Value>,
}

impl CreateAlertRequest {
    pub fn new(alert_type: AlertType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            alert_type: Some(alert_type.as_str().to_string()),
            severity: Some(severity.as_str().to_string()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn subject(mut self, user_id: i64) -> Self {
        self.subject_user_id = Some(user_id);
        self
    }

    pub fn source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A validated alert ready to be persisted with `status = new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub subject_user_id: Option<i64>,
    pub source_ip: Option<String>,
    pub message: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// Partial update for `update_alert`. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertPatch {
    pub message: Option<String>,
    pub details: Option<Value>,
}

impl AlertPatch {
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.details.is_none()
    }
}

/// The compensating action a store must run in the same atomic unit as a
/// resolve transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compensation {
    /// Reset the user's failed-login counter to zero, clearing the lockout.
    ResetFailedLogins { user_id: i64 },
}

// ── Listing ───────────────────────────────────────────────────────────────────

/// Raw list filters as received from a caller. Paging values may be
/// missing, zero, or negative; the engine clamps them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertQuery {
    pub status: Option<AlertStatus>,
    pub severity: Option<Severity>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Normalized, in-range filters handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub severity: Option<Severity>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl AlertFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn matches(&self, alert: &SecurityAlert) -> bool {
        self.status.map_or(true, |s| s == alert.status)
            && self.severity.map_or(true, |s| s == alert.severity)
    }
}

/// One page of alerts, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPage {
    pub alerts: Vec<SecurityAlert>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}
