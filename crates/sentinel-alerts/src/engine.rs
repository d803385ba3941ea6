//! The alert engine: create, list, acknowledge, update, and resolve
//! security alerts.
//!
//! Lifecycle:
//!
//!   new ──acknowledge──▶ acknowledged ──resolve──▶ resolved
//!    └──────────────────────resolve──────────────────▲
//!
//! Transitions are conditional writes in the store, so a second
//! acknowledge or resolve of the same alert fails with `NotFound` instead
//! of applying twice. Resolving a `lockout_threshold` alert that names a
//! user also resets that user's failed-login counter, in the same atomic
//! unit as the status change.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use sentinel_contracts::{
    alert::{
        AlertFilter, AlertPage, AlertPatch, AlertQuery, AlertStatus, AlertType, Compensation,
        CreateAlertRequest, NewAlert, SecurityAlert, Severity,
    },
    error::{SentinelError, SentinelResult},
};
use sentinel_core::{config::AlertConfig, traits::AlertStore};

pub struct AlertEngine {
    store: Arc<dyn AlertStore>,
    config: AlertConfig,
}

impl AlertEngine {
    pub fn new(store: Arc<dyn AlertStore>, config: AlertConfig) -> Self {
        Self { store, config }
    }

    /// Validate `request` and persist a new alert with `status = new`.
    ///
    /// # Errors
    ///
    /// `Validation` if `alert_type`, `severity`, or `message` is missing,
    /// if either enum value is unknown, or if `source_ip` is not an IP
    /// address.
    pub fn create_alert(&self, request: CreateAlertRequest) -> SentinelResult<SecurityAlert> {
        let new_alert = validate_request(request)?;
        let alert = self.store.insert(new_alert)?;

        info!(
            alert_id = alert.id,
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            subject_user_id = ?alert.subject_user_id,
            "security alert created"
        );
        Ok(alert)
    }

    pub fn get_alert(&self, id: i64) -> SentinelResult<SecurityAlert> {
        self.store
            .get(id)?
            .ok_or_else(|| SentinelError::alert_not_found(id, "no alert with that id"))
    }

    /// One page of alerts, newest first.
    ///
    /// Missing or non-positive `page` / `limit` fall back to the defaults;
    /// a `limit` above the configured maximum is capped.
    pub fn list_alerts(&self, query: AlertQuery) -> SentinelResult<AlertPage> {
        let filter = self.normalize(&query);
        let (alerts, total) = self.store.list(&filter)?;
        let limit = u64::from(filter.limit);

        debug!(
            page = filter.page,
            limit = filter.limit,
            total,
            returned = alerts.len(),
            "listed security alerts"
        );

        Ok(AlertPage {
            alerts,
            page: filter.page,
            limit: filter.limit,
            total,
            total_pages: total.div_ceil(limit),
        })
    }

    /// `new → acknowledged`.
    ///
    /// Fails with `NotFound` if no alert with `id` currently has status
    /// `new`, which covers both a missing alert and one already past `new`.
    pub fn acknowledge_alert(&self, id: i64, actor_id: i64) -> SentinelResult<SecurityAlert> {
        let alert = self
            .store
            .acknowledge(id, actor_id, Utc::now())?
            .ok_or_else(|| SentinelError::alert_not_found(id, "no alert with status new"))?;

        info!(alert_id = id, actor_id, "security alert acknowledged");
        Ok(alert)
    }

    /// Replace `message` and/or `details`.
    ///
    /// # Errors
    ///
    /// `Validation` if neither field is supplied or `message` is blank;
    /// `NotFound` if the alert does not exist or is already resolved.
    pub fn update_alert(&self, id: i64, patch: AlertPatch) -> SentinelResult<SecurityAlert> {
        if patch.is_empty() {
            return Err(SentinelError::validation(
                "at least one of message or details is required",
            ));
        }
        if patch.message.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(SentinelError::validation("message must not be blank"));
        }

        let current = self.get_alert(id)?;
        if current.status == AlertStatus::Resolved {
            return Err(SentinelError::alert_not_found(
                id,
                "resolved alerts cannot be modified",
            ));
        }

        let alert = self
            .store
            .update(id, &patch)?
            .ok_or_else(|| SentinelError::alert_not_found(id, "alert was resolved concurrently"))?;

        info!(
            alert_id = id,
            message_changed = patch.message.is_some(),
            details_changed = patch.details.is_some(),
            "security alert updated"
        );
        Ok(alert)
    }

    /// Move an alert to `resolved`.
    ///
    /// The alert is loaded first; a missing id fails with `NotFound` before
    /// any write is issued. For a `lockout_threshold` alert with a subject
    /// user, the user's failed-login counter is reset in the same atomic
    /// unit. If that reset fails the resolve fails with it and nothing is
    /// committed.
    pub fn resolve_alert(&self, id: i64, actor_id: i64) -> SentinelResult<SecurityAlert> {
        let current = self.get_alert(id)?;
        if !current.status.can_advance_to(AlertStatus::Resolved) {
            return Err(SentinelError::alert_not_found(id, "alert is already resolved"));
        }

        let compensation = lockout_compensation(&current);
        let alert = self
            .store
            .resolve(id, actor_id, Utc::now(), compensation)?
            .ok_or_else(|| SentinelError::alert_not_found(id, "alert was resolved concurrently"))?;

        if let Some(Compensation::ResetFailedLogins { user_id }) = compensation {
            info!(alert_id = id, user_id, "lockout cleared: failed-login counter reset");
        }
        info!(alert_id = id, actor_id, "security alert resolved");
        Ok(alert)
    }

    fn normalize(&self, query: &AlertQuery) -> AlertFilter {
        let page = match query.page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 1,
        };
        let limit = match query.limit {
            Some(l) if l >= 1 => {
                u32::try_from(l).map_or(self.config.max_page_size, |l| l.min(self.config.max_page_size))
            }
            _ => self.config.default_page_size,
        };
        AlertFilter {
            status: query.status,
            severity: query.severity,
            page,
            limit,
        }
    }
}

/// The compensating action owed when `alert` is resolved, if any.
///
/// Lockout alerts gate re-enabling an account, so resolving one is the
/// authorization point for clearing the lockout.
pub fn lockout_compensation(alert: &SecurityAlert) -> Option<Compensation> {
    match (alert.alert_type, alert.subject_user_id) {
        (AlertType::LockoutThreshold, Some(user_id)) => {
            Some(Compensation::ResetFailedLogins { user_id })
        }
        _ => None,
    }
}

fn validate_request(request: CreateAlertRequest) -> SentinelResult<NewAlert> {
    let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    let (Some(alert_type), Some(severity), Some(message)) = (
        present(&request.alert_type),
        present(&request.severity),
        present(&request.message),
    ) else {
        return Err(SentinelError::validation(
            "alert_type, severity and message are required",
        ));
    };

    let alert_type = AlertType::from_str(&alert_type)?;
    let severity = Severity::from_str(&severity)?;

    let source_ip = parse_source_ip(request.source_ip.as_deref())?;

    Ok(NewAlert {
        alert_type,
        severity,
        subject_user_id: request.subject_user_id,
        source_ip,
        message,
        details: request.details.unwrap_or_else(|| json!({})),
        created_at: Utc::now(),
    })
}

/// A blank address counts as absent; anything else must parse as IPv4 or IPv6.
pub(crate) fn parse_source_ip(raw: Option<&str>) -> SentinelResult<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(ip) => {
            IpAddr::from_str(ip)
                .map_err(|_| SentinelError::validation(format!("invalid source_ip '{ip}'")))?;
            Ok(Some(ip.to_string()))
        }
    }
}
