//! In-memory implementation of the alert, account, and counter stores.
//!
//! One `Mutex` guards alerts, accounts, and counters together, so a resolve
//! and its compensating counter reset commit or fail as a unit, exactly as
//! the SQLite store does with a transaction.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use sentinel_contracts::{
    alert::{AlertFilter, AlertPatch, AlertStatus, Compensation, NewAlert, SecurityAlert},
    error::{SentinelError, SentinelResult},
};
use sentinel_core::traits::{AccountDirectory, AlertStore, LoginCounterStore};

#[derive(Debug, Clone)]
pub(crate) struct Account {
    pub(crate) email: Option<String>,
    pub(crate) privileged: bool,
    pub(crate) failed_logins: u32,
}

#[derive(Default)]
pub(crate) struct InMemoryState {
    pub(crate) alerts: Vec<SecurityAlert>,
    pub(crate) accounts: BTreeMap<i64, Account>,
    pub(crate) security_team: Vec<Option<String>>,
}

#[derive(Clone, Default)]
pub struct InMemorySecurityStore {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl InMemorySecurityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> SentinelResult<MutexGuard<'_, InMemoryState>> {
        self.state
            .lock()
            .map_err(|e| SentinelError::storage(format!("security state lock poisoned: {}", e)))
    }

    /// Register a user account. `privileged` marks an admin.
    pub fn add_account(&self, user_id: i64, email: Option<&str>, privileged: bool) -> SentinelResult<()> {
        self.lock()?.accounts.insert(
            user_id,
            Account {
                email: email.map(str::to_string),
                privileged,
                failed_logins: 0,
            },
        );
        Ok(())
    }

    pub fn add_security_team_member(&self, email: Option<&str>) -> SentinelResult<()> {
        self.lock()?.security_team.push(email.map(str::to_string));
        Ok(())
    }

    /// Set a user's counter directly, as the login subsystem would.
    pub fn set_failed_logins(&self, user_id: i64, count: u32) -> SentinelResult<()> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| unknown_account(user_id))?;
        account.failed_logins = count;
        Ok(())
    }
}

fn unknown_account(user_id: i64) -> SentinelError {
    SentinelError::NotFound {
        entity: "user account",
        id: user_id.to_string(),
        reason: "no account with that id".to_string(),
    }
}

/// Resetting an unknown user's counter is a no-op.
fn apply_compensation(state: &mut InMemoryState, compensation: Compensation) {
    match compensation {
        Compensation::ResetFailedLogins { user_id } => {
            if let Some(account) = state.accounts.get_mut(&user_id) {
                account.failed_logins = 0;
            }
        }
    }
}

fn find_mut(state: &mut InMemoryState, id: i64) -> Option<&mut SecurityAlert> {
    state.alerts.iter_mut().find(|a| a.id == id)
}

impl AlertStore for InMemorySecurityStore {
    fn insert(&self, alert: NewAlert) -> SentinelResult<SecurityAlert> {
        let mut state = self.lock()?;
        let id = state.alerts.last().map_or(1, |a| a.id + 1);
        let alert = SecurityAlert {
            id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            subject_user_id: alert.subject_user_id,
            source_ip: alert.source_ip,
            message: alert.message,
            details: alert.details,
            status: AlertStatus::New,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            created_at: alert.created_at,
        };
        state.alerts.push(alert.clone());
        Ok(alert)
    }

    fn get(&self, id: i64) -> SentinelResult<Option<SecurityAlert>> {
        Ok(self.lock()?.alerts.iter().find(|a| a.id == id).cloned())
    }

    fn list(&self, filter: &AlertFilter) -> SentinelResult<(Vec<SecurityAlert>, u64)> {
        let state = self.lock()?;
        let mut matching: Vec<&SecurityAlert> =
            state.alerts.iter().filter(|a| filter.matches(a)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    fn acknowledge(
        &self,
        id: i64,
        actor_id: i64,
        at: DateTime<Utc>,
    ) -> SentinelResult<Option<SecurityAlert>> {
        let mut state = self.lock()?;
        Ok(match find_mut(&mut state, id) {
            Some(alert) if alert.status == AlertStatus::New => {
                alert.status = AlertStatus::Acknowledged;
                alert.acknowledged_by = Some(actor_id);
                alert.acknowledged_at = Some(at);
                Some(alert.clone())
            }
            _ => None,
        })
    }

    fn update(&self, id: i64, patch: &AlertPatch) -> SentinelResult<Option<SecurityAlert>> {
        let mut state = self.lock()?;
        Ok(match find_mut(&mut state, id) {
            Some(alert) if alert.status != AlertStatus::Resolved => {
                if let Some(message) = &patch.message {
                    alert.message = message.clone();
                }
                if let Some(details) = &patch.details {
                    alert.details = details.clone();
                }
                Some(alert.clone())
            }
            _ => None,
        })
    }

    fn resolve(
        &self,
        id: i64,
        actor_id: i64,
        at: DateTime<Utc>,
        compensation: Option<Compensation>,
    ) -> SentinelResult<Option<SecurityAlert>> {
        let mut state = self.lock()?;
        let resolvable = state
            .alerts
            .iter()
            .any(|a| a.id == id && a.status != AlertStatus::Resolved);
        if !resolvable {
            return Ok(None);
        }

        if let Some(compensation) = compensation {
            apply_compensation(&mut state, compensation);
        }

        Ok(find_mut(&mut state, id).map(|alert| {
            alert.status = AlertStatus::Resolved;
            alert.resolved_by = Some(actor_id);
            alert.resolved_at = Some(at);
            alert.clone()
        }))
    }
}

impl AccountDirectory for InMemorySecurityStore {
    fn privileged_admin_emails(&self) -> SentinelResult<Vec<Option<String>>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .filter(|a| a.privileged)
            .map(|a| a.email.clone())
            .collect())
    }

    fn security_team_emails(&self) -> SentinelResult<Vec<Option<String>>> {
        Ok(self.lock()?.security_team.clone())
    }
}

impl LoginCounterStore for InMemorySecurityStore {
    fn record_failed_login(&self, user_id: i64) -> SentinelResult<u32> {
        let mut state = self.lock()?;
        let account = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| unknown_account(user_id))?;
        account.failed_logins = account.failed_logins.saturating_add(1);
        Ok(account.failed_logins)
    }

    fn failed_login_count(&self, user_id: i64) -> SentinelResult<u32> {
        self.lock()?
            .accounts
            .get(&user_id)
            .map(|a| a.failed_logins)
            .ok_or_else(|| unknown_account(user_id))
    }
}
