//! Trait seams between the Sentinel engine and the outside world.
//!
//! - `LedgerStore`: durable, append-only ledger rows
//! - `AlertStore`: security alert rows
//! - `AccountDirectory`: who counts as a privileged admin or security-team member
//! - `LoginCounterStore`: per-user failed-login counters
//! - `NotificationSender`: transport for alert notifications (email, in production)
//!
//! Every method is request-scoped: an implementation acquires its handle,
//! does the work, and releases the handle on every exit path.

use chrono::{DateTime, Utc};

use sentinel_contracts::{
    alert::{AlertFilter, AlertPatch, Compensation, NewAlert, SecurityAlert},
    error::SentinelResult,
    ledger::LedgerEntry,
    report::{DeliveryReceipt, ProtectionMechanism},
};

/// Durable, ordered ledger storage.
///
/// Implementations must refuse UPDATE and DELETE of existing rows at the
/// storage layer itself, independent of any caller.
pub trait LedgerStore: Send + Sync {
    /// Append one entry under an exclusive lock on the ledger tail.
    ///
    /// `seal` is called exactly once, while the lock is held, with the id
    /// the new entry will receive and the current tail's `entry_hash`
    /// (`None` when the ledger is empty). The entry it returns is persisted
    /// in the same atomic unit. Concurrent appends are linearized: no two
    /// entries can ever be sealed against the same tail.
    fn append(
        &self,
        seal: &mut dyn FnMut(u64, Option<&str>) -> LedgerEntry,
    ) -> SentinelResult<LedgerEntry>;

    /// Every entry in ascending `id` order.
    fn entries(&self) -> SentinelResult<Vec<LedgerEntry>>;

    fn entry(&self, id: u64) -> SentinelResult<Option<LedgerEntry>>;

    /// The entry with the highest id, if any.
    fn tail(&self) -> SentinelResult<Option<LedgerEntry>>;

    /// Up to `limit` entries with `id >= from_id`, ascending.
    fn range(&self, from_id: u64, limit: usize) -> SentinelResult<Vec<LedgerEntry>>;

    /// The write-blocking mechanisms the storage layer itself reports as
    /// installed on the ledger table. Must be read from the store, never
    /// from application-side bookkeeping.
    fn write_protections(&self) -> SentinelResult<Vec<ProtectionMechanism>>;
}

/// Row-level storage for security alerts.
///
/// Conditional transitions return `Ok(None)` when the guard does not hold,
/// so a repeated acknowledge or resolve fails cleanly instead of
/// double-applying.
pub trait AlertStore: Send + Sync {
    fn insert(&self, alert: NewAlert) -> SentinelResult<SecurityAlert>;

    fn get(&self, id: i64) -> SentinelResult<Option<SecurityAlert>>;

    /// One page of matching alerts, newest first, plus the total match count.
    fn list(&self, filter: &AlertFilter) -> SentinelResult<(Vec<SecurityAlert>, u64)>;

    /// `new → acknowledged`. `None` if no alert with `id` has status `new`.
    fn acknowledge(
        &self,
        id: i64,
        actor_id: i64,
        at: DateTime<Utc>,
    ) -> SentinelResult<Option<SecurityAlert>>;

    /// Apply the supplied fields. `None` if the alert is absent or resolved.
    fn update(&self, id: i64, patch: &AlertPatch) -> SentinelResult<Option<SecurityAlert>>;

    /// Move an unresolved alert to `resolved` and run `compensation` in the
    /// same atomic unit. If the compensation fails, nothing is committed.
    /// `None` if the alert is absent or already resolved.
    fn resolve(
        &self,
        id: i64,
        actor_id: i64,
        at: DateTime<Utc>,
        compensation: Option<Compensation>,
    ) -> SentinelResult<Option<SecurityAlert>>;
}

/// Source of notification audiences. Emails may be missing or blank; the
/// recipient resolver filters them.
pub trait AccountDirectory: Send + Sync {
    fn privileged_admin_emails(&self) -> SentinelResult<Vec<Option<String>>>;

    fn security_team_emails(&self) -> SentinelResult<Vec<Option<String>>>;
}

/// Per-user failed-login counters owned by the account subsystem.
///
/// Counters are only ever cleared by resolving a lockout alert, through
/// [`Compensation::ResetFailedLogins`] on [`AlertStore::resolve`].
pub trait LoginCounterStore: Send + Sync {
    /// Increment the counter and return the new value.
    fn record_failed_login(&self, user_id: i64) -> SentinelResult<u32>;

    fn failed_login_count(&self, user_id: i64) -> SentinelResult<u32>;
}

/// Transport for alert notifications, injected into the dispatcher.
///
/// `Err` and `Ok(DeliveryReceipt { success: false, .. })` are both treated
/// as a failed delivery to that recipient.
pub trait NotificationSender: Send + Sync {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> SentinelResult<DeliveryReceipt>;
}
