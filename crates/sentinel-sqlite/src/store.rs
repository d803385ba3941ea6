//! Connection handling for the SQLite backend.
//!
//! A `SqliteStore` owns one connection behind a `Mutex`. Every trait method
//! holds the guard for exactly the duration of its statement or
//! transaction, so the guard is the scoped handle: it is released on every
//! exit path, error or not. Several `SqliteStore`s (in one process or many)
//! may share a database file; writers are serialized by SQLite's own lock,
//! and `busy_timeout` bounds how long any of them waits for it.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tracing::debug;

use sentinel_contracts::error::{SentinelError, SentinelResult};

use crate::schema;

pub struct SqliteStore {
    pub(crate) conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and bring its
    /// schema up to date.
    pub fn open(path: &Path, busy_timeout: Duration) -> SentinelResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SentinelError::storage(format!(
                    "create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let mut conn = Connection::open(path)
            .map_err(|e| SentinelError::storage(format!("open database {}: {e}", path.display())))?;
        conn.busy_timeout(busy_timeout).ctx("set busy timeout")?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=FULL;
            "#,
        )
        .ctx("configure journal")?;

        schema::migrate(&mut conn)?;
        debug!(path = %path.display(), "sqlite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A private, non-durable database. Used by tests and by the demo
    /// scenarios.
    pub fn open_in_memory() -> SentinelResult<Self> {
        let mut conn = Connection::open_in_memory().ctx("open in-memory database")?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> SentinelResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SentinelError::storage(format!("sqlite connection lock poisoned: {}", e)))
    }
}

// ── Error and value conversion ────────────────────────────────────────────────

pub(crate) trait ResultExt<T> {
    /// Map a rusqlite error to `Storage`, prefixed with what was being done.
    fn ctx(self, what: &str) -> SentinelResult<T>;
}

impl<T> ResultExt<T> for Result<T, rusqlite::Error> {
    fn ctx(self, what: &str) -> SentinelResult<T> {
        self.map_err(|e| SentinelError::storage(format!("{what}: {e}")))
    }
}

/// Fixed-width RFC 3339 with microseconds, so text order is time order.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str, column: &str) -> SentinelResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| SentinelError::storage(format!("corrupt {column} '{raw}': {e}")))
}

pub(crate) fn parse_json(raw: &str, column: &str) -> SentinelResult<serde_json::Value> {
    serde_json::from_str(raw)
        .map_err(|e| SentinelError::storage(format!("corrupt {column} JSON: {e}")))
}

pub(crate) fn to_i64(value: u64, what: &str) -> SentinelResult<i64> {
    i64::try_from(value).map_err(|_| SentinelError::storage(format!("{what} {value} out of range")))
}
