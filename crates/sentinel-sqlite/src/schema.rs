//! Schema creation and trigger inspection.
//!
//! The schema is versioned with `PRAGMA user_version`. The append-only
//! triggers are created together with the ledger table, once. Reopening a
//! database never reinstalls a trigger someone has dropped: a missing
//! trigger must stay visible to the attestor.

use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    report::{ProtectionKind, ProtectionMechanism},
};

use crate::store::ResultExt;

pub const SCHEMA_VERSION: i64 = 1;

pub const LEDGER_TABLE: &str = "ledger_entries";

const SCHEMA_V1: &str = r#"
CREATE TABLE ledger_entries(
  id             INTEGER PRIMARY KEY,
  timestamp      TEXT NOT NULL,
  actor_id       INTEGER,
  action         TEXT NOT NULL,
  resource_type  TEXT NOT NULL,
  resource_id    TEXT,
  status         TEXT NOT NULL,
  error_message  TEXT,
  metadata       TEXT NOT NULL,
  previous_hash  TEXT,
  entry_hash     TEXT NOT NULL
);

CREATE TRIGGER ledger_entries_no_update
BEFORE UPDATE ON ledger_entries
BEGIN
  SELECT RAISE(ABORT, 'ledger entries are append-only');
END;

CREATE TRIGGER ledger_entries_no_delete
BEFORE DELETE ON ledger_entries
BEGIN
  SELECT RAISE(ABORT, 'ledger entries are append-only');
END;

CREATE TABLE security_alerts(
  id               INTEGER PRIMARY KEY AUTOINCREMENT,
  alert_type       TEXT NOT NULL,
  severity         TEXT NOT NULL,
  subject_user_id  INTEGER,
  source_ip        TEXT,
  message          TEXT NOT NULL,
  details          TEXT NOT NULL,
  status           TEXT NOT NULL DEFAULT 'new',
  acknowledged_by  INTEGER,
  acknowledged_at  TEXT,
  resolved_by      INTEGER,
  resolved_at      TEXT,
  created_at       TEXT NOT NULL
);

CREATE INDEX idx_security_alerts_created ON security_alerts(created_at DESC, id DESC);
CREATE INDEX idx_security_alerts_status ON security_alerts(status, severity);

CREATE TABLE accounts(
  id                  INTEGER PRIMARY KEY,
  email               TEXT,
  is_admin            INTEGER NOT NULL DEFAULT 0,
  failed_login_count  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE security_team_members(
  id     INTEGER PRIMARY KEY AUTOINCREMENT,
  email  TEXT
);
"#;

/// Bring `conn` up to `SCHEMA_VERSION`.
///
/// The version check and the schema creation share one IMMEDIATE
/// transaction, so two handles opening a fresh file at once cannot both
/// try to create it.
pub(crate) fn migrate(conn: &mut Connection) -> SentinelResult<()> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .ctx("begin migration")?;
    let version: i64 = tx
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .ctx("read schema version")?;

    match version {
        SCHEMA_VERSION => Ok(()),
        0 => {
            tx.execute_batch(SCHEMA_V1).ctx("create schema")?;
            tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))
                .ctx("record schema version")?;
            tx.commit().ctx("commit migration")?;
            info!(version = SCHEMA_VERSION, "sqlite schema created");
            Ok(())
        }
        other => Err(SentinelError::storage(format!(
            "unsupported schema version {other} (expected {SCHEMA_VERSION})"
        ))),
    }
}

/// Every trigger on the ledger table that unconditionally blocks a write.
pub(crate) fn ledger_protections(conn: &Connection) -> SentinelResult<Vec<ProtectionMechanism>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'trigger' AND tbl_name = ?1 ORDER BY name",
        )
        .ctx("prepare trigger inspection")?;
    let triggers = stmt
        .query_map([LEDGER_TABLE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })
        .ctx("inspect triggers")?
        .collect::<Result<Vec<_>, _>>()
        .ctx("read trigger row")?;

    Ok(triggers
        .into_iter()
        .filter_map(|(name, sql)| {
            let sql = sql?;
            classify_trigger(&sql).map(|kind| ProtectionMechanism {
                name,
                kind,
                definition: sql,
            })
        })
        .collect())
}

/// The write a trigger blocks, if it blocks one on every row.
///
/// Conditional (`WHEN`) and column-scoped (`UPDATE OF`) triggers leave some
/// writes through and are not counted.
pub(crate) fn classify_trigger(sql: &str) -> Option<ProtectionKind> {
    let normalized = sql
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    let (header, body) = normalized.split_once(" BEGIN ")?;

    if header.contains(" WHEN ") || !body.replace(' ', "").contains("RAISE(") {
        return None;
    }
    let on_ledger = format!(" ON {}", LEDGER_TABLE.to_ascii_uppercase());
    if header.contains(&format!("BEFORE DELETE{on_ledger}")) {
        Some(ProtectionKind::BlocksDelete)
    } else if header.contains(&format!("BEFORE UPDATE{on_ledger}")) {
        Some(ProtectionKind::BlocksUpdate)
    } else {
        None
    }
}
