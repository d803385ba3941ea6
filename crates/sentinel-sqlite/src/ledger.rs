//! `LedgerStore` over the `ledger_entries` table.
//!
//! Appends run in an IMMEDIATE transaction: the write lock is taken before
//! the tail is read, so the tail handed to `seal` cannot move until the new
//! row commits. This holds across handles and processes sharing the file.

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension as _, Row, TransactionBehavior};
use tracing::debug;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    ledger::{EntryStatus, LedgerEntry},
    report::ProtectionMechanism,
};
use sentinel_core::traits::LedgerStore;

use crate::schema;
use crate::store::{format_ts, parse_json, parse_ts, to_i64, ResultExt, SqliteStore};

const ENTRY_COLUMNS: &str = "id, timestamp, actor_id, action, resource_type, resource_id, \
                             status, error_message, metadata, previous_hash, entry_hash";

/// A ledger row as stored, before text columns are parsed.
struct RawEntry {
    id: i64,
    timestamp: String,
    actor_id: Option<i64>,
    action: String,
    resource_type: String,
    resource_id: Option<String>,
    status: String,
    error_message: Option<String>,
    metadata: String,
    previous_hash: Option<String>,
    entry_hash: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            actor_id: row.get(2)?,
            action: row.get(3)?,
            resource_type: row.get(4)?,
            resource_id: row.get(5)?,
            status: row.get(6)?,
            error_message: row.get(7)?,
            metadata: row.get(8)?,
            previous_hash: row.get(9)?,
            entry_hash: row.get(10)?,
        })
    }

    fn into_entry(self) -> SentinelResult<LedgerEntry> {
        Ok(LedgerEntry {
            id: u64::try_from(self.id)
                .map_err(|_| SentinelError::storage(format!("corrupt ledger id {}", self.id)))?,
            timestamp: parse_ts(&self.timestamp, "ledger timestamp")?,
            actor_id: self.actor_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            status: EntryStatus::from_str(&self.status)
                .map_err(|e| SentinelError::storage(format!("corrupt ledger status: {e}")))?,
            error_message: self.error_message,
            metadata: parse_json(&self.metadata, "ledger metadata")?,
            previous_hash: self.previous_hash,
            entry_hash: self.entry_hash,
        })
    }
}

fn select_entries(
    conn: &Connection,
    clause: &str,
    params: impl rusqlite::Params,
) -> SentinelResult<Vec<LedgerEntry>> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries {clause}");
    let mut stmt = conn.prepare(&sql).ctx("prepare ledger query")?;
    let rows = stmt
        .query_map(params, RawEntry::from_row)
        .ctx("query ledger")?
        .collect::<Result<Vec<_>, _>>()
        .ctx("read ledger row")?;
    rows.into_iter().map(RawEntry::into_entry).collect()
}

impl LedgerStore for SqliteStore {
    fn append(
        &self,
        seal: &mut dyn FnMut(u64, Option<&str>) -> LedgerEntry,
    ) -> SentinelResult<LedgerEntry> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .ctx("begin ledger append")?;

        let tail: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, entry_hash FROM ledger_entries ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .ctx("read ledger tail")?;

        let (next_id, tail_hash) = match tail {
            Some((id, hash)) => (id + 1, Some(hash)),
            None => (1, None),
        };

        let entry = seal(next_id as u64, tail_hash.as_deref());
        if to_i64(entry.id, "ledger id")? != next_id {
            return Err(SentinelError::storage(format!(
                "sealed entry has id {}, expected {}",
                entry.id, next_id
            )));
        }

        tx.execute(
            r#"
            INSERT INTO ledger_entries(
              id, timestamp, actor_id, action, resource_type, resource_id,
              status, error_message, metadata, previous_hash, entry_hash
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
            "#,
            params![
                next_id,
                format_ts(&entry.timestamp),
                entry.actor_id,
                entry.action,
                entry.resource_type,
                entry.resource_id,
                entry.status.as_str(),
                entry.error_message,
                entry.metadata.to_string(),
                entry.previous_hash,
                entry.entry_hash,
            ],
        )
        .ctx("insert ledger entry")?;
        tx.commit().ctx("commit ledger append")?;

        debug!(entry_id = next_id, "ledger row committed");
        Ok(entry)
    }

    fn entries(&self) -> SentinelResult<Vec<LedgerEntry>> {
        let conn = self.lock()?;
        select_entries(&conn, "ORDER BY id ASC", [])
    }

    fn entry(&self, id: u64) -> SentinelResult<Option<LedgerEntry>> {
        let id = to_i64(id, "ledger id")?;
        let conn = self.lock()?;
        Ok(select_entries(&conn, "WHERE id = ?1", [id])?
            .into_iter()
            .next())
    }

    fn tail(&self) -> SentinelResult<Option<LedgerEntry>> {
        let conn = self.lock()?;
        Ok(select_entries(&conn, "ORDER BY id DESC LIMIT 1", [])?
            .into_iter()
            .next())
    }

    fn range(&self, from_id: u64, limit: usize) -> SentinelResult<Vec<LedgerEntry>> {
        let from_id = to_i64(from_id, "ledger id")?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.lock()?;
        select_entries(
            &conn,
            "WHERE id >= ?1 ORDER BY id ASC LIMIT ?2",
            params![from_id, limit],
        )
    }

    fn write_protections(&self) -> SentinelResult<Vec<ProtectionMechanism>> {
        let conn = self.lock()?;
        schema::ledger_protections(&conn)
    }
}
