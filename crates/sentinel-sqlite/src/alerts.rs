//! `AlertStore` over the `security_alerts` table.
//!
//! Lifecycle transitions are single conditional UPDATEs whose WHERE clause
//! carries the required current status, so the guard and the write are one
//! atomic step. Resolve and its compensating action share a transaction.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension as _, Row, TransactionBehavior};

use sentinel_contracts::{
    alert::{
        AlertFilter, AlertPatch, AlertStatus, AlertType, Compensation, NewAlert, SecurityAlert,
        Severity,
    },
    error::{SentinelError, SentinelResult},
};
use sentinel_core::traits::AlertStore;

use crate::accounts;
use crate::store::{format_ts, parse_json, parse_ts, ResultExt, SqliteStore};

const ALERT_COLUMNS: &str = "id, alert_type, severity, subject_user_id, source_ip, message, \
                             details, status, acknowledged_by, acknowledged_at, resolved_by, \
                             resolved_at, created_at";

struct RawAlert {
    id: i64,
    alert_type: String,
    severity: String,
    subject_user_id: Option<i64>,
    source_ip: Option<String>,
    message: String,
    details: String,
    status: String,
    acknowledged_by: Option<i64>,
    acknowledged_at: Option<String>,
    resolved_by: Option<i64>,
    resolved_at: Option<String>,
    created_at: String,
}

impl RawAlert {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            alert_type: row.get(1)?,
            severity: row.get(2)?,
            subject_user_id: row.get(3)?,
            source_ip: row.get(4)?,
            message: row.get(5)?,
            details: row.get(6)?,
            status: row.get(7)?,
            acknowledged_by: row.get(8)?,
            acknowledged_at: row.get(9)?,
            resolved_by: row.get(10)?,
            resolved_at: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn into_alert(self) -> SentinelResult<SecurityAlert> {
        let corrupt = |e: SentinelError| SentinelError::storage(format!("corrupt alert {}: {e}", self.id));
        let opt_ts = |raw: &Option<String>, column: &str| -> SentinelResult<Option<DateTime<Utc>>> {
            raw.as_deref().map(|r| parse_ts(r, column)).transpose()
        };

        Ok(SecurityAlert {
            id: self.id,
            alert_type: AlertType::from_str(&self.alert_type).map_err(corrupt)?,
            severity: Severity::from_str(&self.severity).map_err(corrupt)?,
            subject_user_id: self.subject_user_id,
            source_ip: self.source_ip.clone(),
            message: self.message.clone(),
            details: parse_json(&self.details, "alert details")?,
            status: AlertStatus::from_str(&self.status).map_err(corrupt)?,
            acknowledged_by: self.acknowledged_by,
            acknowledged_at: opt_ts(&self.acknowledged_at, "acknowledged_at")?,
            resolved_by: self.resolved_by,
            resolved_at: opt_ts(&self.resolved_at, "resolved_at")?,
            created_at: parse_ts(&self.created_at, "created_at")?,
        })
    }
}

fn fetch(conn: &Connection, id: i64) -> SentinelResult<Option<SecurityAlert>> {
    conn.query_row(
        &format!("SELECT {ALERT_COLUMNS} FROM security_alerts WHERE id = ?1"),
        [id],
        RawAlert::from_row,
    )
    .optional()
    .ctx("read security alert")?
    .map(RawAlert::into_alert)
    .transpose()
}

/// Reload the row if the conditional write matched it.
fn write_then_fetch(conn: &Connection, id: i64, changed: usize) -> SentinelResult<Option<SecurityAlert>> {
    if changed == 0 {
        return Ok(None);
    }
    fetch(conn, id)
}

impl AlertStore for SqliteStore {
    fn insert(&self, alert: NewAlert) -> SentinelResult<SecurityAlert> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO security_alerts(
              alert_type, severity, subject_user_id, source_ip, message, details, status, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,'new',?7)
            "#,
            params![
                alert.alert_type.as_str(),
                alert.severity.as_str(),
                alert.subject_user_id,
                alert.source_ip,
                alert.message,
                alert.details.to_string(),
                format_ts(&alert.created_at),
            ],
        )
        .ctx("insert security alert")?;

        let id = conn.last_insert_rowid();
        fetch(&conn, id)?
            .ok_or_else(|| SentinelError::storage(format!("alert {id} vanished after insert")))
    }

    fn get(&self, id: i64) -> SentinelResult<Option<SecurityAlert>> {
        let conn = self.lock()?;
        fetch(&conn, id)
    }

    fn list(&self, filter: &AlertFilter) -> SentinelResult<(Vec<SecurityAlert>, u64)> {
        let conn = self.lock()?;
        let status = filter.status.map(|s| s.as_str());
        let severity = filter.severity.map(|s| s.as_str());
        let matching = "(?1 IS NULL OR status = ?1) AND (?2 IS NULL OR severity = ?2)";

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM security_alerts WHERE {matching}"),
                params![status, severity],
                |row| row.get(0),
            )
            .ctx("count security alerts")?;

        let offset = i64::try_from(filter.offset()).unwrap_or(i64::MAX);
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ALERT_COLUMNS} FROM security_alerts WHERE {matching} \
                 ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4"
            ))
            .ctx("prepare alert listing")?;
        let rows = stmt
            .query_map(
                params![status, severity, i64::from(filter.limit), offset],
                RawAlert::from_row,
            )
            .ctx("list security alerts")?
            .collect::<Result<Vec<_>, _>>()
            .ctx("read security alert row")?;

        let alerts = rows
            .into_iter()
            .map(RawAlert::into_alert)
            .collect::<SentinelResult<Vec<_>>>()?;
        Ok((alerts, total.max(0) as u64))
    }

    fn acknowledge(
        &self,
        id: i64,
        actor_id: i64,
        at: DateTime<Utc>,
    ) -> SentinelResult<Option<SecurityAlert>> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE security_alerts \
                 SET status = 'acknowledged', acknowledged_by = ?2, acknowledged_at = ?3 \
                 WHERE id = ?1 AND status = 'new'",
                params![id, actor_id, format_ts(&at)],
            )
            .ctx("acknowledge security alert")?;
        write_then_fetch(&conn, id, changed)
    }

    fn update(&self, id: i64, patch: &AlertPatch) -> SentinelResult<Option<SecurityAlert>> {
        let conn = self.lock()?;
        let details = patch.details.as_ref().map(|d| d.to_string());
        let changed = conn
            .execute(
                "UPDATE security_alerts \
                 SET message = COALESCE(?2, message), details = COALESCE(?3, details) \
                 WHERE id = ?1 AND status != 'resolved'",
                params![id, patch.message, details],
            )
            .ctx("update security alert")?;
        write_then_fetch(&conn, id, changed)
    }

    fn resolve(
        &self,
        id: i64,
        actor_id: i64,
        at: DateTime<Utc>,
        compensation: Option<Compensation>,
    ) -> SentinelResult<Option<SecurityAlert>> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .ctx("begin alert resolve")?;

        let changed = tx
            .execute(
                "UPDATE security_alerts \
                 SET status = 'resolved', resolved_by = ?2, resolved_at = ?3 \
                 WHERE id = ?1 AND status != 'resolved'",
                params![id, actor_id, format_ts(&at)],
            )
            .ctx("resolve security alert")?;
        if changed == 0 {
            return Ok(None);
        }

        if let Some(compensation) = compensation {
            accounts::apply_compensation(&tx, compensation)?;
        }

        let alert = fetch(&tx, id)?;
        tx.commit().ctx("commit alert resolve")?;
        Ok(alert)
    }
}
