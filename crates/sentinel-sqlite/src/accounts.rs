//! Account directory and failed-login counters over `accounts` and
//! `security_team_members`.

use rusqlite::{params, Connection, OptionalExtension as _};

use sentinel_contracts::{
    alert::Compensation,
    error::{SentinelError, SentinelResult},
};
use sentinel_core::traits::{AccountDirectory, LoginCounterStore};

use crate::store::{ResultExt, SqliteStore};

fn unknown_account(user_id: i64) -> SentinelError {
    SentinelError::NotFound {
        entity: "user account",
        id: user_id.to_string(),
        reason: "no account with that id".to_string(),
    }
}

fn to_count(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

/// Run a resolve's compensating action on `conn`, normally the resolve's
/// own transaction. Resetting an unknown user's counter is a no-op.
pub(crate) fn apply_compensation(conn: &Connection, compensation: Compensation) -> SentinelResult<()> {
    match compensation {
        Compensation::ResetFailedLogins { user_id } => {
            conn.execute(
                "UPDATE accounts SET failed_login_count = 0 WHERE id = ?1",
                [user_id],
            )
            .ctx("reset failed-login counter")?;
        }
    }
    Ok(())
}

// ── Provisioning ──────────────────────────────────────────────────────────────

impl SqliteStore {
    /// Create or replace an account. `is_admin` marks a privileged admin.
    /// An existing account keeps its failed-login counter.
    pub fn upsert_account(&self, user_id: i64, email: Option<&str>, is_admin: bool) -> SentinelResult<()> {
        self.lock()?
            .execute(
                "INSERT INTO accounts(id, email, is_admin) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(id) DO UPDATE SET email = excluded.email, is_admin = excluded.is_admin",
                params![user_id, email, is_admin],
            )
            .ctx("upsert account")?;
        Ok(())
    }

    pub fn add_security_team_member(&self, email: Option<&str>) -> SentinelResult<()> {
        self.lock()?
            .execute(
                "INSERT INTO security_team_members(email) VALUES (?1)",
                [email],
            )
            .ctx("add security team member")?;
        Ok(())
    }
}

impl AccountDirectory for SqliteStore {
    fn privileged_admin_emails(&self) -> SentinelResult<Vec<Option<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT email FROM accounts WHERE is_admin = 1 ORDER BY id")
            .ctx("prepare admin query")?;
        let emails: Vec<Option<String>> = stmt
            .query_map([], |row| row.get(0))
            .ctx("query admins")?
            .collect::<Result<Vec<_>, _>>()
            .ctx("read admin row")?;
        Ok(emails)
    }

    fn security_team_emails(&self) -> SentinelResult<Vec<Option<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT email FROM security_team_members ORDER BY id")
            .ctx("prepare security team query")?;
        let emails: Vec<Option<String>> = stmt
            .query_map([], |row| row.get(0))
            .ctx("query security team")?
            .collect::<Result<Vec<_>, _>>()
            .ctx("read security team row")?;
        Ok(emails)
    }
}

impl LoginCounterStore for SqliteStore {
    fn record_failed_login(&self, user_id: i64) -> SentinelResult<u32> {
        let count: Option<i64> = self
            .lock()?
            .query_row(
                "UPDATE accounts SET failed_login_count = failed_login_count + 1 \
                 WHERE id = ?1 RETURNING failed_login_count",
                [user_id],
                |row| row.get(0),
            )
            .optional()
            .ctx("record failed login")?;
        count.map(to_count).ok_or_else(|| unknown_account(user_id))
    }

    fn failed_login_count(&self, user_id: i64) -> SentinelResult<u32> {
        let count: Option<i64> = self
            .lock()?
            .query_row(
                "SELECT failed_login_count FROM accounts WHERE id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()
            .ctx("read failed-login counter")?;
        count.map(to_count).ok_or_else(|| unknown_account(user_id))
    }
}
