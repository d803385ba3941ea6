//! # sentinel-sqlite
//!
//! Durable SQLite implementation of every Sentinel store trait:
//! [`LedgerStore`](sentinel_core::traits::LedgerStore),
//! [`AlertStore`](sentinel_core::traits::AlertStore),
//! [`AccountDirectory`](sentinel_core::traits::AccountDirectory) and
//! [`LoginCounterStore`](sentinel_core::traits::LoginCounterStore).
//!
//! Ledger immutability is enforced by the database itself: BEFORE UPDATE
//! and BEFORE DELETE triggers on `ledger_entries` abort any write to an
//! existing row, whichever client issues it. The attestor reads those
//! triggers back from `sqlite_master`.

mod accounts;
mod alerts;
mod ledger;
pub mod schema;
mod store;

pub use store::SqliteStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use rusqlite::Connection;
    use serde_json::json;

    use sentinel_alerts::{AlertEngine, RecipientResolver};
    use sentinel_contracts::{
        alert::{AlertQuery, AlertStatus, AlertType, Compensation, CreateAlertRequest, Severity},
        error::SentinelError,
        ledger::{EntryStatus, LedgerEvent},
        report::{ProtectionKind, ProtectionStatus},
    };
    use sentinel_core::{
        config::AlertConfig,
        traits::{AlertStore, LedgerStore, LoginCounterStore},
    };
    use sentinel_ledger::{ImmutabilityAttestor, IntegrityVerifier, LedgerWriter};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_store() -> Arc<SqliteStore> {
        Arc::new(SqliteStore::open_in_memory().unwrap())
    }

    fn open_file(path: &Path) -> Arc<SqliteStore> {
        Arc::new(SqliteStore::open(path, Duration::from_secs(5)).unwrap())
    }

    fn make_event(n: u32) -> LedgerEvent {
        LedgerEvent::new("phi.view", "patient_record")
            .actor(7)
            .resource_id(format!("patient-{n}"))
            .metadata(json!({ "n": n, "fields": ["dob", "mrn"] }))
    }

    fn fill(store: &Arc<SqliteStore>, count: u32) -> LedgerWriter {
        let writer = LedgerWriter::new(store.clone());
        for n in 0..count {
            writer.append(make_event(n)).unwrap();
        }
        writer
    }

    fn make_engine(store: &Arc<SqliteStore>) -> AlertEngine {
        AlertEngine::new(store.clone(), AlertConfig::default())
    }

    fn raw_sql(store: &SqliteStore, sql: &str) -> rusqlite::Result<()> {
        store.lock().unwrap().execute_batch(sql)
    }

    // ── Schema ────────────────────────────────────────────────────────────────

    #[test]
    fn test_reopening_keeps_data_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.db");
        fill(&open_file(&path), 3);

        let reopened = open_file(&path);
        assert_eq!(reopened.entries().unwrap().len(), 3);
        let version: i64 = reopened
            .lock()
            .unwrap()
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, schema::SCHEMA_VERSION);
    }

    #[test]
    fn test_open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit").join("sentinel.db");
        open_file(&path);
        assert!(path.exists());
    }

    #[test]
    fn test_classify_trigger_requires_unconditional_before_trigger() {
        let blocks_delete = "CREATE TRIGGER t BEFORE DELETE ON ledger_entries \
                             BEGIN SELECT RAISE(ABORT, 'no'); END";
        let blocks_update = "create trigger t\n  before update on ledger_entries\nbegin\n  select raise (fail, 'no');\nend";
        let conditional = "CREATE TRIGGER t BEFORE DELETE ON ledger_entries WHEN old.id > 10 \
                           BEGIN SELECT RAISE(ABORT, 'no'); END";
        let column_scoped = "CREATE TRIGGER t BEFORE UPDATE OF action ON ledger_entries \
                             BEGIN SELECT RAISE(ABORT, 'no'); END";
        let other_table = "CREATE TRIGGER t BEFORE DELETE ON security_alerts \
                           BEGIN SELECT RAISE(ABORT, 'no'); END";
        let no_raise = "CREATE TRIGGER t BEFORE DELETE ON ledger_entries \
                        BEGIN SELECT 1; END";

        assert_eq!(schema::classify_trigger(blocks_delete), Some(ProtectionKind::BlocksDelete));
        assert_eq!(schema::classify_trigger(blocks_update), Some(ProtectionKind::BlocksUpdate));
        assert_eq!(schema::classify_trigger(conditional), None);
        assert_eq!(schema::classify_trigger(column_scoped), None);
        assert_eq!(schema::classify_trigger(other_table), None);
        assert_eq!(schema::classify_trigger(no_raise), None);
    }

    // ── Ledger ────────────────────────────────────────────────────────────────

    #[test]
    fn test_entries_round_trip_exactly() {
        let store = make_store();
        let writer = LedgerWriter::new(store.clone());
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);

        let written = writer
            .append(
                LedgerEvent::new("auth.login", "session")
                    .at(at)
                    .failed("bad password")
                    .metadata(json!({ "ip": "10.0.0.1", "attempt": 2 })),
            )
            .unwrap();
        let read = store.entry(written.id).unwrap().unwrap();

        assert_eq!(read, written);
        assert_eq!(read.status, EntryStatus::Error);
        assert_eq!(read.actor_id, None);
        assert_eq!(read.timestamp.timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn test_four_digit_year_bounds_round_trip() {
        let store = make_store();
        let writer = LedgerWriter::new(store.clone());
        let first = Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap()
            + chrono::Duration::microseconds(999_999);

        for at in [first, last] {
            let written = writer.append(make_event(1).at(at)).unwrap();
            assert_eq!(store.entry(written.id).unwrap().unwrap().timestamp, at);
        }

        let beyond = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert!(writer.append(make_event(2).at(beyond)).unwrap_err().is_validation());

        assert_eq!(store.tail().unwrap().unwrap().id, 2);
        let report = IntegrityVerifier::new(store.clone()).verify().unwrap();
        assert!(report.is_valid);
        assert_eq!(report.total_logs, 2);
    }

    #[test]
    fn test_chain_links_and_verifies() {
        let store = make_store();
        fill(&store, 5);

        let entries = store.entries().unwrap();
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(entries[0].previous_hash, None);
        for pair in entries.windows(2) {
            assert_eq!(pair[1].previous_hash.as_deref(), Some(pair[0].entry_hash.as_str()));
        }

        let report = IntegrityVerifier::new(store.clone()).verify().unwrap();
        assert!(report.is_valid);
        assert_eq!(report.total_logs, 5);
        assert_eq!(report.head_hash.as_deref(), Some(entries[4].entry_hash.as_str()));
    }

    #[test]
    fn test_tail_and_range() {
        let store = make_store();
        assert!(store.tail().unwrap().is_none());
        fill(&store, 6);

        assert_eq!(store.tail().unwrap().unwrap().id, 6);
        let ids: Vec<u64> = store.range(3, 2).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert!(store.range(10, 5).unwrap().is_empty());
        assert!(store.entry(99).unwrap().is_none());
    }

    #[test]
    fn test_triggers_refuse_update_and_delete() {
        let store = make_store();
        fill(&store, 2);

        let update = raw_sql(&store, "UPDATE ledger_entries SET action = 'phi.edit' WHERE id = 1");
        let delete = raw_sql(&store, "DELETE FROM ledger_entries WHERE id = 2");
        assert!(update.unwrap_err().to_string().contains("append-only"));
        assert!(delete.unwrap_err().to_string().contains("append-only"));
        assert!(IntegrityVerifier::new(store.clone()).verify().unwrap().is_valid);
    }

    #[test]
    fn test_attestor_reads_installed_triggers() {
        let store = make_store();
        let report = ImmutabilityAttestor::new(store.clone()).check_status();

        assert!(report.is_fully_protected);
        assert_eq!(report.delete_protection, ProtectionStatus::Active);
        assert_eq!(report.update_protection, ProtectionStatus::Active);
        let names: Vec<&str> = report.mechanisms.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["ledger_entries_no_delete", "ledger_entries_no_update"]);
    }

    #[test]
    fn test_dropped_trigger_stays_missing_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.db");
        open_file(&path);

        Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TRIGGER ledger_entries_no_delete")
            .unwrap();

        let report = ImmutabilityAttestor::new(open_file(&path)).check_status();
        assert!(!report.is_fully_protected);
        assert_eq!(report.delete_protection, ProtectionStatus::Missing);
        assert_eq!(report.update_protection, ProtectionStatus::Active);
    }

    #[test]
    fn test_direct_tampering_is_attributed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.db");
        let store = open_file(&path);
        fill(&store, 4);

        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "DROP TRIGGER ledger_entries_no_update;
                 UPDATE ledger_entries SET resource_id = 'patient-999' WHERE id = 2;",
            )
            .unwrap();

        let report = IntegrityVerifier::new(store.clone()).verify().unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.verified_logs, 3);
        let ids: Vec<u64> = report.tampered_logs.iter().map(|t| t.log_id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_deleted_row_is_detected() {
        let store = make_store();
        fill(&store, 4);
        raw_sql(
            &store,
            "DROP TRIGGER ledger_entries_no_delete; DELETE FROM ledger_entries WHERE id = 3;",
        )
        .unwrap();

        let report = IntegrityVerifier::new(store.clone()).verify().unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.total_logs, 3);
        assert_eq!(report.tampered_logs[0].log_id, 4);
    }

    #[test]
    fn test_concurrent_handles_are_linearized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.db");
        let first = open_file(&path);
        let second = open_file(&path);

        let handles: Vec<_> = [first.clone(), second.clone(), first.clone(), second]
            .into_iter()
            .enumerate()
            .map(|(t, store)| {
                thread::spawn(move || {
                    let writer = LedgerWriter::new(store);
                    for n in 0..15 {
                        writer.append(make_event(t as u32 * 100 + n)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let report = IntegrityVerifier::new(first).verify().unwrap();
        assert!(report.is_valid, "{report:?}");
        assert_eq!(report.total_logs, 60);
    }

    // ── Alerts ────────────────────────────────────────────────────────────────

    #[test]
    fn test_alert_lifecycle_persists() {
        let store = make_store();
        let engine = make_engine(&store);

        let alert = engine
            .create_alert(
                CreateAlertRequest::new(AlertType::UnauthorizedAccess, Severity::Critical, "chart opened without relationship")
                    .subject(12)
                    .source_ip("2001:db8::1")
                    .details(json!({ "patient": "p-77" })),
            )
            .unwrap();
        assert_eq!(store.get(alert.id).unwrap().unwrap(), alert);

        let acked = engine.acknowledge_alert(alert.id, 3).unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);
        assert!(engine.acknowledge_alert(alert.id, 4).unwrap_err().is_not_found());

        let resolved = engine.resolve_alert(alert.id, 3).unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(resolved.acknowledged_by, Some(3));
        assert!(resolved.resolved_at.is_some());
        assert!(engine.resolve_alert(alert.id, 3).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_leaves_resolved_alerts_alone() {
        let store = make_store();
        let engine = make_engine(&store);
        let alert = engine
            .create_alert(CreateAlertRequest::new(AlertType::BulkDataExport, Severity::Medium, "export"))
            .unwrap();

        let updated = engine
            .update_alert(
                alert.id,
                sentinel_contracts::alert::AlertPatch {
                    message: None,
                    details: Some(json!({ "rows": 12000 })),
                },
            )
            .unwrap();
        assert_eq!(updated.message, "export");
        assert_eq!(updated.details, json!({ "rows": 12000 }));

        engine.resolve_alert(alert.id, 1).unwrap();
        let patch = sentinel_contracts::alert::AlertPatch {
            message: Some("changed".to_string()),
            details: None,
        };
        assert!(store.update(alert.id, &patch).unwrap().is_none());
        assert_eq!(store.get(alert.id).unwrap().unwrap().message, "export");
    }

    #[test]
    fn test_list_filters_orders_and_pages() {
        let store = make_store();
        let engine = make_engine(&store);
        for i in 0..7 {
            let severity = if i % 2 == 0 { Severity::High } else { Severity::Low };
            engine
                .create_alert(CreateAlertRequest::new(AlertType::SuspiciousActivity, severity, format!("alert {i}")))
                .unwrap();
        }
        engine.acknowledge_alert(7, 1).unwrap();

        let page = engine
            .list_alerts(AlertQuery { page: Some(2), limit: Some(3), ..AlertQuery::default() })
            .unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.alerts.iter().map(|a| a.id).collect::<Vec<_>>(), vec![4, 3, 2]);

        let high = engine
            .list_alerts(AlertQuery { severity: Some(Severity::High), ..AlertQuery::default() })
            .unwrap();
        assert_eq!(high.total, 4);

        let acked_high = engine
            .list_alerts(AlertQuery {
                status: Some(AlertStatus::Acknowledged),
                severity: Some(Severity::High),
                ..AlertQuery::default()
            })
            .unwrap();
        assert_eq!(acked_high.alerts.iter().map(|a| a.id).collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_resolving_lockout_resets_counter() {
        let store = make_store();
        store.upsert_account(42, Some("pat@clinic.test"), false).unwrap();
        for _ in 0..5 {
            store.record_failed_login(42).unwrap();
        }
        let engine = make_engine(&store);
        let alert = engine
            .create_alert(CreateAlertRequest::new(AlertType::LockoutThreshold, Severity::High, "locked").subject(42))
            .unwrap();

        engine.resolve_alert(alert.id, 1).unwrap();
        assert_eq!(store.failed_login_count(42).unwrap(), 0);
    }

    #[test]
    fn test_failed_compensation_rolls_back_resolve() {
        let store = make_store();
        store.upsert_account(42, None, false).unwrap();
        store.record_failed_login(42).unwrap();
        raw_sql(
            &store,
            "CREATE TRIGGER accounts_frozen BEFORE UPDATE ON accounts \
             BEGIN SELECT RAISE(ABORT, 'accounts are frozen'); END;",
        )
        .unwrap();
        let engine = make_engine(&store);
        let alert = engine
            .create_alert(CreateAlertRequest::new(AlertType::LockoutThreshold, Severity::High, "locked").subject(42))
            .unwrap();

        let err = engine.resolve_alert(alert.id, 1).unwrap_err();
        assert!(matches!(err, SentinelError::Storage { .. }));
        assert_eq!(store.get(alert.id).unwrap().unwrap().status, AlertStatus::New);
        assert_eq!(store.failed_login_count(42).unwrap(), 1);
    }

    // ── Accounts ──────────────────────────────────────────────────────────────

    #[test]
    fn test_failed_login_counters() {
        let store = make_store();
        store.upsert_account(5, None, false).unwrap();

        assert_eq!(store.record_failed_login(5).unwrap(), 1);
        assert_eq!(store.record_failed_login(5).unwrap(), 2);
        store.upsert_account(5, Some("new@clinic.test"), false).unwrap();
        assert_eq!(store.failed_login_count(5).unwrap(), 2, "upsert keeps the counter");

        let conn = store.lock().unwrap();
        accounts::apply_compensation(&conn, Compensation::ResetFailedLogins { user_id: 5 }).unwrap();
        accounts::apply_compensation(&conn, Compensation::ResetFailedLogins { user_id: 6 }).unwrap();
        drop(conn);
        assert_eq!(store.failed_login_count(5).unwrap(), 0);

        assert!(store.record_failed_login(6).unwrap_err().is_not_found());
    }

    #[test]
    fn test_directory_feeds_recipient_resolver() {
        let store = make_store();
        store.upsert_account(1, Some("Chief@Clinic.test"), true).unwrap();
        store.upsert_account(2, Some("nurse@clinic.test"), false).unwrap();
        store.upsert_account(3, None, true).unwrap();
        store.add_security_team_member(Some("chief@clinic.test")).unwrap();
        store.add_security_team_member(Some("soc@clinic.test")).unwrap();
        store.add_security_team_member(Some("")).unwrap();

        let recipients = RecipientResolver::new(store).resolve_recipients();
        let recipients: Vec<&str> = recipients.iter().map(String::as_str).collect();
        assert_eq!(recipients, vec!["chief@clinic.test", "soc@clinic.test"]);
    }
}
