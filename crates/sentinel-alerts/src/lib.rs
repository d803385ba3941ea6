//! # sentinel-alerts
//!
//! Security-alert lifecycle for the Sentinel audit core.
//!
//! - [`AlertEngine`] creates, lists, acknowledges, updates, and resolves
//!   alerts, and owns the lockout compensating action.
//! - [`RecipientResolver`] computes the notification audience.
//! - [`NotificationDispatcher`] delivers notifications best-effort through an
//!   injected [`NotificationSender`](sentinel_core::traits::NotificationSender).
//! - [`FailedLoginDetector`] turns failed logins into alerts.
//!
//! Notification failures never block an alert from existing: the alert is
//! persisted first and remains actionable from the dashboard whatever the
//! dispatcher reports.

pub mod detect;
pub mod dispatch;
pub mod engine;
pub mod memory;
pub mod recipients;

pub use detect::{FailedLoginDetector, LoginFailureOutcome};
pub use dispatch::NotificationDispatcher;
pub use engine::{lockout_compensation, AlertEngine};
pub use memory::InMemorySecurityStore;
pub use recipients::RecipientResolver;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};
    use serde_json::json;

    use sentinel_contracts::{
        alert::{
            AlertFilter, AlertPatch, AlertQuery, AlertStatus, AlertType, Compensation,
            CreateAlertRequest, NewAlert, SecurityAlert, Severity,
        },
        error::{SentinelError, SentinelResult},
        report::DeliveryReceipt,
    };
    use sentinel_core::{
        config::{AlertConfig, DetectionConfig, NotificationConfig},
        traits::{AccountDirectory, AlertStore, LoginCounterStore, NotificationSender},
    };

    use super::*;

    // ── Mocks ─────────────────────────────────────────────────────────────────

    /// Wraps the in-memory store and records every call by name.
    struct RecordingStore {
        inner: InMemorySecurityStore,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl RecordingStore {
        fn new(inner: InMemorySecurityStore) -> Self {
            Self {
                inner,
                calls: Arc::new(Mutex::new(vec![])),
            }
        }

        fn record(&self, name: &'static str) {
            self.calls.lock().unwrap().push(name);
        }
    }

    impl AlertStore for RecordingStore {
        fn insert(&self, alert: NewAlert) -> SentinelResult<SecurityAlert> {
            self.record("insert");
            self.inner.insert(alert)
        }
        fn get(&self, id: i64) -> SentinelResult<Option<SecurityAlert>> {
            self.record("get");
            self.inner.get(id)
        }
        fn list(&self, filter: &AlertFilter) -> SentinelResult<(Vec<SecurityAlert>, u64)> {
            self.record("list");
            self.inner.list(filter)
        }
        fn acknowledge(
            &self,
            id: i64,
            actor_id: i64,
            at: DateTime<Utc>,
        ) -> SentinelResult<Option<SecurityAlert>> {
            self.record("acknowledge");
            self.inner.acknowledge(id, actor_id, at)
        }
        fn update(&self, id: i64, patch: &AlertPatch) -> SentinelResult<Option<SecurityAlert>> {
            self.record("update");
            self.inner.update(id, patch)
        }
        fn resolve(
            &self,
            id: i64,
            actor_id: i64,
            at: DateTime<Utc>,
            compensation: Option<Compensation>,
        ) -> SentinelResult<Option<SecurityAlert>> {
            self.record("resolve");
            if compensation.is_some() {
                self.record("compensate");
            }
            self.inner.resolve(id, actor_id, at, compensation)
        }
    }

    /// An alert store whose compensating action always fails.
    struct BrokenCounterStore(InMemorySecurityStore);

    impl AlertStore for BrokenCounterStore {
        fn insert(&self, alert: NewAlert) -> SentinelResult<SecurityAlert> {
            self.0.insert(alert)
        }
        fn get(&self, id: i64) -> SentinelResult<Option<SecurityAlert>> {
            self.0.get(id)
        }
        fn list(&self, filter: &AlertFilter) -> SentinelResult<(Vec<SecurityAlert>, u64)> {
            self.0.list(filter)
        }
        fn acknowledge(
            &self,
            id: i64,
            actor_id: i64,
            at: DateTime<Utc>,
        ) -> SentinelResult<Option<SecurityAlert>> {
            self.0.acknowledge(id, actor_id, at)
        }
        fn update(&self, id: i64, patch: &AlertPatch) -> SentinelResult<Option<SecurityAlert>> {
            self.0.update(id, patch)
        }
        fn resolve(
            &self,
            id: i64,
            actor_id: i64,
            at: DateTime<Utc>,
            compensation: Option<Compensation>,
        ) -> SentinelResult<Option<SecurityAlert>> {
            if compensation.is_some() {
                return Err(SentinelError::storage("users table is locked"));
            }
            self.0.resolve(id, actor_id, at, compensation)
        }
    }

    /// A directory that counts reads and can be told to fail.
    struct CountingDirectory {
        admins: Vec<Option<String>>,
        team: Vec<Option<String>>,
        fail: bool,
        reads: Arc<Mutex<u32>>,
    }

    impl CountingDirectory {
        fn new(admins: &[Option<&str>], team: &[Option<&str>]) -> Self {
            let own = |v: &[Option<&str>]| v.iter().map(|e| e.map(str::to_string)).collect();
            Self {
                admins: own(admins),
                team: own(team),
                fail: false,
                reads: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl AccountDirectory for CountingDirectory {
        fn privileged_admin_emails(&self) -> SentinelResult<Vec<Option<String>>> {
            *self.reads.lock().unwrap() += 1;
            if self.fail {
                return Err(SentinelError::storage("directory offline"));
            }
            Ok(self.admins.clone())
        }
        fn security_team_emails(&self) -> SentinelResult<Vec<Option<String>>> {
            *self.reads.lock().unwrap() += 1;
            Ok(self.team.clone())
        }
    }

    /// A sender that records recipients and fails for listed addresses.
    struct MockSender {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        erroring: Vec<&'static str>,
        rejecting: Vec<&'static str>,
    }

    impl MockSender {
        fn new() -> Self {
            Self {
                sent: Arc::new(Mutex::new(vec![])),
                erroring: vec![],
                rejecting: vec![],
            }
        }
    }

    impl NotificationSender for MockSender {
        fn send(&self, recipient: &str, subject: &str, _body: &str) -> SentinelResult<DeliveryReceipt> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), subject.to_string()));
            if self.erroring.contains(&recipient) {
                return Err(SentinelError::storage("smtp connection reset"));
            }
            if self.rejecting.contains(&recipient) {
                return Ok(DeliveryReceipt::failed("mailbox unavailable"));
            }
            Ok(DeliveryReceipt::delivered())
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_engine() -> (InMemorySecurityStore, AlertEngine) {
        let store = InMemorySecurityStore::new();
        let engine = AlertEngine::new(Arc::new(store.clone()), AlertConfig::default());
        (store, engine)
    }

    fn make_alert(engine: &AlertEngine, alert_type: AlertType, subject: Option<i64>) -> SecurityAlert {
        let mut request = CreateAlertRequest::new(alert_type, Severity::High, "check this account");
        if let Some(user_id) = subject {
            request = request.subject(user_id);
        }
        engine.create_alert(request).unwrap()
    }

    fn make_dispatcher(
        directory: CountingDirectory,
        sender: MockSender,
        enabled: bool,
    ) -> NotificationDispatcher {
        let config = NotificationConfig {
            enabled,
            ..NotificationConfig::default()
        };
        NotificationDispatcher::new(
            RecipientResolver::new(Arc::new(directory)),
            Arc::new(sender),
            config,
        )
    }

    // ── create_alert ──────────────────────────────────────────────────────────

    #[test]
    fn test_create_persists_new_alert() {
        let (_, engine) = make_engine();
        let alert = engine
            .create_alert(
                CreateAlertRequest::new(AlertType::SuspiciousActivity, Severity::Medium, "bulk PHI reads")
                    .subject(7)
                    .source_ip("10.1.2.3")
                    .details(json!({ "records": 480 })),
            )
            .unwrap();

        assert_eq!(alert.status, AlertStatus::New);
        assert_eq!(alert.subject_user_id, Some(7));
        assert_eq!(alert.source_ip.as_deref(), Some("10.1.2.3"));
        assert_eq!(alert.details, json!({ "records": 480 }));
        assert_eq!(engine.get_alert(alert.id).unwrap(), alert);
    }

    #[test]
    fn test_create_defaults_details_to_empty_object() {
        let (_, engine) = make_engine();
        let alert = make_alert(&engine, AlertType::SuspiciousActivity, None);
        assert_eq!(alert.details, json!({}));
    }

    #[test]
    fn test_create_requires_type_severity_and_message() {
        let (_, engine) = make_engine();
        let valid = CreateAlertRequest::new(AlertType::SuspiciousActivity, Severity::Low, "x");

        let missing = vec![
            CreateAlertRequest { alert_type: None, ..valid.clone() },
            CreateAlertRequest { severity: None, ..valid.clone() },
            CreateAlertRequest { message: None, ..valid.clone() },
            CreateAlertRequest { message: Some("   ".to_string()), ..valid.clone() },
        ];
        for request in missing {
            let err = engine.create_alert(request).unwrap_err();
            assert!(err.is_validation());
            assert!(err.to_string().contains("required"));
        }
    }

    #[test]
    fn test_create_rejects_invalid_severity() {
        let (store, engine) = make_engine();
        let request = CreateAlertRequest {
            alert_type: Some("suspicious_activity".to_string()),
            severity: Some("extreme".to_string()),
            message: Some("odd".to_string()),
            ..CreateAlertRequest::default()
        };
        let err = engine.create_alert(request).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("invalid severity"));
        assert_eq!(store.list(&AlertFilter { status: None, severity: None, page: 1, limit: 10 }).unwrap().1, 0);
    }

    #[test]
    fn test_create_rejects_unknown_type_and_bad_ip() {
        let (_, engine) = make_engine();
        let request = CreateAlertRequest {
            alert_type: Some("alien_invasion".to_string()),
            severity: Some("low".to_string()),
            message: Some("odd".to_string()),
            ..CreateAlertRequest::default()
        };
        assert!(engine.create_alert(request).unwrap_err().to_string().contains("invalid alert type"));

        let request = CreateAlertRequest::new(AlertType::SuspiciousActivity, Severity::Low, "odd")
            .source_ip("not-an-ip");
        assert!(engine.create_alert(request).unwrap_err().to_string().contains("invalid source_ip"));
    }

    // ── list_alerts ───────────────────────────────────────────────────────────

    #[test]
    fn test_list_pages_newest_first() {
        let (_, engine) = make_engine();
        for _ in 0..5 {
            make_alert(&engine, AlertType::SuspiciousActivity, None);
        }

        let page = engine
            .list_alerts(AlertQuery { page: Some(2), limit: Some(2), ..AlertQuery::default() })
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 2);
        let ids: Vec<i64> = page.alerts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_list_clamps_out_of_range_paging() {
        let (_, engine) = make_engine();
        make_alert(&engine, AlertType::SuspiciousActivity, None);

        let page = engine
            .list_alerts(AlertQuery { page: Some(0), limit: Some(-5), ..AlertQuery::default() })
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 20);
        assert_eq!(page.alerts.len(), 1);

        let page = engine
            .list_alerts(AlertQuery { page: Some(-3), limit: Some(10_000), ..AlertQuery::default() })
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 100);
    }

    #[test]
    fn test_list_filters_by_status_and_severity() {
        let (_, engine) = make_engine();
        let a = make_alert(&engine, AlertType::SuspiciousActivity, None);
        make_alert(&engine, AlertType::SuspiciousActivity, None);
        engine
            .create_alert(CreateAlertRequest::new(AlertType::BulkDataExport, Severity::Low, "export"))
            .unwrap();
        engine.acknowledge_alert(a.id, 1).unwrap();

        let acknowledged = engine
            .list_alerts(AlertQuery { status: Some(AlertStatus::Acknowledged), ..AlertQuery::default() })
            .unwrap();
        assert_eq!(acknowledged.total, 1);
        assert_eq!(acknowledged.alerts[0].id, a.id);

        let low = engine
            .list_alerts(AlertQuery { severity: Some(Severity::Low), ..AlertQuery::default() })
            .unwrap();
        assert_eq!(low.total, 1);
        assert_eq!(low.alerts[0].alert_type, AlertType::BulkDataExport);
    }

    #[test]
    fn test_list_empty_has_zero_pages() {
        let (_, engine) = make_engine();
        let page = engine.list_alerts(AlertQuery::default()).unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.alerts.is_empty());
    }

    // ── acknowledge_alert ─────────────────────────────────────────────────────

    #[test]
    fn test_acknowledge_new_alert() {
        let (_, engine) = make_engine();
        let alert = make_alert(&engine, AlertType::SuspiciousActivity, None);

        let acked = engine.acknowledge_alert(alert.id, 9).unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);
        assert_eq!(acked.acknowledged_by, Some(9));
        assert!(acked.acknowledged_at.is_some());
    }

    #[test]
    fn test_acknowledge_past_new_is_not_found() {
        let (_, engine) = make_engine();
        let acked = make_alert(&engine, AlertType::SuspiciousActivity, None);
        engine.acknowledge_alert(acked.id, 9).unwrap();
        let resolved = make_alert(&engine, AlertType::SuspiciousActivity, None);
        engine.resolve_alert(resolved.id, 9).unwrap();

        assert!(engine.acknowledge_alert(acked.id, 9).unwrap_err().is_not_found());
        assert!(engine.acknowledge_alert(resolved.id, 9).unwrap_err().is_not_found());
        assert!(engine.acknowledge_alert(999, 9).unwrap_err().is_not_found());

        // The failed second acknowledge did not overwrite the first.
        assert_eq!(engine.get_alert(acked.id).unwrap().acknowledged_by, Some(9));
    }

    // ── update_alert ──────────────────────────────────────────────────────────

    #[test]
    fn test_update_requires_a_field() {
        let (_, engine) = make_engine();
        let alert = make_alert(&engine, AlertType::SuspiciousActivity, None);
        assert!(engine.update_alert(alert.id, AlertPatch::default()).unwrap_err().is_validation());
    }

    #[test]
    fn test_update_changes_only_supplied_fields() {
        let (_, engine) = make_engine();
        let alert = engine
            .create_alert(
                CreateAlertRequest::new(AlertType::SuspiciousActivity, Severity::Low, "before")
                    .details(json!({ "k": 1 })),
            )
            .unwrap();

        let updated = engine
            .update_alert(alert.id, AlertPatch { message: Some("after".to_string()), details: None })
            .unwrap();
        assert_eq!(updated.message, "after");
        assert_eq!(updated.details, json!({ "k": 1 }));
        assert_eq!(updated.status, AlertStatus::New);
    }

    #[test]
    fn test_update_missing_or_resolved_is_not_found() {
        let (_, engine) = make_engine();
        let patch = AlertPatch { message: None, details: Some(json!({ "note": "x" })) };
        assert!(engine.update_alert(404, patch.clone()).unwrap_err().is_not_found());

        let alert = make_alert(&engine, AlertType::SuspiciousActivity, None);
        engine.resolve_alert(alert.id, 1).unwrap();
        assert!(engine.update_alert(alert.id, patch).unwrap_err().is_not_found());
    }

    // ── resolve_alert ─────────────────────────────────────────────────────────

    #[test]
    fn test_resolve_lockout_resets_subject_counter() {
        let (store, engine) = make_engine();
        store.add_account(42, Some("pat@clinic.test"), false).unwrap();
        store.set_failed_logins(42, 5).unwrap();
        let alert = make_alert(&engine, AlertType::LockoutThreshold, Some(42));

        let resolved = engine.resolve_alert(alert.id, 3).unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(resolved.resolved_by, Some(3));
        assert!(resolved.resolved_at.is_some());
        assert_eq!(store.failed_login_count(42).unwrap(), 0);
    }

    #[test]
    fn test_resolve_other_types_leave_counters_alone() {
        let store = InMemorySecurityStore::new();
        store.add_account(42, None, false).unwrap();
        store.set_failed_logins(42, 5).unwrap();
        let recording = Arc::new(RecordingStore::new(store.clone()));
        let engine = AlertEngine::new(recording.clone(), AlertConfig::default());

        let alert = make_alert(&engine, AlertType::MultipleFailedLogins, Some(42));
        engine.resolve_alert(alert.id, 3).unwrap();

        assert_eq!(store.failed_login_count(42).unwrap(), 5);
        assert!(!recording.calls.lock().unwrap().contains(&"compensate"));
    }

    #[test]
    fn test_resolve_lockout_without_subject_has_no_side_effect() {
        let (_, engine) = make_engine();
        let alert = make_alert(&engine, AlertType::LockoutThreshold, None);
        assert_eq!(lockout_compensation(&alert), None);
        assert_eq!(engine.resolve_alert(alert.id, 3).unwrap().status, AlertStatus::Resolved);
    }

    #[test]
    fn test_resolve_missing_alert_issues_no_writes() {
        let recording = Arc::new(RecordingStore::new(InMemorySecurityStore::new()));
        let engine = AlertEngine::new(recording.clone(), AlertConfig::default());

        assert!(engine.resolve_alert(77, 1).unwrap_err().is_not_found());
        assert_eq!(*recording.calls.lock().unwrap(), vec!["get"]);
    }

    #[test]
    fn test_resolve_acknowledged_then_again_fails() {
        let (store, engine) = make_engine();
        store.add_account(42, None, false).unwrap();
        let alert = make_alert(&engine, AlertType::LockoutThreshold, Some(42));
        engine.acknowledge_alert(alert.id, 2).unwrap();
        engine.resolve_alert(alert.id, 2).unwrap();

        store.set_failed_logins(42, 5).unwrap();
        assert!(engine.resolve_alert(alert.id, 2).unwrap_err().is_not_found());
        assert_eq!(store.failed_login_count(42).unwrap(), 5, "second resolve must not compensate");
    }

    #[test]
    fn test_resolve_fails_when_compensation_fails() {
        let store = InMemorySecurityStore::new();
        let engine = AlertEngine::new(Arc::new(BrokenCounterStore(store.clone())), AlertConfig::default());
        let alert = make_alert(&engine, AlertType::LockoutThreshold, Some(42));

        let err = engine.resolve_alert(alert.id, 1).unwrap_err();
        assert!(matches!(err, SentinelError::Storage { .. }));
        assert_eq!(engine.get_alert(alert.id).unwrap().status, AlertStatus::New);
    }

    // ── RecipientResolver ─────────────────────────────────────────────────────

    #[test]
    fn test_recipients_are_union_without_blanks_or_duplicates() {
        let directory = CountingDirectory::new(
            &[Some("admin@clinic.test"), None, Some(""), Some("Sec@Clinic.test")],
            &[Some("sec@clinic.test"), Some("  "), Some("oncall@clinic.test")],
        );
        let recipients = RecipientResolver::new(Arc::new(directory)).resolve_recipients();
        let recipients: Vec<&str> = recipients.iter().map(String::as_str).collect();
        assert_eq!(
            recipients,
            vec!["admin@clinic.test", "oncall@clinic.test", "sec@clinic.test"]
        );
    }

    #[test]
    fn test_recipients_empty_on_directory_failure() {
        let mut directory = CountingDirectory::new(&[Some("admin@clinic.test")], &[]);
        directory.fail = true;
        assert!(RecipientResolver::new(Arc::new(directory)).resolve_recipients().is_empty());
    }

    #[test]
    fn test_recipients_from_in_memory_store() {
        let store = InMemorySecurityStore::new();
        store.add_account(1, Some("admin@clinic.test"), true).unwrap();
        store.add_account(2, Some("nurse@clinic.test"), false).unwrap();
        store.add_security_team_member(Some("admin@clinic.test")).unwrap();
        store.add_security_team_member(None).unwrap();

        let recipients = RecipientResolver::new(Arc::new(store)).resolve_recipients();
        assert_eq!(recipients.len(), 1);
        assert!(recipients.contains("admin@clinic.test"));
    }

    // ── NotificationDispatcher ────────────────────────────────────────────────

    #[test]
    fn test_dispatch_requires_alert() {
        let dispatcher = make_dispatcher(CountingDirectory::new(&[], &[]), MockSender::new(), true);
        assert!(dispatcher.dispatch(None).unwrap_err().is_validation());
    }

    #[test]
    fn test_dispatch_disabled_skips_resolution() {
        let (_, engine) = make_engine();
        let alert = make_alert(&engine, AlertType::SuspiciousActivity, None);
        let directory = CountingDirectory::new(&[Some("admin@clinic.test")], &[]);
        let reads = Arc::clone(&directory.reads);
        let dispatcher = make_dispatcher(directory, MockSender::new(), false);

        let outcome = dispatcher.dispatch(Some(&alert)).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("Email notifications disabled"));
        assert_eq!(*reads.lock().unwrap(), 0, "resolver must not be consulted");
    }

    #[test]
    fn test_dispatch_without_recipients() {
        let (_, engine) = make_engine();
        let alert = make_alert(&engine, AlertType::SuspiciousActivity, None);
        let dispatcher = make_dispatcher(CountingDirectory::new(&[None], &[Some("")]), MockSender::new(), true);

        let outcome = dispatcher.dispatch(Some(&alert)).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("No alert recipients found"));
    }

    #[test]
    fn test_dispatch_continues_past_failed_send() {
        let (_, engine) = make_engine();
        let alert = make_alert(&engine, AlertType::LockoutThreshold, Some(42));
        let mut sender = MockSender::new();
        sender.erroring = vec!["admin@clinic.test"];
        let sent = Arc::clone(&sender.sent);
        let dispatcher = make_dispatcher(
            CountingDirectory::new(&[Some("admin@clinic.test")], &[Some("sec@clinic.test")]),
            sender,
            true,
        );

        let outcome = dispatcher.dispatch(Some(&alert)).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.recipients_count, 2);
        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.message, None);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2, "both recipients must be attempted");
        assert_eq!(sent[0].1, "[Security Alert] HIGH: lockout_threshold");
    }

    #[test]
    fn test_dispatch_reports_success_even_when_all_fail() {
        let (_, engine) = make_engine();
        let alert = make_alert(&engine, AlertType::SuspiciousActivity, None);
        let mut sender = MockSender::new();
        sender.erroring = vec!["a@clinic.test"];
        sender.rejecting = vec!["b@clinic.test"];
        let dispatcher = make_dispatcher(
            CountingDirectory::new(&[Some("a@clinic.test")], &[Some("b@clinic.test")]),
            sender,
            true,
        );

        let outcome = dispatcher.dispatch(Some(&alert)).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.recipients_count, 2);
        assert_eq!(outcome.success_count, 0);
    }

    #[test]
    fn test_body_mentions_subject_and_details() {
        let (_, engine) = make_engine();
        let alert = engine
            .create_alert(
                CreateAlertRequest::new(AlertType::LockoutThreshold, Severity::High, "Account locked")
                    .subject(42)
                    .source_ip("192.0.2.10")
                    .details(json!({ "failed_attempts": 5 })),
            )
            .unwrap();
        let body = dispatch::render_body(&alert);
        assert!(body.contains("User ID:    42"));
        assert!(body.contains("192.0.2.10"));
        assert!(body.contains("Account locked"));
        assert!(body.contains("failed_attempts"));
    }

    // ── FailedLoginDetector ───────────────────────────────────────────────────

    #[test]
    fn test_detector_raises_one_alert_per_threshold() {
        let (store, engine) = make_engine();
        store.add_account(42, None, false).unwrap();
        let detector = FailedLoginDetector::new(
            Arc::new(store.clone()),
            Arc::new(engine),
            DetectionConfig::default(),
        );

        let raised: Vec<Option<AlertType>> = (0..6)
            .map(|_| {
                detector
                    .record_failure(42, Some("203.0.113.7"))
                    .unwrap()
                    .alert
                    .map(|a| a.alert_type)
            })
            .collect();

        assert_eq!(
            raised,
            vec![
                None,
                None,
                Some(AlertType::MultipleFailedLogins),
                None,
                Some(AlertType::LockoutThreshold),
                None,
            ]
        );
        assert_eq!(store.failed_login_count(42).unwrap(), 6);
    }

    #[test]
    fn test_detector_lockout_alert_names_user_and_ip() {
        let (store, engine) = make_engine();
        store.add_account(42, None, false).unwrap();
        store.set_failed_logins(42, 4).unwrap();
        let detector = FailedLoginDetector::new(
            Arc::new(store.clone()),
            Arc::new(engine),
            DetectionConfig::default(),
        );

        let outcome = detector.record_failure(42, Some("203.0.113.7")).unwrap();
        let alert = outcome.alert.unwrap();
        assert_eq!(outcome.failed_attempts, 5);
        assert_eq!(alert.alert_type, AlertType::LockoutThreshold);
        assert_eq!(alert.subject_user_id, Some(42));
        assert_eq!(alert.source_ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(alert.details["failed_attempts"], json!(5));
    }

    #[test]
    fn test_detector_malformed_ip_leaves_counter_untouched() {
        let (store, engine) = make_engine();
        store.add_account(42, None, false).unwrap();
        store.set_failed_logins(42, 4).unwrap();
        let detector = FailedLoginDetector::new(
            Arc::new(store.clone()),
            Arc::new(engine),
            DetectionConfig::default(),
        );

        let err = detector.record_failure(42, Some("not-an-ip")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.failed_login_count(42).unwrap(), 4);
        let everything = AlertFilter { status: None, severity: None, page: 1, limit: 10 };
        assert_eq!(store.list(&everything).unwrap().1, 0, "no alert may be raised");

        let outcome = detector.record_failure(42, Some("203.0.113.7")).unwrap();
        assert_eq!(outcome.failed_attempts, 5);
        assert_eq!(
            outcome.alert.map(|a| a.alert_type),
            Some(AlertType::LockoutThreshold),
            "the lockout crossing must still raise its alert"
        );
    }

    #[test]
    fn test_detector_unknown_user_is_not_found() {
        let (store, engine) = make_engine();
        let detector = FailedLoginDetector::new(
            Arc::new(store),
            Arc::new(engine),
            DetectionConfig::default(),
        );
        assert!(detector.record_failure(1, None).unwrap_err().is_not_found());
    }
}
