//! Human-readable output for the CLI.

use sentinel_contracts::{
    alert::{AlertPage, SecurityAlert},
    ledger::LedgerEntry,
    report::{DispatchOutcome, ImmutabilityReport, IntegrityReport},
};

pub fn banner() {
    println!();
    println!("Sentinel: Audit Ledger and Security Alerts");
    println!("==========================================");
    println!();
    println!("Every scenario runs against fresh in-memory stores:");
    println!("  [1] Ledger writer seals each event onto a SHA-256 hash chain");
    println!("  [2] Integrity verifier replays the chain and names tampered entries");
    println!("  [3] Attestor reads the write guards back from the store itself");
    println!("  [4] Alerts move new -> acknowledged -> resolved, audited into the ledger");
    println!("  [5] Notifications are best-effort and never block an alert");
    println!();
}

pub fn entry(entry: &LedgerEntry) {
    println!("entry {} appended", entry.id);
    println!("  action:        {}", entry.action);
    println!("  status:        {}", entry.status);
    println!("  timestamp:     {}", entry.timestamp.to_rfc3339());
    println!("  previous_hash: {}", entry.previous_hash.as_deref().unwrap_or("(genesis)"));
    println!("  entry_hash:    {}", entry.entry_hash);
}

pub fn integrity(report: &IntegrityReport) {
    println!("{}", report.message);
    println!(
        "  verified {} of {} entries",
        report.verified_logs, report.total_logs
    );
    if let Some(head) = &report.head_hash {
        println!("  head hash: {head}");
    }
    for record in &report.tampered_logs {
        println!(
            "  TAMPERED entry {} ({} at {}): {}",
            record.log_id,
            record.action,
            record.timestamp.to_rfc3339(),
            record.issue
        );
    }
}

pub fn immutability(report: &ImmutabilityReport) {
    println!("{}", report.message);
    println!("  DELETE protection: {}", report.delete_protection);
    println!("  UPDATE protection: {}", report.update_protection);
    for mechanism in &report.mechanisms {
        println!("  - {} ({:?})", mechanism.name, mechanism.kind);
    }
}

pub fn alert(alert: &SecurityAlert) {
    println!(
        "alert {} [{}] {} / {}",
        alert.id,
        alert.status,
        alert.severity.as_str().to_uppercase(),
        alert.alert_type
    );
    println!("  message:    {}", alert.message);
    if let Some(user_id) = alert.subject_user_id {
        println!("  subject:    user {user_id}");
    }
    if let Some(ip) = &alert.source_ip {
        println!("  source ip:  {ip}");
    }
    println!("  created:    {}", alert.created_at.to_rfc3339());
    if let (Some(by), Some(at)) = (alert.acknowledged_by, alert.acknowledged_at) {
        println!("  acked:      by user {by} at {}", at.to_rfc3339());
    }
    if let (Some(by), Some(at)) = (alert.resolved_by, alert.resolved_at) {
        println!("  resolved:   by user {by} at {}", at.to_rfc3339());
    }
    if alert.details.as_object().is_some_and(|d| !d.is_empty()) {
        println!("  details:    {}", alert.details);
    }
}

pub fn alert_page(page: &AlertPage) {
    println!(
        "page {} of {} ({} alert(s) total, {} per page)",
        page.page,
        page.total_pages.max(1),
        page.total,
        page.limit
    );
    for alert in &page.alerts {
        println!(
            "  #{:<5} {:<12} {:<8} {:<24} {}",
            alert.id,
            alert.status.as_str(),
            alert.severity.as_str(),
            alert.alert_type.as_str(),
            alert.message
        );
    }
}

pub fn notification(outcome: Option<&DispatchOutcome>) {
    match outcome {
        None => println!("  notification: not sent (below severity threshold)"),
        Some(o) if o.success => println!(
            "  notification: delivered to {} of {} recipient(s)",
            o.success_count, o.recipients_count
        ),
        Some(o) => println!(
            "  notification: skipped ({})",
            o.message.as_deref().unwrap_or("no reason given")
        ),
    }
}
