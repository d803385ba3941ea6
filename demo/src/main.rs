//! sentinel: command-line access to the Sentinel audit core.
//!
//! Drives `SecurityCore` against a SQLite database so an operator can
//! append and verify ledger entries, attest the storage-layer guards, and
//! work the security-alert queue. `scenarios` runs scripted end-to-end
//! walkthroughs against in-memory stores.
//!
//! Usage:
//!   sentinel --db audit.db append --action phi.view --resource-type patient_record --actor 7
//!   sentinel --db audit.db verify
//!   sentinel --db audit.db alerts list --status new
//!   sentinel --db audit.db alerts resolve 12 --actor 1
//!   sentinel scenarios all
//!
//! `verify` exits with status 2 when tampering is found, `attest` when a
//! guard is missing. Any other failure exits with status 1.

mod outbox;
mod render;
mod scenarios;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use sentinel_contracts::{
    alert::{AlertPatch, AlertQuery, AlertStatus, CreateAlertRequest, Severity},
    error::{SentinelError, SentinelResult},
    ledger::LedgerEvent,
};
use sentinel_core::SentinelConfig;
use sentinel_service::{SecurityCore, Stores};
use sentinel_sqlite::SqliteStore;

use crate::outbox::LogSender;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Sentinel: tamper-evident audit ledger and security alerts.
#[derive(Parser)]
#[command(
    name = "sentinel",
    about = "Tamper-evident audit ledger and security-alert lifecycle",
    long_about = "Appends and verifies hash-chained audit entries, attests that the\n\
                  ledger table refuses UPDATE and DELETE, and manages security alerts."
)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database, overriding `[storage] database_path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append one event to the ledger.
    Append(AppendArgs),
    /// Replay the hash chain and report every tampered entry.
    Verify,
    /// Report whether the database blocks UPDATE and DELETE on the ledger.
    Attest,
    /// Work the security-alert queue.
    #[command(subcommand)]
    Alerts(AlertCommand),
    /// Register a user account.
    #[command(subcommand)]
    Accounts(AccountCommand),
    /// Record a failed login, raising alerts at the configured thresholds.
    LoginFailure {
        user_id: i64,
        #[arg(long)]
        source_ip: Option<String>,
    },
    /// Run scripted walkthroughs against in-memory stores.
    Scenarios {
        #[arg(value_enum, default_value_t = Scenario::All)]
        which: Scenario,
    },
}

#[derive(Args)]
struct AppendArgs {
    /// Namespaced action, e.g. `phi.view`.
    #[arg(long)]
    action: String,
    #[arg(long)]
    resource_type: String,
    #[arg(long)]
    resource_id: Option<String>,
    #[arg(long)]
    actor: Option<i64>,
    /// Record the action as failed with this message.
    #[arg(long)]
    error: Option<String>,
    /// JSON payload stored with the entry.
    #[arg(long)]
    metadata: Option<String>,
}

#[derive(Subcommand)]
enum AlertCommand {
    /// List alerts, newest first.
    List {
        #[arg(long)]
        status: Option<AlertStatus>,
        #[arg(long)]
        severity: Option<Severity>,
        #[arg(long)]
        page: Option<i64>,
        #[arg(long)]
        limit: Option<i64>,
    },
    Show {
        id: i64,
    },
    Create {
        #[arg(long = "type")]
        alert_type: String,
        #[arg(long)]
        severity: String,
        #[arg(long)]
        message: String,
        /// The user the alert concerns.
        #[arg(long)]
        subject: Option<i64>,
        #[arg(long)]
        source_ip: Option<String>,
        /// JSON object with supporting details.
        #[arg(long)]
        details: Option<String>,
    },
    Ack {
        id: i64,
        #[arg(long)]
        actor: i64,
    },
    Update {
        id: i64,
        #[arg(long)]
        actor: i64,
        #[arg(long)]
        message: Option<String>,
        #[arg(long)]
        details: Option<String>,
    },
    /// Resolve an alert. Resolving a lockout alert clears the user's lockout.
    Resolve {
        id: i64,
        #[arg(long)]
        actor: i64,
    },
    /// Send the notification for an alert now, whatever its severity.
    Notify {
        id: i64,
    },
}

#[derive(Subcommand)]
enum AccountCommand {
    Add {
        user_id: i64,
        #[arg(long)]
        email: Option<String>,
        /// Privileged admins receive alert notifications.
        #[arg(long)]
        admin: bool,
    },
    /// Add an address to the security team's notification list.
    Team {
        email: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Scenario {
    All,
    Lockout,
    Tamper,
    Fanout,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=info to see alert and dispatch events.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("sentinel: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run one command. `Ok(false)` means the command completed but found the
/// ledger unhealthy.
fn run(cli: Cli) -> SentinelResult<bool> {
    let open = || open_core(cli.config.as_deref(), cli.db.clone());

    match cli.command {
        Command::Scenarios { which } => run_scenarios(which)?,
        Command::Append(args) => {
            let (core, _) = open()?;
            let mut event = LedgerEvent::new(args.action, args.resource_type);
            if let Some(actor) = args.actor {
                event = event.actor(actor);
            }
            if let Some(resource_id) = args.resource_id {
                event = event.resource_id(resource_id);
            }
            if let Some(message) = args.error {
                event = event.failed(message);
            }
            if let Some(raw) = args.metadata {
                event = event.metadata(parse_json(&raw, "metadata")?);
            }
            render::entry(&core.append_ledger_event(event)?);
        }
        Command::Verify => {
            let report = open()?.0.verify_ledger_integrity()?;
            render::integrity(&report);
            return Ok(report.is_valid);
        }
        Command::Attest => {
            let report = open()?.0.verify_immutability_status();
            render::immutability(&report);
            return Ok(report.is_fully_protected);
        }
        Command::Alerts(command) => run_alert_command(&open()?.0, command)?,
        Command::Accounts(AccountCommand::Add { user_id, email, admin }) => {
            open()?.1.upsert_account(user_id, email.as_deref(), admin)?;
            println!("account {user_id} saved{}", if admin { " (admin)" } else { "" });
        }
        Command::Accounts(AccountCommand::Team { email }) => {
            open()?.1.add_security_team_member(Some(&email))?;
            println!("{email} added to the security team");
        }
        Command::LoginFailure { user_id, source_ip } => {
            let report = open()?.0.record_login_failure(user_id, source_ip.as_deref())?;
            println!("user {}: {} failed login attempt(s)", report.user_id, report.failed_attempts);
            if let Some(raised) = report.raised {
                render::alert(&raised.alert);
                render::notification(raised.notification.as_ref());
            }
        }
    }
    Ok(true)
}

/// Load configuration, apply `--db`, and open the core over SQLite.
fn open_core(
    config_path: Option<&Path>,
    db: Option<PathBuf>,
) -> SentinelResult<(SecurityCore, Arc<SqliteStore>)> {
    let mut config = match config_path {
        Some(path) => SentinelConfig::from_file(path)?,
        None => SentinelConfig::default(),
    };
    if let Some(db) = db {
        config.storage.database_path = db;
    }

    let (stores, sqlite) = Stores::open_sqlite(&config.storage)?;
    let core = SecurityCore::new(stores, Arc::new(LogSender), &config)?;
    Ok((core, sqlite))
}

fn run_alert_command(core: &SecurityCore, command: AlertCommand) -> SentinelResult<()> {
    match command {
        AlertCommand::List { status, severity, page, limit } => {
            let page = core.list_alerts(AlertQuery { status, severity, page, limit })?;
            render::alert_page(&page);
        }
        AlertCommand::Show { id } => render::alert(&core.get_alert(id)?),
        AlertCommand::Create {
            alert_type,
            severity,
            message,
            subject,
            source_ip,
            details,
        } => {
            let request = CreateAlertRequest {
                alert_type: Some(alert_type),
                severity: Some(severity),
                message: Some(message),
                subject_user_id: subject,
                source_ip,
                details: details.map(|raw| parse_json(&raw, "details")).transpose()?,
            };
            let created = core.create_alert(request)?;
            render::alert(&created.alert);
            render::notification(created.notification.as_ref());
        }
        AlertCommand::Ack { id, actor } => render::alert(&core.acknowledge_alert(id, actor)?),
        AlertCommand::Update { id, actor, message, details } => {
            let patch = AlertPatch {
                message,
                details: details.map(|raw| parse_json(&raw, "details")).transpose()?,
            };
            render::alert(&core.update_alert(id, actor, patch)?);
        }
        AlertCommand::Resolve { id, actor } => render::alert(&core.resolve_alert(id, actor)?),
        AlertCommand::Notify { id } => {
            let alert = core.get_alert(id)?;
            let outcome = core.dispatch_alert_notification(Some(&alert))?;
            render::notification(Some(&outcome));
        }
    }
    Ok(())
}

fn run_scenarios(which: Scenario) -> SentinelResult<()> {
    render::banner();
    match which {
        Scenario::All => {
            scenarios::lockout::run_scenario()?;
            scenarios::tamper::run_scenario()?;
            scenarios::fanout::run_scenario()?;
        }
        Scenario::Lockout => scenarios::lockout::run_scenario()?,
        Scenario::Tamper => scenarios::tamper::run_scenario()?,
        Scenario::Fanout => scenarios::fanout::run_scenario()?,
    }
    println!("All selected scenarios completed successfully.");
    Ok(())
}

fn parse_json(raw: &str, what: &str) -> SentinelResult<Value> {
    serde_json::from_str(raw)
        .map_err(|e| SentinelError::validation(format!("{what} is not valid JSON: {e}")))
}
