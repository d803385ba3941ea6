//! # sentinel-service
//!
//! [`SecurityCore`] is the single entry point the clinical platform uses
//! for the audit ledger and the security-alert lifecycle. HTTP handlers,
//! schedulers and the `sentinel` CLI all call it; mapping its results onto
//! a transport is their job.
//!
//! Build one over SQLite with [`Stores::open_sqlite`], or over the
//! in-memory stores with [`Stores::in_memory`].

pub mod facade;
pub mod stores;

pub use facade::{CreatedAlert, LoginFailureReport, SecurityCore};
pub use stores::Stores;

// ── Tests ─────────────────────────────────────────────────────────────────────
