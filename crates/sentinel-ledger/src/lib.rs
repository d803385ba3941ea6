//! # sentinel-ledger
//!
//! Tamper-evident, append-only, SHA-256 hash-chained audit ledger.
//!
//! ## Overview
//!
//! Every security-relevant event is appended through [`LedgerWriter`], which
//! links it to its predecessor by hash under the store's exclusive tail
//! lock. [`IntegrityVerifier`] replays the chain from scratch to find
//! altered rows, and [`ImmutabilityAttestor`] asks the storage layer itself
//! whether UPDATE and DELETE are blocked.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sentinel_ledger::{InMemoryLedgerStore, IntegrityVerifier, LedgerWriter};
//! use sentinel_contracts::ledger::LedgerEvent;
//!
//! let store = Arc::new(InMemoryLedgerStore::new());
//! let writer = LedgerWriter::new(store.clone());
//! writer.append(LedgerEvent::new("phi.view", "patient").actor(42))?;
//!
//! let report = IntegrityVerifier::new(store).verify()?;
//! assert!(report.is_valid);
//! ```

pub mod attest;
pub mod chain;
pub mod memory;
pub mod reader;
pub mod verify;
pub mod writer;

pub use attest::ImmutabilityAttestor;
pub use chain::{compute_entry_hash, GENESIS_HASH};
pub use memory::InMemoryLedgerStore;
pub use reader::LedgerReader;
pub use verify::{verify_entries, IntegrityVerifier};
pub use writer::LedgerWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────
