//! # sentinel-core
//!
//! The seams of the Sentinel audit ledger and alert engine.
//!
//! This crate provides:
//! - The storage and delivery traits (`LedgerStore`, `AlertStore`,
//!   `AccountDirectory`, `LoginCounterStore`, `NotificationSender`)
//! - `SentinelConfig`, the TOML-driven runtime configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_core::{config::SentinelConfig, traits::LedgerStore};
//!
//! let config = SentinelConfig::from_file(Path::new("sentinel.toml"))?;
//! ```

pub mod config;
pub mod traits;

pub use config::SentinelConfig;
