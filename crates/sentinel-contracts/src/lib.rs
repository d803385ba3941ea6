//! # sentinel-contracts
//!
//! Shared types, reports, and errors for the Sentinel audit ledger and
//! security-alert engine.
//!
//! Every crate in the workspace imports from here. No business logic lives in
//! this crate, only data definitions, parsing, and error types.

pub mod alert;
pub mod error;
pub mod ledger;
pub mod report;
