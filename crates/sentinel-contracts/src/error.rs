//! Error taxonomy for the Sentinel ledger and alert engine.
//!
//! Tampering is deliberately absent: a broken hash chain is a fact reported
//! through `IntegrityReport`, not a control-flow failure.

use thiserror::Error;

/// The unified error type for every Sentinel crate.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Malformed or missing input. The caller's fault; never retried.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// The entity is absent, or is in the wrong lifecycle state for the
    /// requested transition.
    #[error("{entity} {id} not found: {reason}")]
    NotFound {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// The underlying store was unavailable or a query failed.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl SentinelError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    pub fn alert_not_found(id: i64, reason: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "security alert",
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the `NotFound` variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for the `Validation` variant.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Convenience alias used throughout the Sentinel crates.
pub type SentinelResult<T> = Result<T, SentinelError>;
