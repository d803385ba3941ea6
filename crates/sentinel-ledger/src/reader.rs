//! Read-only access to the ledger for downstream consumers such as report
//! export and retention. There is deliberately no mutation path here.

use std::sync::Arc;

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    ledger::LedgerEntry,
};
use sentinel_core::traits::LedgerStore;

/// Largest page `range` will return in one call.
pub const MAX_RANGE: usize = 1_000;

pub struct LedgerReader {
    store: Arc<dyn LedgerStore>,
}

impl LedgerReader {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// The entry with `id`, or `NotFound`.
    pub fn entry(&self, id: u64) -> SentinelResult<LedgerEntry> {
        self.store.entry(id)?.ok_or_else(|| SentinelError::NotFound {
            entity: "ledger entry",
            id: id.to_string(),
            reason: "no entry with that id".to_string(),
        })
    }

    /// Up to `limit` entries starting at `from_id`. `limit` is capped at
    /// `MAX_RANGE`; zero is rejected.
    pub fn range(&self, from_id: u64, limit: usize) -> SentinelResult<Vec<LedgerEntry>> {
        if limit == 0 {
            return Err(SentinelError::validation("range limit must be greater than zero"));
        }
        self.store.range(from_id, limit.min(MAX_RANGE))
    }

    pub fn tail(&self) -> SentinelResult<Option<LedgerEntry>> {
        self.store.tail()
    }
}
