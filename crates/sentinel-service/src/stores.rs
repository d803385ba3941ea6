//! The set of store handles a `SecurityCore` is built from.

use std::sync::Arc;
use std::time::Duration;

use sentinel_alerts::InMemorySecurityStore;
use sentinel_contracts::error::SentinelResult;
use sentinel_core::{
    config::StorageConfig,
    traits::{AccountDirectory, AlertStore, LedgerStore, LoginCounterStore},
};
use sentinel_ledger::InMemoryLedgerStore;
use sentinel_sqlite::SqliteStore;

/// One handle per trait seam. The handles may all point at the same
/// backend object, as `sqlite` and `in_memory` arrange.
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub alerts: Arc<dyn AlertStore>,
    pub directory: Arc<dyn AccountDirectory>,
    pub counters: Arc<dyn LoginCounterStore>,
}

impl Stores {
    /// Every seam backed by one SQLite database.
    pub fn sqlite(store: Arc<SqliteStore>) -> Self {
        Self {
            ledger: store.clone(),
            alerts: store.clone(),
            directory: store.clone(),
            counters: store,
        }
    }

    /// Open the database named by `[storage]`.
    pub fn open_sqlite(config: &StorageConfig) -> SentinelResult<(Self, Arc<SqliteStore>)> {
        let store = Arc::new(SqliteStore::open(
            &config.database_path,
            Duration::from_millis(config.busy_timeout_ms),
        )?);
        Ok((Self::sqlite(store.clone()), store))
    }

    /// Non-durable stores; the returned handles allow seeding accounts and
    /// simulating storage-layer tampering.
    pub fn in_memory() -> (Self, InMemoryLedgerStore, InMemorySecurityStore) {
        let ledger = InMemoryLedgerStore::new();
        let security = InMemorySecurityStore::new();
        let stores = Self {
            ledger: Arc::new(ledger.clone()),
            alerts: Arc::new(security.clone()),
            directory: Arc::new(security.clone()),
            counters: Arc::new(security.clone()),
        };
        (stores, ledger, security)
    }
}
