//! In-memory implementation of `LedgerStore`.
//!
//! `InMemoryLedgerStore` is the reference implementation used by tests and
//! by embedders that do not need durability. Entries live in a `Vec` behind
//! a `Mutex`; holding the lock for the whole of `append` is what linearizes
//! concurrent writers.
//!
//! The store models storage-layer write guards: while a guard is installed,
//! `try_update` / `try_delete` are refused. `drop_guard` removes one, which
//! is how tests simulate a misconfigured or compromised database.

use std::sync::{Arc, Mutex, MutexGuard};

use sentinel_contracts::{
    error::{SentinelError, SentinelResult},
    ledger::LedgerEntry,
    report::{ProtectionKind, ProtectionMechanism},
};
use sentinel_core::traits::LedgerStore;

pub(crate) struct InMemoryState {
    pub(crate) entries: Vec<LedgerEntry>,
    pub(crate) block_delete: bool,
    pub(crate) block_update: bool,
}

#[derive(Clone)]
pub struct InMemoryLedgerStore {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerStore {
    /// An empty ledger with both write guards installed.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState {
                entries: Vec::new(),
                block_delete: true,
                block_update: true,
            })),
        }
    }

    fn lock(&self) -> SentinelResult<MutexGuard<'_, InMemoryState>> {
        self.state
            .lock()
            .map_err(|e| SentinelError::storage(format!("ledger state lock poisoned: {}", e)))
    }

    /// Remove a write guard.
    pub fn drop_guard(&self, kind: ProtectionKind) -> SentinelResult<()> {
        let mut state = self.lock()?;
        match kind {
            ProtectionKind::BlocksDelete => state.block_delete = false,
            ProtectionKind::BlocksUpdate => state.block_update = false,
        }
        Ok(())
    }

    /// Attempt an in-place mutation of an existing entry.
    ///
    /// Refused while the update guard is installed.
    pub fn try_update(&self, id: u64, mutate: impl FnOnce(&mut LedgerEntry)) -> SentinelResult<()> {
        let mut state = self.lock()?;
        if state.block_update {
            return Err(SentinelError::storage(format!(
                "ledger entry {id} is append-only: UPDATE refused"
            )));
        }
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| SentinelError::storage(format!("ledger entry {id} does not exist")))?;
        mutate(entry);
        Ok(())
    }

    /// Attempt to delete an existing entry. Refused while the delete guard
    /// is installed.
    pub fn try_delete(&self, id: u64) -> SentinelResult<()> {
        let mut state = self.lock()?;
        if state.block_delete {
            return Err(SentinelError::storage(format!(
                "ledger entry {id} is append-only: DELETE refused"
            )));
        }
        state.entries.retain(|e| e.id != id);
        Ok(())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(
        &self,
        seal: &mut dyn FnMut(u64, Option<&str>) -> LedgerEntry,
    ) -> SentinelResult<LedgerEntry> {
        let mut state = self.lock()?;

        let (next_id, tail_hash) = match state.entries.last() {
            Some(tail) => (tail.id + 1, Some(tail.entry_hash.clone())),
            None => (1, None),
        };

        let entry = seal(next_id, tail_hash.as_deref());
        if entry.id != next_id {
            return Err(SentinelError::storage(format!(
                "sealed entry has id {}, expected {}",
                entry.id, next_id
            )));
        }

        state.entries.push(entry.clone());
        Ok(entry)
    }

    fn entries(&self) -> SentinelResult<Vec<LedgerEntry>> {
        Ok(self.lock()?.entries.clone())
    }

    fn entry(&self, id: u64) -> SentinelResult<Option<LedgerEntry>> {
        Ok(self.lock()?.entries.iter().find(|e| e.id == id).cloned())
    }

    fn tail(&self) -> SentinelResult<Option<LedgerEntry>> {
        Ok(self.lock()?.entries.last().cloned())
    }

    fn range(&self, from_id: u64, limit: usize) -> SentinelResult<Vec<LedgerEntry>> {
        Ok(self
            .lock()?
            .entries
            .iter()
            .filter(|e| e.id >= from_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn write_protections(&self) -> SentinelResult<Vec<ProtectionMechanism>> {
        let state = self.lock()?;
        let mut mechanisms = Vec::new();
        if state.block_delete {
            mechanisms.push(ProtectionMechanism {
                name: "memory_ledger_no_delete".to_string(),
                kind: ProtectionKind::BlocksDelete,
                definition: "in-memory guard refusing DELETE".to_string(),
            });
        }
        if state.block_update {
            mechanisms.push(ProtectionMechanism {
                name: "memory_ledger_no_update".to_string(),
                kind: ProtectionKind::BlocksUpdate,
                definition: "in-memory guard refusing UPDATE".to_string(),
            });
        }
        Ok(mechanisms)
    }
}
