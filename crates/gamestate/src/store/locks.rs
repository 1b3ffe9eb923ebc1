//! Per-entity mutual exclusion for read-modify-write cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::entity::{EntityId, RecordKind};
use crate::error::{Result, StoreError};

type LockKey = (EntityId, RecordKind);

/// Lock table keyed by entity and record kind.
///
/// Two updates to the same entity's currency file run one after the other;
/// the currency and land files of one entity lock independently. Entries are
/// dropped as soon as nobody holds or waits on them.
#[derive(Debug, Default)]
pub struct EntityLocks {
    table: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `(id, kind)`.
    pub fn with_lock<T>(
        &self,
        id: &EntityId,
        kind: RecordKind,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let key = (id.clone(), kind);
        let slot = self.acquire(&key)?;

        let result = {
            // The guarded value is `()`; a panic in a previous holder leaves
            // nothing inconsistent behind, so poisoning is ignored.
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        drop(slot);
        self.release(&key);
        result
    }

    /// Number of entities that currently hold or wait on a lock.
    pub fn active(&self) -> usize {
        self.table
            .lock()
            .map(|table| table.len())
            .unwrap_or_default()
    }

    fn acquire(&self, key: &LockKey) -> Result<Arc<Mutex<()>>> {
        let mut table = self.table.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(Arc::clone(table.entry(key.clone()).or_default()))
    }

    fn release(&self, key: &LockKey) {
        let Ok(mut table) = self.table.lock() else {
            return;
        };
        if table
            .get(key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            table.remove(key);
        }
    }
}
