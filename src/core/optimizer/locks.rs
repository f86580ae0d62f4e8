use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Held while a target is read or mutated. Can move to a worker thread.
pub type TargetGuard = ArcMutexGuard<RawMutex, ()>;

/// One lock per target identity, created on first use.
///
/// The table only grows; its size is bounded by the number of distinct
/// targets in the catalog.
#[derive(Default)]
pub struct TargetLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock for `key` is free and take it
    pub fn acquire(&self, key: &str) -> TargetGuard {
        let lock = {
            let mut table = self.table.lock();
            Arc::clone(table.entry(key.to_string()).or_default())
        };
        lock.lock_arc()
    }

    /// Take the lock for `key` only if nobody holds it
    pub fn try_acquire(&self, key: &str) -> Option<TargetGuard> {
        let lock = {
            let mut table = self.table.lock();
            Arc::clone(table.entry(key.to_string()).or_default())
        };
        lock.try_lock_arc()
    }
}
