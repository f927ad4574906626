//! Per-key async lock registry
//!
//! Operations on the same key are serialized; operations on different keys proceed in
//! parallel. Eviction only ever try-locks, so it never waits behind another key's
//! operation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.get(key) {
            return existing.value().clone();
        }
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        self.handle(key).lock_owned().await
    }

    /// Exclusive access to `key` if nobody holds it
    pub fn try_lock(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        self.handle(key).try_lock_owned().ok()
    }

    /// Drop registry entries nobody holds or waits on
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.locks.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
