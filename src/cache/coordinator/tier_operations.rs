//! Timed tier access and per-tier usage ledger
//!
//! Every backend call is bounded by the configured tier timeout. The ledger mirrors
//! what each tier holds (stored size plus a metadata snapshot per key) so capacity
//! checks, expiry sweeps and reports never iterate a backend.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::cache::config::TierConfig;
use crate::cache::eviction::EvictionCandidate;
use crate::cache::item::SmartCacheItem;
use crate::cache::metadata::CacheMetadata;
use crate::cache::tier::TierBackend;
use crate::cache::traits::CacheOperationError;

/// What the ledger knows about one stored key
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub stored_size: u64,
    pub metadata: CacheMetadata,
}

/// One configured tier: backend, limits, ledger and admission lock
#[derive(Debug)]
pub struct Tier {
    level: usize,
    config: TierConfig,
    backend: Box<dyn TierBackend>,
    ledger: DashMap<String, LedgerEntry>,
    bytes: AtomicU64,
    /// Bumped by `clear`
    generation: AtomicU64,
    admission: Mutex<()>,
    timeout: Duration,
}

impl Tier {
    pub fn new(
        level: usize,
        config: TierConfig,
        backend: Box<dyn TierBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            level,
            config,
            backend,
            ledger: DashMap::new(),
            bytes: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            admission: Mutex::new(()),
            timeout,
        }
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    #[inline]
    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    #[inline]
    pub fn is_durable(&self) -> bool {
        self.backend.is_durable()
    }

    /// Items currently stored
    #[inline]
    pub fn item_count(&self) -> usize {
        self.ledger.len()
    }

    /// Bytes currently stored
    #[inline]
    pub fn size(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ledger.contains_key(key)
    }

    pub fn ledger_entry(&self, key: &str) -> Option<LedgerEntry> {
        self.ledger.get(key).map(|entry| entry.value().clone())
    }

    /// Snapshot of the ledger
    pub fn ledger_snapshot(&self) -> Vec<(String, LedgerEntry)> {
        self.ledger
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Every stored key except `exclude`, as eviction candidates
    pub fn candidates(&self, exclude: &str) -> Vec<EvictionCandidate> {
        self.ledger
            .iter()
            .filter(|entry| entry.key() != exclude)
            .map(|entry| {
                EvictionCandidate::new(
                    entry.key().clone(),
                    entry.stored_size,
                    entry.metadata.clone(),
                )
            })
            .collect()
    }

    /// Serialize admissions into this tier
    pub async fn admit(&self) -> MutexGuard<'_, ()> {
        self.admission.lock().await
    }

    async fn timed<T, F>(&self, op: &str, fut: F) -> Result<T, CacheOperationError>
    where
        F: Future<Output = Result<T, CacheOperationError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheOperationError::timed_out(format!(
                "tier {} '{}' {} exceeded {:?}",
                self.level, self.config.name, op, self.timeout
            ))),
        }
    }

    /// Lookup; backend failures and timeouts read as a miss
    ///
    /// An item the ledger does not know is tracked, unless a `clear` overlapped the read.
    pub async fn get(&self, key: &str) -> Option<SmartCacheItem> {
        let generation = self.generation.load(Ordering::Acquire);
        match self.timed("get", self.backend.get(key)).await {
            Ok(Some(item)) => {
                if !self.ledger.contains_key(key) && self.generation_is(generation) {
                    self.track(key, &item);
                    if !self.generation_is(generation) {
                        self.forget(key);
                    }
                }
                Some(item)
            }
            Ok(None) => {
                if self.forget(key) {
                    log::debug!("Tier {} dropped stale ledger entry '{}'", self.level, key);
                }
                None
            }
            Err(e) => {
                log::warn!("Tier {} get '{}' failed: {}", self.level, key, e);
                None
            }
        }
    }

    /// Store without any capacity check
    ///
    /// A write that times out may still land in the backend, so its ledger entry is
    /// kept; a later `get` that finds nothing drops it again.
    pub async fn put(&self, key: &str, item: SmartCacheItem) -> Result<(), CacheOperationError> {
        let entry = LedgerEntry {
            stored_size: item.stored_size(),
            metadata: item.metadata().clone(),
        };
        match self.timed("set", self.backend.set(key, item)).await {
            Ok(()) => {
                self.insert_ledger(key, entry);
                Ok(())
            }
            Err(e @ CacheOperationError::TimeoutError(_)) => {
                self.insert_ledger(key, entry);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove; returns whether something was removed
    pub async fn remove(&self, key: &str) -> bool {
        match self.timed("delete", self.backend.delete(key)).await {
            Ok(present) => {
                let tracked = self.forget(key);
                present || tracked
            }
            Err(e) => {
                log::warn!("Tier {} delete '{}' failed: {}", self.level, key, e);
                false
            }
        }
    }

    pub async fn clear(&self) -> Result<(), CacheOperationError> {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.timed("clear", self.backend.clear()).await?;
        self.ledger.clear();
        self.bytes.store(0, Ordering::Release);
        Ok(())
    }

    /// Rebuild the ledger from the backend contents
    pub async fn rehydrate(&self) -> Result<usize, CacheOperationError> {
        let entries = self.timed("entries", self.backend.entries()).await?;
        self.ledger.clear();
        self.bytes.store(0, Ordering::Release);
        for (key, item) in &entries {
            self.track(key, item);
        }
        Ok(entries.len())
    }

    fn generation_is(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn track(&self, key: &str, item: &SmartCacheItem) {
        self.insert_ledger(
            key,
            LedgerEntry {
                stored_size: item.stored_size(),
                metadata: item.metadata().clone(),
            },
        );
    }

    fn insert_ledger(&self, key: &str, entry: LedgerEntry) {
        let added = entry.stored_size;
        let previous = self
            .ledger
            .insert(key.to_string(), entry)
            .map_or(0, |old| old.stored_size);
        if added >= previous {
            self.bytes.fetch_add(added - previous, Ordering::AcqRel);
        } else {
            self.release(previous - added);
        }
    }

    fn forget(&self, key: &str) -> bool {
        match self.ledger.remove(key) {
            Some((_, entry)) => {
                self.release(entry.stored_size);
                true
            }
            None => false,
        }
    }

    fn release(&self, amount: u64) {
        let _ = self
            .bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(amount))
            });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::item::Lz4Compressor;
    use crate::cache::tier::MemoryTier;
    use crate::cache::types::CacheValue;

    /// Writes finish on a detached task after `landing`, or never when `None`
    #[derive(Debug, Default)]
    struct LateWrites {
        inner: Arc<MemoryTier>,
        landing: Option<Duration>,
    }

    #[async_trait]
    impl TierBackend for LateWrites {
        fn kind(&self) -> &'static str {
            "late"
        }

        async fn get(&self, key: &str) -> Result<Option<SmartCacheItem>, CacheOperationError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, item: SmartCacheItem) -> Result<(), CacheOperationError> {
            let Some(delay) = self.landing else {
                return std::future::pending().await;
            };
            let (inner, key) = (self.inner.clone(), key.to_string());
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                inner.set(&key, item).await
            })
            .await
            .map_err(|e| CacheOperationError::tier_unavailable(e.to_string()))?
        }

        async fn delete(&self, key: &str) -> Result<bool, CacheOperationError> {
            self.inner.delete(key).await
        }

        async fn clear(&self) -> Result<(), CacheOperationError> {
            self.inner.clear().await
        }

        async fn entries(&self) -> Result<Vec<(String, SmartCacheItem)>, CacheOperationError> {
            self.inner.entries().await
        }
    }

    fn late_tier(landing: Option<Duration>) -> Tier {
        let backend = LateWrites {
            landing,
            ..LateWrites::default()
        };
        Tier::new(
            0,
            TierConfig::memory(10, 1024),
            Box::new(backend),
            Duration::from_millis(50),
        )
    }

    fn tier() -> Tier {
        Tier::new(
            0,
            TierConfig::memory(10, 1024),
            Box::new(MemoryTier::new()),
            Duration::from_secs(1),
        )
    }

    fn item(key: &str, len: usize) -> SmartCacheItem {
        SmartCacheItem::new(key, CacheValue::Bytes(vec![7; len]), Arc::new(Lz4Compressor), 4096)
    }

    #[tokio::test]
    async fn test_ledger_tracks_puts_and_removes() {
        let tier = tier();
        tier.put("a", item("a", 100)).await.unwrap();
        tier.put("b", item("b", 50)).await.unwrap();
        assert_eq!(tier.item_count(), 2);
        assert_eq!(tier.size(), 150);

        // overwrite replaces the recorded size
        tier.put("a", item("a", 10)).await.unwrap();
        assert_eq!(tier.size(), 60);

        assert!(tier.remove("a").await);
        assert!(!tier.remove("a").await);
        assert_eq!(tier.size(), 50);
        assert_eq!(tier.candidates("b").len(), 0);

        tier.clear().await.unwrap();
        assert_eq!(tier.item_count(), 0);
        assert_eq!(tier.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_write_stays_accounted_until_it_lands() {
        let tier = late_tier(Some(Duration::from_millis(200)));
        let result = tier.put("a", item("a", 100)).await;
        assert!(matches!(result, Err(CacheOperationError::TimeoutError(_))));
        assert!(tier.contains("a"));
        assert_eq!(tier.size(), 100);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(tier.get("a").await.is_some());
        assert_eq!(tier.item_count(), 1);
        assert_eq!(tier.size(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_write_is_forgotten_on_miss() {
        let tier = late_tier(None);
        assert!(tier.put("a", item("a", 100)).await.is_err());
        assert_eq!(tier.size(), 100);

        assert!(tier.get("a").await.is_none());
        assert!(!tier.contains("a"));
        assert_eq!(tier.size(), 0);
    }
}
