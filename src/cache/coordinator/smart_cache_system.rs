//! Multi-tier cache orchestrator
//!
//! Owns the ordered tiers (index 0 is fastest), the predictive engine, the adaptive
//! eviction strategy and the statistics. Reads scan tiers from the requested level and
//! promote hits into the fastest tier; writes enforce capacity under the target tier's
//! admission lock. Operations on one key are serialized through the key lock registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::cache::analyzer::PredictiveCacheEngine;
use crate::cache::config::CacheConfig;
use crate::cache::eviction::EvictionSelector;
use crate::cache::item::{Compressor, SmartCacheItem, compressor_for};
use crate::cache::manager::strategy::{AdaptiveCacheStrategy, EvictionStrategy};
use crate::cache::tier::{TierBackend, build_backend};
use crate::cache::traits::{CacheOperationError, EvictionReason};
use crate::cache::types::{CacheValue, SetOptions, WarmupItem, duration_millis, now_millis};
use crate::cache::worker::{Ticker, spawn_maintenance};
use crate::telemetry::{
    CacheStats, HitRateSample, KeyUsage, PerformanceHistory, PerformanceReport, TierDistribution,
    UnifiedCacheStatistics,
};

use super::capacity::{CapacityPolicy, ensure_capacity};
use super::key_locks::KeyLocks;
use super::loader::Loader;
use super::tier_operations::Tier;

/// Keys listed in a performance report
const TOP_KEYS: usize = 10;
/// History samples listed in a performance report
const REPORT_HISTORY: usize = 10;

/// Resets the sweep flag when a sweep ends, however it ends
struct SweepFlag<'a>(&'a AtomicBool);

impl Drop for SweepFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The multi-tier cache
pub struct SmartCacheSystem {
    config: CacheConfig,
    tiers: Vec<Tier>,
    compressor: Arc<dyn Compressor>,
    locks: KeyLocks,
    predictor: PredictiveCacheEngine,
    strategy: AdaptiveCacheStrategy,
    stats: UnifiedCacheStatistics,
    history: Mutex<PerformanceHistory>,
    capacity: CapacityPolicy,
    loader: Option<Arc<dyn Loader>>,
    sweeping: AtomicBool,
    /// Bumped by every `clear`; write-backs from reads that straddle one are dropped
    clear_epoch: AtomicU64,
    shut_down: AtomicBool,
    tickers: Mutex<Vec<Ticker>>,
}

impl std::fmt::Debug for SmartCacheSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartCacheSystem")
            .field("cache_id", &self.config.cache_id)
            .field("tiers", &self.tiers)
            .field("strategy", &self.strategy.current_strategy())
            .field("loader", &self.loader.is_some())
            .field("background_tasks", &self.background_tasks_running())
            .field("shut_down", &self.shut_down.load(Ordering::Relaxed))
            .finish()
    }
}

impl SmartCacheSystem {
    /// Build the configured backends, restore durable ledgers and start background maintenance
    pub async fn new(
        config: CacheConfig,
        loader: Option<Arc<dyn Loader>>,
    ) -> Result<Arc<Self>, CacheOperationError> {
        config.validate()?;

        let compressor = compressor_for(config.compression.codec);
        let backends = (0..config.tiers.len())
            .map(|level| build_backend(&config, level, compressor.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::assemble(config, compressor, backends, loader).await
    }

    /// Like [`new`](Self::new), with one caller-supplied backend per configured tier
    ///
    /// `backends[i]` serves `config.tiers[i]`; the tier's `backend` kind is then only a
    /// label.
    pub async fn with_backends(
        config: CacheConfig,
        backends: Vec<Box<dyn TierBackend>>,
        loader: Option<Arc<dyn Loader>>,
    ) -> Result<Arc<Self>, CacheOperationError> {
        config.validate()?;
        if backends.len() != config.tiers.len() {
            return Err(CacheOperationError::configuration_error(format!(
                "{} backend(s) supplied for {} tier(s)",
                backends.len(),
                config.tiers.len()
            )));
        }

        let compressor = compressor_for(config.compression.codec);
        Self::assemble(config, compressor, backends, loader).await
    }

    async fn assemble(
        config: CacheConfig,
        compressor: Arc<dyn Compressor>,
        backends: Vec<Box<dyn TierBackend>>,
        loader: Option<Arc<dyn Loader>>,
    ) -> Result<Arc<Self>, CacheOperationError> {
        let timeout = Duration::from_millis(config.maintenance.tier_timeout_ms);
        let mut tiers = Vec::with_capacity(config.tiers.len());
        for (level, (tier_config, backend)) in config.tiers.iter().zip(backends).enumerate() {
            let tier = Tier::new(level, tier_config.clone(), backend, timeout);
            if tier.is_durable() {
                match tier.rehydrate().await {
                    Ok(restored) => log::info!(
                        "Tier {} '{}' restored {} item(s)",
                        level,
                        tier_config.name,
                        restored
                    ),
                    Err(e) => log::warn!("Tier {} '{}' not restored: {}", level, tier_config.name, e),
                }
            }
            tiers.push(tier);
        }

        let system = Arc::new(Self {
            predictor: PredictiveCacheEngine::new(config.predictor),
            strategy: AdaptiveCacheStrategy::new(&config.strategy),
            capacity: CapacityPolicy::from_config(&config.maintenance),
            stats: UnifiedCacheStatistics::new(),
            history: Mutex::new(PerformanceHistory::new()),
            locks: KeyLocks::new(),
            sweeping: AtomicBool::new(false),
            clear_epoch: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
            tickers: Mutex::new(Vec::new()),
            tiers,
            compressor,
            loader,
            config,
        });

        if system.config.maintenance.background_tasks {
            let tickers = spawn_maintenance(&system)?;
            *system.tickers.lock().unwrap_or_else(PoisonError::into_inner) = tickers;
        }

        log::info!(
            "Cache '{}' ready with {} tier(s), strategy {}",
            system.config.cache_id,
            system.tiers.len(),
            system.strategy.current_strategy()
        );
        Ok(system)
    }

    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    #[inline]
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    pub fn tier(&self, level: usize) -> Option<&Tier> {
        self.tiers.get(level)
    }

    #[inline]
    pub fn predictor(&self) -> &PredictiveCacheEngine {
        &self.predictor
    }

    #[inline]
    pub fn strategy(&self) -> &AdaptiveCacheStrategy {
        &self.strategy
    }

    #[inline]
    pub fn statistics(&self) -> &UnifiedCacheStatistics {
        &self.stats
    }

    #[inline]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Background tickers still looping
    pub fn background_tasks_running(&self) -> usize {
        self.tickers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|ticker| ticker.is_running())
            .count()
    }

    fn check_level(&self, level: usize) -> Result<(), CacheOperationError> {
        if level < self.tiers.len() {
            Ok(())
        } else {
            Err(CacheOperationError::UnknownTier(level))
        }
    }

    /// Requested level first, then every other tier fastest to slowest
    fn scan_order(&self, first: usize) -> impl Iterator<Item = usize> {
        std::iter::once(first).chain((0..self.tiers.len()).filter(move |&level| level != first))
    }

    /// Tier that receives prefetched values
    fn mid_tier(&self) -> usize {
        1.min(self.tiers.len().saturating_sub(1))
    }

    fn selector(&self, now: u64) -> EvictionSelector {
        EvictionSelector::new(
            self.strategy.current_strategy(),
            now,
            self.config.metadata.weights,
        )
    }

    /// Look up `key`, starting at `level` (fastest when `None`)
    pub async fn get(
        &self,
        key: &str,
        level: Option<usize>,
    ) -> Result<Option<CacheValue>, CacheOperationError> {
        let start = Instant::now();
        let first = level.unwrap_or(0);
        self.check_level(first)?;

        let _guard = self.locks.lock(key).await;
        let now = now_millis();
        let epoch = self.clear_epoch.load(Ordering::Acquire);

        for level in self.scan_order(first) {
            let tier = &self.tiers[level];
            let Some(mut item) = tier.get(key).await else {
                continue;
            };

            if item.metadata().is_expired_at(now) {
                if tier.remove(key).await {
                    log_removal(key, level, EvictionReason::Expired);
                }
                continue;
            }

            let value = match item.get_value_at(now, &self.config.metadata.thresholds) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Dropping undecodable '{}' from tier {}: {}", key, level, e);
                    tier.remove(key).await;
                    continue;
                }
            };

            self.predictor.validate_prediction(key, now);
            self.predictor.record_access(key, now);

            if level == 0 {
                self.write_back(key, item, epoch).await;
            } else {
                self.promote(key, item, now, epoch).await;
            }

            self.stats.record_hit(start.elapsed());
            return Ok(Some(value));
        }

        self.stats.record_miss(start.elapsed());
        Ok(None)
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.clear_epoch.load(Ordering::Acquire) != epoch
    }

    /// Persist updated access metadata of a tier-0 hit
    async fn write_back(&self, key: &str, item: SmartCacheItem, epoch: u64) {
        let tier = &self.tiers[0];
        let _admission = tier.admit().await;
        if self.is_stale(epoch) {
            log::trace!("'{}' cleared during read, write-back dropped", key);
            return;
        }
        if let Err(e) = tier.put(key, item).await {
            log::warn!("Metadata write-back for '{}' failed: {}", key, e);
        }
    }

    /// Copy a slower-tier hit into the fastest tier
    async fn promote(&self, key: &str, item: SmartCacheItem, now: u64, epoch: u64) {
        match self.admit(0, key, item, now, Some(epoch)).await {
            Ok(true) => {
                self.stats.record_promotion();
                log::trace!("Promoted '{}' to tier 0", key);
            }
            Ok(false) => log::trace!("'{}' cleared during read, promotion dropped", key),
            Err(e) => log::debug!("Promotion of '{}' skipped: {}", key, e),
        }
    }

    /// Capacity check plus write, under the tier's admission lock
    ///
    /// With `epoch` set, nothing is written when a `clear` ran since that epoch was
    /// read; returns whether the item was written.
    async fn admit(
        &self,
        level: usize,
        key: &str,
        item: SmartCacheItem,
        now: u64,
        epoch: Option<u64>,
    ) -> Result<bool, CacheOperationError> {
        let tier = &self.tiers[level];
        let _admission = tier.admit().await;
        if epoch.is_some_and(|epoch| self.is_stale(epoch)) {
            return Ok(false);
        }
        let outcome = ensure_capacity(
            tier,
            key,
            item.stored_size(),
            &self.selector(now),
            &self.capacity,
            &self.locks,
        )
        .await?;
        if let Some(reason) = outcome.reason {
            for evicted in &outcome.evicted {
                log_removal(evicted, level, reason);
            }
            self.stats.record_evictions(outcome.count() as u64);
        }
        tier.put(key, item).await?;
        Ok(true)
    }

    /// Store `value`; returns `false` when it cannot be placed
    pub async fn set(
        &self,
        key: &str,
        value: CacheValue,
        options: SetOptions,
    ) -> Result<bool, CacheOperationError> {
        let start = Instant::now();
        let level = options.level.unwrap_or(0);
        self.check_level(level)?;

        let _guard = self.locks.lock(key).await;
        let now = now_millis();
        let threshold = options
            .compression_threshold
            .unwrap_or(self.config.compression.threshold_bytes);

        let mut item = SmartCacheItem::new_at(key, value, self.compressor.clone(), threshold, now);
        let metadata = item.metadata_mut();
        metadata.priority = options.priority.max(1);
        if let Some(ttl) = options.ttl {
            metadata.set_ttl_ms(duration_millis(ttl));
        }
        metadata.tags.extend(options.tags);
        metadata.dependencies.extend(options.dependencies);
        let compressed = item.is_compressed();

        let stored = match self.admit(level, key, item, now, None).await {
            Ok(written) => written,
            Err(CacheOperationError::CapacityExceeded {
                required,
                available,
            }) => {
                log::warn!(
                    "'{}' does not fit tier {} ({} bytes needed, {} available)",
                    key,
                    level,
                    required,
                    available
                );
                false
            }
            Err(e) => {
                log::warn!("Write of '{}' to tier {} failed: {}", key, level, e);
                false
            }
        };

        if stored {
            if compressed {
                self.stats.record_compression();
            }
            // older copies elsewhere would shadow the new value
            for tier in self.tiers.iter().filter(|t| t.level() != level) {
                if tier.contains(key) {
                    tier.remove(key).await;
                }
            }
        }

        self.stats.record_operation(start.elapsed());
        Ok(stored)
    }

    /// Remove `key` from one tier or all of them; returns whether any held it
    pub async fn delete(&self, key: &str, level: Option<usize>) -> Result<bool, CacheOperationError> {
        let start = Instant::now();
        if let Some(level) = level {
            self.check_level(level)?;
        }

        let _guard = self.locks.lock(key).await;
        let mut removed = false;
        for tier in &self.tiers {
            if level.is_none_or(|l| l == tier.level()) && tier.remove(key).await {
                log_removal(key, tier.level(), EvictionReason::Manual);
                removed = true;
            }
        }

        self.stats.record_operation(start.elapsed());
        Ok(removed)
    }

    /// Drop every item of one tier, or of all tiers plus counters and learned state
    ///
    /// Reads in flight when the clear starts do not write their item back afterwards.
    pub async fn clear(&self, level: Option<usize>) -> Result<(), CacheOperationError> {
        if let Some(level) = level {
            self.check_level(level)?;
        }

        self.clear_epoch.fetch_add(1, Ordering::AcqRel);
        for tier in &self.tiers {
            if level.is_none_or(|l| l == tier.level()) {
                let _admission = tier.admit().await;
                if let Err(e) = tier.clear().await {
                    log::warn!("Clearing tier {} failed: {}", tier.level(), e);
                }
            }
        }

        if level.is_none() {
            self.stats.reset();
            self.predictor.clear();
            self.history
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
        log::info!("Cleared {}", match level {
            Some(level) => format!("tier {}", level),
            None => "all tiers".to_string(),
        });
        Ok(())
    }

    /// Concurrent `set`s; returns how many were stored
    pub async fn warmup(&self, items: Vec<WarmupItem>) -> usize {
        let total = items.len();
        let results = join_all(items.into_iter().map(|item| async move {
            let key = item.key;
            match self.set(&key, item.value, item.options).await {
                Ok(true) => true,
                Ok(false) => false,
                Err(e) => {
                    log::warn!("Warmup of '{}' failed: {}", key, e);
                    false
                }
            }
        }))
        .await;

        let stored = results.into_iter().filter(|stored| *stored).count();
        log::info!("Warmup stored {}/{} item(s)", stored, total);
        stored
    }

    /// Load forecast keys that are not cached yet into the mid-speed tier
    ///
    /// Only keys with a current high-confidence forecast are loaded. Loader failures
    /// are logged per key. Returns how many values were stored.
    pub async fn prefetch<L>(&self, keys: impl IntoIterator<Item = impl AsRef<str>>, loader: &L) -> usize
    where
        L: Loader + ?Sized,
    {
        let predicted: HashMap<String, f64> = self
            .predictor
            .get_predictions(now_millis())
            .into_iter()
            .map(|p| (p.key, p.confidence))
            .collect();

        let targets: Vec<String> = keys
            .into_iter()
            .map(|key| key.as_ref().to_string())
            .filter(|key| predicted.contains_key(key))
            .filter(|key| !self.tiers.iter().any(|tier| tier.contains(key)))
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let level = self.mid_tier();
        let results = join_all(targets.iter().map(|key| async move {
            let value = match loader.load(key).await {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Prefetch of '{}' failed: {}", key, e);
                    return false;
                }
            };
            match self.set(key, value, SetOptions::new().level(level)).await {
                Ok(stored) => stored,
                Err(e) => {
                    log::warn!("Prefetched '{}' not stored: {}", key, e);
                    false
                }
            }
        }))
        .await;

        let stored = results.into_iter().filter(|stored| *stored).count();
        if stored > 0 {
            self.stats.record_predictions(stored as u64);
            log::debug!("Prefetched {}/{} forecast key(s)", stored, targets.len());
        }
        stored
    }

    /// Whether any tier holds an unexpired `key`
    pub fn contains_key(&self, key: &str) -> bool {
        let now = now_millis();
        self.tiers.iter().any(|tier| {
            tier.ledger_entry(key)
                .is_some_and(|entry| !entry.metadata.is_expired_at(now))
        })
    }

    /// Remove every item tagged `tag` from all tiers; returns the number of keys
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let mut keys: Vec<String> = self
            .tiers
            .iter()
            .flat_map(|tier| tier.ledger_snapshot())
            .filter(|(_, entry)| entry.metadata.has_tag(tag))
            .map(|(key, _)| key)
            .collect();
        keys.sort();
        keys.dedup();

        let mut invalidated = 0;
        for key in &keys {
            let _guard = self.locks.lock(key).await;
            let mut removed = false;
            for tier in &self.tiers {
                if tier.remove(key).await {
                    log_removal(key, tier.level(), EvictionReason::Manual);
                    removed = true;
                }
            }
            if removed {
                invalidated += 1;
            }
        }
        log::debug!("Invalidated {} key(s) tagged '{}'", invalidated, tag);
        invalidated
    }

    /// Delete expired items from every tier; skipped while another sweep runs
    pub async fn sweep_expired(&self) -> usize {
        if self.sweeping.swap(true, Ordering::AcqRel) {
            log::debug!("Expiry sweep already running, skipping");
            return 0;
        }
        let _flag = SweepFlag(&self.sweeping);

        let now = now_millis();
        let mut removed = 0;
        for tier in &self.tiers {
            let expired: Vec<String> = tier
                .ledger_snapshot()
                .into_iter()
                .filter(|(_, entry)| entry.metadata.is_expired_at(now))
                .map(|(key, _)| key)
                .collect();
            for key in expired {
                let _guard = self.locks.lock(&key).await;
                if tier.remove(&key).await {
                    log_removal(&key, tier.level(), EvictionReason::Expired);
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            self.stats.record_evictions(removed as u64);
            log::info!("Expiry sweep removed {} item(s)", removed);
        }
        self.locks.prune();
        removed
    }

    /// Sample performance, let the strategy adapt and prefetch due forecasts
    pub async fn run_adaptation_cycle(&self) -> Option<EvictionStrategy> {
        let now = now_millis();
        let stats = self.stats();
        let memory_usage = 1.0 - stats.memory_efficiency;

        self.strategy
            .record_performance(stats.hit_rate, stats.avg_operation_time_ms, memory_usage);
        let switched = self.strategy.adapt();

        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_sample(HitRateSample {
                timestamp: now,
                hit_rate: stats.hit_rate,
                avg_latency_ms: stats.avg_operation_time_ms,
                memory_usage,
                strategy: self.strategy.current_strategy(),
            });

        if let Some(loader) = self.loader.clone() {
            let keys: Vec<String> = self
                .predictor
                .get_predictions(now)
                .into_iter()
                .map(|p| p.key)
                .collect();
            if !keys.is_empty() {
                self.prefetch(keys, loader.as_ref()).await;
            }
        }
        switched
    }

    /// Aggregate statistics across all tiers
    pub fn stats(&self) -> CacheStats {
        let total_items: u64 = self.tiers.iter().map(|t| t.item_count() as u64).sum();
        let total_size: u64 = self.tiers.iter().map(Tier::size).sum();
        let capacity: u64 = self.tiers.iter().map(|t| t.config().max_size).sum();

        let memory_efficiency = if capacity == 0 {
            1.0
        } else {
            (1.0 - total_size as f64 / capacity as f64).clamp(0.0, 1.0)
        };

        let (original, stored) = self
            .tiers
            .iter()
            .flat_map(|tier| tier.ledger_snapshot())
            .filter(|(_, entry)| entry.stored_size < entry.metadata.size)
            .fold((0u64, 0u64), |(original, stored), (_, entry)| {
                (original + entry.metadata.size, stored + entry.stored_size)
            });
        let compression_ratio = if original == 0 {
            1.0
        } else {
            stored as f64 / original as f64
        };

        CacheStats {
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            evictions: self.stats.evictions(),
            compressions: self.stats.compressions(),
            predictions: self.stats.predictions(),
            total_size,
            total_items,
            hit_rate: self.stats.hit_rate(),
            avg_operation_time_ms: self.stats.avg_operation_time_ms(),
            memory_efficiency,
            compression_ratio,
        }
    }

    /// Statistics plus strategy, forecasts, tier occupancy and busiest keys
    pub fn performance_report(&self) -> PerformanceReport {
        let cache_distribution = self
            .tiers
            .iter()
            .map(|tier| TierDistribution {
                level: tier.level(),
                name: tier.config().name.clone(),
                backend: tier.backend_kind().to_string(),
                items: tier.item_count() as u64,
                size: tier.size(),
                max_items: tier.config().max_items,
                max_size: tier.config().max_size,
            })
            .collect();

        let mut usage: HashMap<String, KeyUsage> = HashMap::new();
        for tier in &self.tiers {
            for (key, entry) in tier.ledger_snapshot() {
                usage.entry(key.clone()).or_insert_with(|| KeyUsage {
                    key,
                    level: tier.level(),
                    access_count: entry.metadata.access_count,
                    hit_rate: entry.metadata.hit_rate(),
                    pattern: entry.metadata.access_pattern.name().to_string(),
                });
            }
        }
        let mut top_keys: Vec<KeyUsage> = usage.into_values().collect();
        top_keys.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.key.cmp(&b.key))
        });
        top_keys.truncate(TOP_KEYS);

        let recent_hit_rate_history = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent(REPORT_HISTORY);

        PerformanceReport {
            stats: self.stats(),
            current_strategy: self.strategy.current_strategy(),
            prediction_count: self.predictor.prediction_count(),
            cache_distribution,
            top_keys,
            recent_hit_rate_history,
        }
    }

    /// Stop background maintenance; foreground operations keep working
    pub fn cleanup(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let tickers = std::mem::take(&mut *self.tickers.lock().unwrap_or_else(PoisonError::into_inner));
        for ticker in &tickers {
            ticker.stop();
            log::debug!("Stopped ticker '{}'", ticker.name());
        }
        log::info!("Cache '{}' background work stopped", self.config.cache_id);
    }
}

fn log_removal(key: &str, level: usize, reason: EvictionReason) {
    log::trace!("Removed '{}' from tier {} ({})", key, level, reason.as_str());
}

impl Drop for SmartCacheSystem {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::{Notify, Semaphore};

    use super::*;
    use crate::cache::config::TierConfig;
    use crate::cache::tier::MemoryTier;

    /// How a scripted backend answers `get`
    #[derive(Debug)]
    enum OnGet {
        /// Sleep before answering
        Stall(Duration),
        /// Report the tier as down
        Fail,
        /// Read, signal `reached`, then wait for a `release` permit
        Gate {
            reached: Arc<Notify>,
            release: Arc<Semaphore>,
        },
    }

    /// Memory backend with scripted reads; writes go straight through
    #[derive(Debug)]
    struct ScriptedTier {
        inner: MemoryTier,
        on_get: OnGet,
    }

    impl ScriptedTier {
        fn boxed(on_get: OnGet) -> Box<dyn TierBackend> {
            Box::new(Self {
                inner: MemoryTier::new(),
                on_get,
            })
        }
    }

    #[async_trait]
    impl TierBackend for ScriptedTier {
        fn kind(&self) -> &'static str {
            "scripted"
        }

        async fn get(&self, key: &str) -> Result<Option<SmartCacheItem>, CacheOperationError> {
            match &self.on_get {
                OnGet::Stall(delay) => {
                    tokio::time::sleep(*delay).await;
                    self.inner.get(key).await
                }
                OnGet::Fail => Err(CacheOperationError::tier_unavailable("scripted outage")),
                OnGet::Gate { reached, release } => {
                    let item = self.inner.get(key).await?;
                    reached.notify_one();
                    release
                        .acquire()
                        .await
                        .map_err(|e| CacheOperationError::tier_unavailable(e.to_string()))?
                        .forget();
                    Ok(item)
                }
            }
        }

        async fn set(&self, key: &str, item: SmartCacheItem) -> Result<(), CacheOperationError> {
            self.inner.set(key, item).await
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

    /// Scripted tier 0 over a plain memory tier 1
    async fn scripted(on_get: OnGet, timeout_ms: u64) -> Arc<SmartCacheSystem> {
        let mut cfg = config(vec![
            TierConfig::memory(100, 1 << 20),
            TierConfig::memory(100, 1 << 20),
        ]);
        cfg.maintenance.tier_timeout_ms = timeout_ms;
        let backends = vec![
            ScriptedTier::boxed(on_get),
            Box::new(MemoryTier::new()) as Box<dyn TierBackend>,
        ];
        SmartCacheSystem::with_backends(cfg, backends, None)
            .await
            .unwrap()
    }

    fn config(tiers: Vec<TierConfig>) -> CacheConfig {
        let mut config = CacheConfig::default();
        config.tiers = tiers;
        config.maintenance.background_tasks = false;
        config
    }

    async fn two_tier() -> Arc<SmartCacheSystem> {
        SmartCacheSystem::new(
            config(vec![
                TierConfig::memory(100, 1 << 20),
                TierConfig::worker(100, 1 << 20),
            ]),
            None,
        )
        .await
        .unwrap()
    }

    async fn pause() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test]
    async fn test_round_trip_plain_and_compressed() {
        let cache = two_tier().await;
        let small = CacheValue::from("hello");
        let large = CacheValue::Bytes(b"abcdefgh".repeat(4096));

        assert!(cache.set("small", small.clone(), SetOptions::new()).await.unwrap());
        assert!(cache.set("large", large.clone(), SetOptions::new()).await.unwrap());

        assert_eq!(cache.get("small", None).await.unwrap(), Some(small));
        assert_eq!(cache.get("large", None).await.unwrap(), Some(large));
        assert_eq!(cache.get("missing", None).await.unwrap(), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.compressions, 1);
        assert!(stats.compression_ratio < 1.0);
        assert_eq!(stats.total_items, 2);
    }

    #[tokio::test]
    async fn test_unknown_tier_is_an_error() {
        let cache = two_tier().await;
        assert!(matches!(
            cache.get("k", Some(5)).await,
            Err(CacheOperationError::UnknownTier(5))
        ));
        assert!(cache.set("k", "v".into(), SetOptions::new().level(2)).await.is_err());
        assert!(cache.delete("k", Some(9)).await.is_err());
        assert!(cache.clear(Some(3)).await.is_err());
    }

    #[tokio::test]
    async fn test_capacity_limits_hold_after_every_set() {
        let cache = SmartCacheSystem::new(
            config(vec![
                TierConfig::memory(5, 200),
                TierConfig::worker(8, 400),
            ]),
            None,
        )
        .await
        .unwrap();

        for i in 0..40u32 {
            let level = (i % 2) as usize;
            let value = CacheValue::Bytes(vec![i as u8; 10 + (i as usize % 5) * 15]);
            let key = format!("key-{}", i);
            cache.set(&key, value, SetOptions::new().level(level)).await.unwrap();

            for level in 0..cache.tier_count() {
                let tier = cache.tier(level).unwrap();
                assert!(tier.item_count() <= tier.config().max_items);
                assert!(tier.size() <= tier.config().max_size);
            }
        }
        assert!(cache.stats().evictions > 0);
    }

    #[tokio::test]
    async fn test_oversized_value_is_refused() {
        let cache = SmartCacheSystem::new(config(vec![TierConfig::memory(10, 16)]), None)
            .await
            .unwrap();
        let value = CacheValue::Bytes((0..64u8).collect());
        assert!(!cache.set("big", value, SetOptions::new()).await.unwrap());
        assert!(!cache.contains_key("big"));
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = two_tier().await;
        let options = SetOptions::new().ttl(Duration::from_millis(50));
        cache.set("short", "lived".into(), options).await.unwrap();

        assert_eq!(cache.get("short", None).await.unwrap(), Some("lived".into()));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get("short", None).await.unwrap(), None);
        assert!(!cache.tier(0).unwrap().contains("short"));
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_items() {
        let cache = two_tier().await;
        let options = SetOptions::new().ttl(Duration::from_millis(10));
        cache.set("a", "1".into(), options.clone()).await.unwrap();
        cache.set("b", "2".into(), options.level(1)).await.unwrap();
        cache.set("keep", "3".into(), SetOptions::new()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.sweep_expired().await, 2);
        assert_eq!(cache.stats().total_items, 1);
        assert!(cache.contains_key("keep"));
    }

    #[tokio::test]
    async fn test_promotion_clones_and_delete_clears_all_tiers() {
        let cache = two_tier().await;
        cache.set("k", "v".into(), SetOptions::new().level(1)).await.unwrap();
        assert!(!cache.tier(0).unwrap().contains("k"));

        assert_eq!(cache.get("k", None).await.unwrap(), Some("v".into()));
        assert!(cache.tier(0).unwrap().contains("k"));
        assert_eq!(cache.statistics().promotions(), 1);

        // further hits land on the fast clone only
        cache.get("k", None).await.unwrap();
        cache.get("k", None).await.unwrap();
        let fast = cache.tier(0).unwrap().get("k").await.unwrap();
        let slow = cache.tier(1).unwrap().get("k").await.unwrap();
        assert_eq!(fast.metadata().access_count, 3);
        assert_eq!(slow.metadata().access_count, 0);

        assert!(cache.delete("k", None).await.unwrap());
        assert!(!cache.tier(0).unwrap().contains("k"));
        assert!(!cache.tier(1).unwrap().contains("k"));
        assert!(!cache.delete("k", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_lru_evicts_exactly_one() {
        let mut cfg = config(vec![TierConfig::memory(2, 1 << 20)]);
        cfg.strategy.initial = EvictionStrategy::Lru;
        let cache = SmartCacheSystem::new(cfg, None).await.unwrap();

        cache.set("a", "1".into(), SetOptions::new()).await.unwrap();
        pause().await;
        cache.set("b", "2".into(), SetOptions::new()).await.unwrap();
        pause().await;
        cache.get("a", None).await.unwrap();
        pause().await;
        cache.set("c", "3".into(), SetOptions::new()).await.unwrap();

        let tier = cache.tier(0).unwrap();
        assert_eq!(tier.item_count(), 2);
        assert!(tier.contains("a"));
        assert!(!tier.contains("b"));
        assert!(tier.contains("c"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_set_replaces_copies_in_other_tiers() {
        let cache = two_tier().await;
        cache.set("k", "old".into(), SetOptions::new().level(1)).await.unwrap();
        cache.set("k", "new".into(), SetOptions::new()).await.unwrap();
        assert!(!cache.tier(1).unwrap().contains("k"));
        assert_eq!(cache.get("k", Some(1)).await.unwrap(), Some("new".into()));
    }

    #[tokio::test]
    async fn test_warmup_and_invalidate_tag() {
        let cache = two_tier().await;
        let items = vec![
            WarmupItem::new("u:1", "alice").with_options(SetOptions::new().tag("users")),
            WarmupItem::new("u:2", "bob").with_options(SetOptions::new().tag("users").level(1)),
            WarmupItem::new("cfg", "on"),
            WarmupItem::new("bad", "x").with_options(SetOptions::new().level(7)),
        ];
        assert_eq!(cache.warmup(items).await, 3);

        assert_eq!(cache.invalidate_tag("users").await, 2);
        assert!(!cache.contains_key("u:1"));
        assert!(!cache.contains_key("u:2"));
        assert!(cache.contains_key("cfg"));
    }

    fn feed_regular(cache: &SmartCacheSystem, key: &str, now: u64) {
        let predictor = cache.predictor();
        for i in (0..12u64).rev() {
            let ts = now - 500 - i * 2_000;
            predictor.validate_prediction(key, ts);
            predictor.record_access(key, ts);
        }
    }

    #[tokio::test]
    async fn test_prefetch_isolates_loader_failures() {
        let cache = two_tier().await;
        let now = now_millis();
        feed_regular(&cache, "a", now);
        feed_regular(&cache, "b", now);
        assert!(cache.predictor().confidence("a") >= 0.7);

        let loader = |key: String| async move {
            if key == "b" {
                Err(CacheOperationError::loader_failed("backend down"))
            } else {
                Ok(CacheValue::from(format!("loaded {}", key)))
            }
        };

        let stored = cache.prefetch(["a", "b", "unpredicted"], &loader).await;
        assert_eq!(stored, 1);
        assert!(cache.tier(1).unwrap().contains("a"));
        assert!(!cache.contains_key("b"));
        assert!(!cache.contains_key("unpredicted"));
        assert_eq!(cache.stats().predictions, 1);
        assert_eq!(cache.get("a", None).await.unwrap(), Some("loaded a".into()));
    }

    #[tokio::test]
    async fn test_confidence_stays_bounded_through_gets() {
        let cache = two_tier().await;
        cache.set("k", "v".into(), SetOptions::new()).await.unwrap();
        for _ in 0..20 {
            cache.get("k", None).await.unwrap();
            let confidence = cache.predictor().confidence("k");
            assert!((0.0..=1.0).contains(&confidence));
        }
    }

    #[tokio::test]
    async fn test_adaptation_cycle_records_history() {
        let cache = two_tier().await;
        cache.set("k", "v".into(), SetOptions::new()).await.unwrap();
        cache.get("k", None).await.unwrap();

        assert_eq!(cache.run_adaptation_cycle().await, None);
        assert_eq!(cache.strategy().sample_count(), 1);

        let report = cache.performance_report();
        assert_eq!(report.recent_hit_rate_history.len(), 1);
        assert_eq!(report.current_strategy, EvictionStrategy::Adaptive);
        assert_eq!(report.cache_distribution.len(), 2);
        assert_eq!(report.top_keys[0].key, "k");
        assert_eq!(report.top_keys[0].access_count, 1);
        assert!(report.to_json().unwrap().contains("cache_distribution"));
    }

    #[tokio::test]
    async fn test_clear_all_resets_counters() {
        let cache = two_tier().await;
        cache.set("a", "1".into(), SetOptions::new()).await.unwrap();
        cache.set("b", "2".into(), SetOptions::new().level(1)).await.unwrap();
        cache.get("a", None).await.unwrap();

        cache.clear(Some(1)).await.unwrap();
        assert_eq!(cache.stats().total_items, 1);
        assert_eq!(cache.stats().hits, 1);

        cache.clear(None).await.unwrap();
        let stats = cache.stats();
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_persistent_tier_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let tiers = vec![
            TierConfig::memory(10, 1 << 16),
            TierConfig::persistent(10, 1 << 16, Some(dir.path().to_path_buf())),
        ];

        let first = SmartCacheSystem::new(config(tiers.clone()), None).await.unwrap();
        first.set("durable", "yes".into(), SetOptions::new().level(1)).await.unwrap();
        drop(first);

        let second = SmartCacheSystem::new(config(tiers), None).await.unwrap();
        assert_eq!(second.tier(1).unwrap().item_count(), 1);
        assert_eq!(second.get("durable", None).await.unwrap(), Some("yes".into()));
    }

    #[tokio::test]
    async fn test_cleanup_stops_background_work() {
        let mut cfg = config(vec![TierConfig::memory(10, 1 << 16)]);
        cfg.maintenance.background_tasks = true;
        let cache = SmartCacheSystem::new(cfg, None).await.unwrap();
        assert!(!cache.is_shut_down());
        assert_eq!(cache.background_tasks_running(), 2);

        cache.cleanup();
        assert!(cache.is_shut_down());
        assert_eq!(cache.background_tasks_running(), 0);
        cache.set("still", "works".into(), SetOptions::new()).await.unwrap();
        assert_eq!(cache.get("still", None).await.unwrap(), Some("works".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fast_tier_reads_as_miss() {
        let cache = scripted(OnGet::Stall(Duration::from_secs(60)), 50).await;
        cache.set("k", "v".into(), SetOptions::new().level(1)).await.unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(cache.get("k", None).await.unwrap(), Some("v".into()));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_fast_tier_reads_as_miss() {
        let cache = scripted(OnGet::Fail, 50).await;
        cache.set("k", "v".into(), SetOptions::new().level(1)).await.unwrap();

        assert_eq!(cache.get("k", None).await.unwrap(), Some("v".into()));
        assert_eq!(cache.get("absent", None).await.unwrap(), None);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_backend_count_must_match_tiers() {
        let cfg = config(vec![
            TierConfig::memory(10, 1 << 16),
            TierConfig::memory(10, 1 << 16),
        ]);
        let backends = vec![Box::new(MemoryTier::new()) as Box<dyn TierBackend>];
        let result = SmartCacheSystem::with_backends(cfg, backends, None).await;
        assert!(matches!(
            result,
            Err(CacheOperationError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_wins_over_inflight_write_back() {
        let reached = Arc::new(Notify::new());
        let release = Arc::new(Semaphore::new(0));
        let gate = OnGet::Gate {
            reached: reached.clone(),
            release: release.clone(),
        };
        let cache = scripted(gate, 5_000).await;
        cache.set("k", "v".into(), SetOptions::new()).await.unwrap();

        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("k", None).await })
        };
        reached.notified().await;
        cache.clear(None).await.unwrap();
        release.add_permits(16);

        // the read began before the clear and still sees its value
        assert_eq!(reader.await.unwrap().unwrap(), Some("v".into()));
        let fast = cache.tier(0).unwrap();
        assert!(!fast.contains("k"));
        assert!(fast.get("k").await.is_none());
        assert_eq!(cache.stats().total_items, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_writes_keep_ledger_and_backend_in_step() {
        let cache = two_tier().await;
        let tasks: Vec<_> = (0..200usize)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let value = CacheValue::Bytes(vec![i as u8; 1 + i % 50]);
                    cache
                        .set("shared", value, SetOptions::new().level(i % 2))
                        .await
                        .unwrap();
                    cache.get("shared", None).await.unwrap()
                })
            })
            .collect();
        for task in join_all(tasks).await {
            assert!(task.unwrap().is_some());
        }

        for level in 0..cache.tier_count() {
            let tier = cache.tier(level).unwrap();
            let tracked = tier.ledger_entry("shared").map(|entry| entry.stored_size);
            assert_eq!(tier.size(), tracked.unwrap_or(0));
            let stored = tier.get("shared").await.map(|item| item.stored_size());
            assert_eq!(stored, tracked);
        }
        assert!(cache.tier(0).unwrap().contains("shared"));
    }

    /// Array of readings with pseudo-random bit patterns, compressible through its field names
    fn readings(seed: u64, len: usize) -> CacheValue {
        let mut state = seed;
        let rows: Vec<serde_json::Value> = (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let bits = f64::from_bits(state);
                let reading = if bits.is_finite() {
                    bits
                } else {
                    (state >> 11) as f64 / (1u64 << 53) as f64
                };
                serde_json::json!({ "sensor": "thermocouple", "reading": reading })
            })
            .collect();
        CacheValue::Structured(serde_json::Value::Array(rows))
    }

    #[tokio::test]
    async fn test_structured_floats_round_trip_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SmartCacheSystem::new(
            config(vec![
                TierConfig::memory(100, 1 << 24),
                TierConfig::persistent(100, 1 << 24, Some(dir.path().to_path_buf())),
            ]),
            None,
        )
        .await
        .unwrap();

        for round in 0..5u64 {
            let value = readings(round + 1, 3_000);

            let hot = format!("hot-{}", round);
            assert!(cache.set(&hot, value.clone(), SetOptions::new()).await.unwrap());
            let entry = cache.tier(0).unwrap().ledger_entry(&hot).unwrap();
            assert!(entry.stored_size < entry.metadata.size);
            assert_eq!(cache.get(&hot, None).await.unwrap(), Some(value.clone()));

            let durable = format!("durable-{}", round);
            let options = SetOptions::new().level(1);
            assert!(cache.set(&durable, value.clone(), options).await.unwrap());
            assert_eq!(cache.get(&durable, Some(1)).await.unwrap(), Some(value));
        }
    }
}
