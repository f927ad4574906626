//! Public API for the tiercache smart cache
//!
//! [`SmartCache`] is a cheaply clonable handle over a shared [`SmartCacheSystem`]. Values
//! are [`CacheValue`]s (bytes, text or structured JSON); the typed helpers store any
//! serde type as a structured value.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::cache::config::{CacheConfig, CompressionCodec, TierConfig};
use crate::cache::coordinator::{Loader, SmartCacheSystem};
use crate::cache::item::compressor_for;
use crate::cache::manager::strategy::EvictionStrategy;
use crate::cache::tier::{TierBackend, build_backend};
use crate::cache::traits::CacheOperationError;
use crate::cache::types::{CacheValue, SetOptions, WarmupItem};
use crate::telemetry::{CacheStats, PerformanceReport};

/// Multi-tier cache handle
#[derive(Debug, Clone)]
pub struct SmartCache {
    system: Arc<SmartCacheSystem>,
}

impl SmartCache {
    /// Create new cache builder with fluent configuration
    pub fn builder() -> SmartCacheBuilder {
        SmartCacheBuilder::new()
    }

    /// Create new cache with default configuration
    pub async fn new() -> Result<Self, CacheOperationError> {
        Self::builder().build().await
    }

    /// Create a cache from a complete configuration
    pub async fn from_config(config: CacheConfig) -> Result<Self, CacheOperationError> {
        Self::builder().config(config).build().await
    }

    /// The shared orchestrator behind this handle
    #[inline]
    pub fn system(&self) -> &Arc<SmartCacheSystem> {
        &self.system
    }

    /// Look up a value, fastest tier first
    pub async fn get(&self, key: &str) -> Result<Option<CacheValue>, CacheOperationError> {
        self.system.get(key, None).await
    }

    /// Look up a value starting at tier `level`
    pub async fn get_from(
        &self,
        key: &str,
        level: usize,
    ) -> Result<Option<CacheValue>, CacheOperationError> {
        self.system.get(key, Some(level)).await
    }

    /// Store a value in the fastest tier with default options
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
    ) -> Result<bool, CacheOperationError> {
        self.system.set(key, value.into(), SetOptions::default()).await
    }

    /// Store a value with explicit placement, TTL, priority and tags
    pub async fn set_with(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
        options: SetOptions,
    ) -> Result<bool, CacheOperationError> {
        self.system.set(key, value.into(), options).await
    }

    /// Store any serializable value as structured data
    pub async fn set_typed<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<bool, CacheOperationError> {
        let value = CacheValue::structured(value)?;
        self.system.set(key, value, options).await
    }

    /// Fetch a structured value and decode it into `T`
    pub async fn get_typed<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, CacheOperationError> {
        match self.system.get(key, None).await? {
            Some(value) => value.to_typed().map(Some),
            None => Ok(None),
        }
    }

    /// Remove a key from every tier
    pub async fn delete(&self, key: &str) -> Result<bool, CacheOperationError> {
        self.system.delete(key, None).await
    }

    /// Remove a key from tier `level` only
    pub async fn delete_from(&self, key: &str, level: usize) -> Result<bool, CacheOperationError> {
        self.system.delete(key, Some(level)).await
    }

    /// Clear all entries and counters
    pub async fn clear(&self) -> Result<(), CacheOperationError> {
        self.system.clear(None).await
    }

    /// Clear tier `level` only
    pub async fn clear_level(&self, level: usize) -> Result<(), CacheOperationError> {
        self.system.clear(Some(level)).await
    }

    /// Store a batch concurrently; returns how many were stored
    pub async fn warmup(&self, items: Vec<WarmupItem>) -> usize {
        self.system.warmup(items).await
    }

    /// Load forecast keys through `loader`; returns how many were stored
    pub async fn prefetch<L>(&self, keys: impl IntoIterator<Item = impl AsRef<str>>, loader: &L) -> usize
    where
        L: Loader + ?Sized,
    {
        self.system.prefetch(keys, loader).await
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.system.contains_key(key)
    }

    /// Remove every entry tagged `tag`
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        self.system.invalidate_tag(tag).await
    }

    pub fn stats(&self) -> CacheStats {
        self.system.stats()
    }

    pub fn performance_report(&self) -> PerformanceReport {
        self.system.performance_report()
    }

    /// Currently active eviction strategy
    pub fn current_strategy(&self) -> EvictionStrategy {
        self.system.strategy().current_strategy()
    }

    /// Stop background maintenance
    pub fn cleanup(&self) {
        self.system.cleanup();
    }
}

/// Fluent builder for [`SmartCache`]
pub struct SmartCacheBuilder {
    config: CacheConfig,
    loader: Option<Arc<dyn Loader>>,
    /// Caller-supplied backends by tier level
    backends: HashMap<usize, Box<dyn TierBackend>>,
}

impl std::fmt::Debug for SmartCacheBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartCacheBuilder")
            .field("config", &self.config)
            .field("loader", &self.loader.is_some())
            .field("custom_backends", &self.backends.len())
            .finish()
    }
}

impl SmartCacheBuilder {
    /// Create new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            loader: None,
            backends: HashMap::new(),
        }
    }

    /// Replace the whole configuration, dropping backends added with `tier_with_backend`
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self.backends.clear();
        self
    }

    /// Set cache ID (defaults to a UUID); persistent tiers without a path live under it
    pub fn cache_id<S: Into<String>>(mut self, id: S) -> Self {
        self.config.cache_id = id.into();
        self
    }

    /// Replace the tier list, fastest first, dropping backends added with `tier_with_backend`
    pub fn tiers(mut self, tiers: Vec<TierConfig>) -> Self {
        self.config.tiers = tiers;
        self.backends.clear();
        self
    }

    /// Append a slower tier
    pub fn add_tier(mut self, tier: TierConfig) -> Self {
        self.config.tiers.push(tier);
        self
    }

    /// Append a slower tier served by `backend` instead of the one `tier.backend` names
    pub fn tier_with_backend(mut self, tier: TierConfig, backend: Box<dyn TierBackend>) -> Self {
        self.backends.insert(self.config.tiers.len(), backend);
        self.config.tiers.push(tier);
        self
    }

    /// Values larger than this many bytes are compressed
    pub fn compression_threshold(mut self, bytes: u64) -> Self {
        self.config.compression.threshold_bytes = bytes;
        self
    }

    pub fn compression_codec(mut self, codec: CompressionCodec) -> Self {
        self.config.compression.codec = codec;
        self
    }

    pub fn initial_strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.config.strategy.initial = strategy;
        self
    }

    /// Margin an alternative strategy must win by before a switch
    pub fn strategy_change_threshold(mut self, threshold: f64) -> Self {
        self.config.strategy.change_threshold = threshold;
        self
    }

    pub fn expiry_sweep_interval(mut self, interval: Duration) -> Self {
        self.config.maintenance.expiry_sweep_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn adaptation_interval(mut self, interval: Duration) -> Self {
        self.config.maintenance.adaptation_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Deadline for each tier call
    pub fn tier_timeout(mut self, timeout: Duration) -> Self {
        self.config.maintenance.tier_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Whether to start the sweep and adaptation tickers
    pub fn background_tasks(mut self, enabled: bool) -> Self {
        self.config.maintenance.background_tasks = enabled;
        self
    }

    /// Source used by background prefetch
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Validate the configuration, open every tier and start maintenance
    pub async fn build(mut self) -> Result<SmartCache, CacheOperationError> {
        if self.backends.is_empty() {
            let system = SmartCacheSystem::new(self.config, self.loader).await?;
            return Ok(SmartCache { system });
        }

        self.config.validate()?;
        let compressor = compressor_for(self.config.compression.codec);
        let mut backends = Vec::with_capacity(self.config.tiers.len());
        for level in 0..self.config.tiers.len() {
            let backend = match self.backends.remove(&level) {
                Some(backend) => backend,
                None => build_backend(&self.config, level, compressor.clone())?,
            };
            backends.push(backend);
        }
        let system = SmartCacheSystem::with_backends(self.config, backends, self.loader).await?;
        Ok(SmartCache { system })
    }
}

impl Default for SmartCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
