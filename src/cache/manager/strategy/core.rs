//! Eviction strategies and the adaptive strategy selector
//!
//! `AdaptiveCacheStrategy` keeps a bounded history of performance samples, maintains a
//! performance estimate per strategy and switches the active strategy only from
//! `adapt()`, and only when a challenger clears the configured margin.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crossbeam_utils::atomic::AtomicCell;
use serde::{Deserialize, Serialize};

use super::metrics::{PerformanceSample, StrategyMetrics, StrategyStats, performance_score};
use super::switcher::StrategySwitcher;
use super::thresholds::StrategyThresholds;
use crate::cache::config::StrategyConfig;

/// Eviction ordering applied when a tier is over capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Least recently accessed first
    Lru,
    /// Least frequently accessed first
    Lfu,
    /// Expired first, then least recently accessed
    Ttl,
    /// Lowest priority score first
    #[default]
    Adaptive,
}

impl EvictionStrategy {
    pub const COUNT: usize = 4;

    pub const ALL: [EvictionStrategy; Self::COUNT] = [
        EvictionStrategy::Lru,
        EvictionStrategy::Lfu,
        EvictionStrategy::Ttl,
        EvictionStrategy::Adaptive,
    ];

    /// Get strategy index for metrics arrays
    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            EvictionStrategy::Lru => 0,
            EvictionStrategy::Lfu => 1,
            EvictionStrategy::Ttl => 2,
            EvictionStrategy::Adaptive => 3,
        }
    }

    #[inline(always)]
    pub const fn name(self) -> &'static str {
        match self {
            EvictionStrategy::Lru => "LRU",
            EvictionStrategy::Lfu => "LFU",
            EvictionStrategy::Ttl => "TTL",
            EvictionStrategy::Adaptive => "ADAPTIVE",
        }
    }
}

impl std::fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime selector of the active eviction strategy
#[derive(Debug)]
pub struct AdaptiveCacheStrategy {
    current_strategy: AtomicCell<EvictionStrategy>,
    metrics: Mutex<StrategyMetrics>,
    thresholds: StrategyThresholds,
    switcher: StrategySwitcher,
    max_latency_ms: f64,
    switch_count: AtomicU64,
}

impl Default for AdaptiveCacheStrategy {
    fn default() -> Self {
        Self::new(&StrategyConfig::default())
    }
}

impl AdaptiveCacheStrategy {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            current_strategy: AtomicCell::new(config.initial),
            metrics: Mutex::new(StrategyMetrics::new(config.history_capacity)),
            thresholds: StrategyThresholds::from_config(config),
            switcher: StrategySwitcher,
            max_latency_ms: config.max_latency_ms,
            switch_count: AtomicU64::new(0),
        }
    }

    /// Get current eviction strategy
    #[inline(always)]
    pub fn current_strategy(&self) -> EvictionStrategy {
        self.current_strategy.load()
    }

    /// Record a sample for the active strategy and return its score
    pub fn record_performance(&self, hit_rate: f64, latency_ms: f64, memory_usage: f64) -> f64 {
        self.record_performance_for(self.current_strategy(), hit_rate, latency_ms, memory_usage)
    }

    /// Record a sample observed under `strategy`
    pub fn record_performance_for(
        &self,
        strategy: EvictionStrategy,
        hit_rate: f64,
        latency_ms: f64,
        memory_usage: f64,
    ) -> f64 {
        let score = performance_score(hit_rate, latency_ms, memory_usage, self.max_latency_ms);
        let sample = PerformanceSample {
            strategy,
            hit_rate,
            latency_ms,
            memory_usage,
            score,
        };
        self.lock_metrics()
            .push(sample, self.thresholds.trailing_window());
        score
    }

    /// Re-evaluate the active strategy; the only place it changes
    pub fn adapt(&self) -> Option<EvictionStrategy> {
        let current = self.current_strategy();
        let next = {
            let metrics = self.lock_metrics();
            self.switcher
                .evaluate_switch(current, &metrics, &self.thresholds)
        }?;

        self.current_strategy.store(next);
        self.switch_count.fetch_add(1, Ordering::Relaxed);
        log::info!("Eviction strategy switched from {} to {}", current, next);
        Some(next)
    }

    /// Tracked weight and performance of a strategy
    pub fn stats(&self, strategy: EvictionStrategy) -> StrategyStats {
        self.lock_metrics().stats(strategy)
    }

    /// Scale a strategy's tracked performance when ranking challengers
    pub fn set_weight(&self, strategy: EvictionStrategy, weight: f64) {
        self.lock_metrics().set_weight(strategy, weight);
    }

    pub fn sample_count(&self) -> usize {
        self.lock_metrics().len()
    }

    pub fn latest_sample(&self) -> Option<PerformanceSample> {
        self.lock_metrics().latest().copied()
    }

    #[inline]
    pub fn switch_count(&self) -> u64 {
        self.switch_count.load(Ordering::Relaxed)
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, StrategyMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
