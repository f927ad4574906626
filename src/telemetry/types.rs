//! Serializable telemetry snapshots

use serde::{Deserialize, Serialize};

use crate::cache::manager::strategy::EvictionStrategy;
use crate::cache::traits::CacheOperationError;

/// One periodic performance observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitRateSample {
    pub timestamp: u64,
    pub hit_rate: f64,
    pub avg_latency_ms: f64,
    /// Used share of configured capacity
    pub memory_usage: f64,
    pub strategy: EvictionStrategy,
}

/// Aggregate cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub compressions: u64,
    /// Items stored by prefetch
    pub predictions: u64,
    /// Stored bytes across all tiers
    pub total_size: u64,
    /// Items across all tiers
    pub total_items: u64,
    pub hit_rate: f64,
    pub avg_operation_time_ms: f64,
    /// Free share of configured byte capacity
    pub memory_efficiency: f64,
    /// Stored over original bytes for compressed items, 1.0 without any
    pub compression_ratio: f64,
}

/// Occupancy of one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDistribution {
    pub level: usize,
    pub name: String,
    pub backend: String,
    pub items: u64,
    pub size: u64,
    pub max_items: usize,
    pub max_size: u64,
}

/// Usage of one frequently accessed key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyUsage {
    pub key: String,
    pub level: usize,
    pub access_count: u64,
    pub hit_rate: f64,
    pub pattern: String,
}

/// Full performance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub stats: CacheStats,
    pub current_strategy: EvictionStrategy,
    /// Live forecasts regardless of confidence
    pub prediction_count: usize,
    pub cache_distribution: Vec<TierDistribution>,
    pub top_keys: Vec<KeyUsage>,
    pub recent_hit_rate_history: Vec<HitRateSample>,
}

impl PerformanceReport {
    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String, CacheOperationError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CacheOperationError::serialization_failed(e.to_string()))
    }
}
