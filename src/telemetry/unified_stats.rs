//! Lock-free aggregate counters
//!
//! Each counter sits on its own cache line so concurrent readers and writers on
//! different counters never contend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_utils::CachePadded;

/// Aggregate operation counters for the whole cache
#[derive(Debug, Default)]
pub struct UnifiedCacheStatistics {
    hits: CachePadded<AtomicU64>,
    misses: CachePadded<AtomicU64>,
    evictions: CachePadded<AtomicU64>,
    compressions: CachePadded<AtomicU64>,
    predictions: CachePadded<AtomicU64>,
    promotions: CachePadded<AtomicU64>,
    /// Timed public operations
    operations: CachePadded<AtomicU64>,
    total_operation_time_us: CachePadded<AtomicU64>,
}

impl UnifiedCacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record_hit(&self, elapsed: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.record_operation(elapsed);
    }

    #[inline(always)]
    pub fn record_miss(&self, elapsed: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.record_operation(elapsed);
    }

    /// Time a non-read operation
    #[inline(always)]
    pub fn record_operation(&self, elapsed: Duration) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_operation_time_us
            .fetch_add(micros, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_compression(&self) {
        self.compressions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_predictions(&self, count: u64) {
        self.predictions.fetch_add(count, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn compressions(&self) -> u64 {
        self.compressions.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn predictions(&self) -> u64 {
        self.predictions.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn promotions(&self) -> u64 {
        self.promotions.load(Ordering::Relaxed)
    }

    /// Hits over lookups, 0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Mean duration of timed operations in milliseconds
    pub fn avg_operation_time_ms(&self) -> f64 {
        let ops = self.operations.load(Ordering::Relaxed);
        if ops == 0 {
            0.0
        } else {
            self.total_operation_time_us.load(Ordering::Relaxed) as f64 / ops as f64 / 1000.0
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.evictions,
            &self.compressions,
            &self.predictions,
            &self.promotions,
            &self.operations,
            &self.total_operation_time_us,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_and_latency() {
        let stats = UnifiedCacheStatistics::new();
        assert_eq!(stats.hit_rate(), 0.0);
        stats.record_hit(Duration::from_millis(2));
        stats.record_hit(Duration::from_millis(4));
        stats.record_miss(Duration::from_millis(6));
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-12);
        assert!((stats.avg_operation_time_ms() - 4.0).abs() < 1e-9);

        stats.record_evictions(3);
        assert_eq!(stats.evictions(), 3);
        stats.reset();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.avg_operation_time_ms(), 0.0);
    }
}
