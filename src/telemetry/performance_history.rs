//! Rolling performance history with a fixed-capacity circular buffer

use arrayvec::ArrayVec;

use super::types::HitRateSample;

/// Number of samples retained
pub const HISTORY_CAPACITY: usize = 1024;

/// Bounded history of periodic performance samples, oldest first
#[derive(Debug, Default)]
pub struct PerformanceHistory {
    samples: ArrayVec<HitRateSample, HISTORY_CAPACITY>,
}

impl PerformanceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, dropping the oldest when full
    pub fn add_sample(&mut self, sample: HitRateSample) {
        if self.samples.is_full() {
            self.samples.remove(0);
        }
        self.samples.push(sample);
    }

    /// Most recent `count` samples, oldest first
    pub fn recent(&self, count: usize) -> Vec<HitRateSample> {
        let start = self.samples.len().saturating_sub(count);
        self.samples[start..].to_vec()
    }

    pub fn latest(&self) -> Option<&HitRateSample> {
        self.samples.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::manager::strategy::EvictionStrategy;

    fn sample(timestamp: u64) -> HitRateSample {
        HitRateSample {
            timestamp,
            hit_rate: 0.5,
            avg_latency_ms: 1.0,
            memory_usage: 0.1,
            strategy: EvictionStrategy::Adaptive,
        }
    }

    #[test]
    fn test_circular_behaviour() {
        let mut history = PerformanceHistory::new();
        for ts in 0..(HISTORY_CAPACITY as u64 + 10) {
            history.add_sample(sample(ts));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let recent = history.recent(3);
        let stamps: Vec<u64> = recent.iter().map(|s| s.timestamp).collect();
        let last = HISTORY_CAPACITY as u64 + 9;
        assert_eq!(stamps, vec![last - 2, last - 1, last]);
        assert_eq!(history.latest().map(|s| s.timestamp), Some(last));
    }
}
