//! Strategy performance samples and per-strategy estimates

use std::collections::VecDeque;

use super::core::EvictionStrategy;

/// One observation of cache performance under a strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSample {
    pub strategy: EvictionStrategy,
    pub hit_rate: f64,
    pub latency_ms: f64,
    pub memory_usage: f64,
    /// Combined score in [0, 1]
    pub score: f64,
}

/// Tracked weight and performance estimate of one strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyStats {
    pub weight: f64,
    pub performance: f64,
}

impl Default for StrategyStats {
    fn default() -> Self {
        Self {
            weight: 1.0,
            performance: 0.5,
        }
    }
}

impl StrategyStats {
    #[inline(always)]
    pub fn weighted(&self) -> f64 {
        self.weight * self.performance
    }
}

/// `0.5·hit_rate + 0.3·(1 − latency/max_latency) + 0.2·(1 − memory_usage)`, each term clamped
pub fn performance_score(hit_rate: f64, latency_ms: f64, memory_usage: f64, max_latency_ms: f64) -> f64 {
    let unit = |x: f64| if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
    let latency_ratio = if max_latency_ms > 0.0 {
        latency_ms / max_latency_ms
    } else {
        1.0
    };
    0.5 * unit(hit_rate) + 0.3 * unit(1.0 - latency_ratio) + 0.2 * unit(1.0 - memory_usage)
}

/// Bounded sample history shared by every strategy
#[derive(Debug)]
pub struct StrategyMetrics {
    samples: VecDeque<PerformanceSample>,
    capacity: usize,
    stats: [StrategyStats; EvictionStrategy::COUNT],
}

impl StrategyMetrics {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            stats: [StrategyStats::default(); EvictionStrategy::COUNT],
        }
    }

    /// Append a sample and refresh its strategy's estimate from the trailing window
    pub fn push(&mut self, sample: PerformanceSample, trailing_window: usize) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        if let Some(avg) = self.trailing_average(sample.strategy, trailing_window) {
            self.stats[sample.strategy.index()].performance = avg;
        }
    }

    /// Mean score of the last `window` samples recorded under `strategy`
    pub fn trailing_average(&self, strategy: EvictionStrategy, window: usize) -> Option<f64> {
        let (sum, count) = self
            .samples
            .iter()
            .rev()
            .filter(|s| s.strategy == strategy)
            .take(window.max(1))
            .fold((0.0, 0usize), |(sum, count), s| (sum + s.score, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn sample_count(&self, strategy: EvictionStrategy) -> usize {
        self.samples.iter().filter(|s| s.strategy == strategy).count()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline(always)]
    pub fn stats(&self, strategy: EvictionStrategy) -> StrategyStats {
        self.stats[strategy.index()]
    }

    pub fn set_weight(&mut self, strategy: EvictionStrategy, weight: f64) {
        self.stats[strategy.index()].weight = weight.max(0.0);
    }

    pub fn latest(&self) -> Option<&PerformanceSample> {
        self.samples.back()
    }
}
