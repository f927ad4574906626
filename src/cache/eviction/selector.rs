//! Eviction candidate ordering per strategy
//!
//! LRU orders by ascending last access, LFU by ascending access count, TTL puts expired
//! entries first and falls back to LRU, and ADAPTIVE orders by ascending priority score.

use std::cmp::Ordering;

use crate::cache::config::ScoreWeights;
use crate::cache::manager::strategy::EvictionStrategy;
use crate::cache::metadata::CacheMetadata;

/// Entry considered for eviction
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionCandidate {
    pub key: String,
    /// Bytes released if evicted
    pub stored_size: u64,
    pub metadata: CacheMetadata,
}

impl EvictionCandidate {
    pub fn new(key: impl Into<String>, stored_size: u64, metadata: CacheMetadata) -> Self {
        Self {
            key: key.into(),
            stored_size,
            metadata,
        }
    }
}

/// Orders candidates so the first one is the first to evict
#[derive(Debug, Clone, Copy)]
pub struct EvictionSelector {
    strategy: EvictionStrategy,
    now: u64,
    weights: ScoreWeights,
}

impl EvictionSelector {
    pub fn new(strategy: EvictionStrategy, now: u64, weights: ScoreWeights) -> Self {
        Self {
            strategy,
            now,
            weights,
        }
    }

    #[inline]
    pub fn strategy(&self) -> EvictionStrategy {
        self.strategy
    }

    /// Compare two entries; `Less` evicts first
    pub fn compare(&self, a: &CacheMetadata, b: &CacheMetadata) -> Ordering {
        let lru = |a: &CacheMetadata, b: &CacheMetadata| a.last_access_time.cmp(&b.last_access_time);

        match self.strategy {
            EvictionStrategy::Lru => lru(a, b),
            EvictionStrategy::Lfu => a.access_count.cmp(&b.access_count).then_with(|| lru(a, b)),
            EvictionStrategy::Ttl => {
                let a_expired = a.is_expired_at(self.now);
                let b_expired = b.is_expired_at(self.now);
                b_expired.cmp(&a_expired).then_with(|| lru(a, b))
            }
            EvictionStrategy::Adaptive => a
                .priority_score_at(self.now, &self.weights)
                .total_cmp(&b.priority_score_at(self.now, &self.weights))
                .then_with(|| lru(a, b)),
        }
    }

    /// Sort candidates in eviction order, ties broken by key
    pub fn rank(&self, candidates: &mut [EvictionCandidate]) {
        candidates.sort_by(|a, b| {
            self.compare(&a.metadata, &b.metadata)
                .then_with(|| a.key.cmp(&b.key))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::config::PatternThresholds;

    fn candidate(key: &str, last_access: u64, accesses: u64) -> EvictionCandidate {
        let thresholds = PatternThresholds::default();
        let mut meta = CacheMetadata::new_at(10, 1, 0);
        for i in 0..accesses {
            meta.record_access_at(true, last_access - (accesses - 1 - i) * 10_000, &thresholds);
        }
        EvictionCandidate::new(key, 10, meta)
    }

    fn order(strategy: EvictionStrategy, mut candidates: Vec<EvictionCandidate>) -> Vec<String> {
        EvictionSelector::new(strategy, 1_000_000, ScoreWeights::default()).rank(&mut candidates);
        candidates.into_iter().map(|c| c.key).collect()
    }

    #[test]
    fn test_lru_and_lfu_orders() {
        let entries = vec![
            candidate("recent-rare", 900_000, 1),
            candidate("old-frequent", 500_000, 30),
            candidate("middle", 700_000, 5),
        ];
        assert_eq!(
            order(EvictionStrategy::Lru, entries.clone()),
            ["old-frequent", "middle", "recent-rare"]
        );
        assert_eq!(
            order(EvictionStrategy::Lfu, entries),
            ["recent-rare", "middle", "old-frequent"]
        );
    }

    #[test]
    fn test_ttl_puts_expired_first() {
        let mut expired = candidate("expired", 950_000, 2);
        expired.metadata.expires_at = Some(999_999);
        let live = candidate("live", 100_000, 2);
        assert_eq!(
            order(EvictionStrategy::Ttl, vec![live, expired]),
            ["expired", "live"]
        );
    }

    #[test]
    fn test_adaptive_uses_priority_score() {
        let mut important = candidate("important", 100_000, 2);
        important.metadata.priority = 10;
        let plain = candidate("plain", 100_000, 2);
        assert_eq!(
            order(EvictionStrategy::Adaptive, vec![important, plain]),
            ["plain", "important"]
        );
    }
}
