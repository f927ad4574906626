//! Per-entry access metadata
//!
//! Every tier copy of an entry owns one `CacheMetadata`: counters, timestamps, tags,
//! the classified access pattern and the forecast of its next access. The metadata is
//! bincode-encodable so the persistent tier stores it alongside the payload.

pub mod pattern;
pub mod scoring;

use std::collections::{BTreeSet, VecDeque};

use crate::cache::config::{PatternThresholds, ScoreWeights};
use crate::cache::traits::AccessPattern;
use crate::cache::types::now_millis;

pub use pattern::IntervalStats;
pub use scoring::ScoreInputs;

/// Access statistics and scheduling hints for one cached entry
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct CacheMetadata {
    /// Logical size in bytes
    pub size: u64,
    /// Caller weight, at least 1
    pub priority: u32,
    pub access_count: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub created_at: u64,
    pub last_access_time: u64,
    pub last_update_time: u64,
    /// Absolute expiry in epoch milliseconds
    pub expires_at: Option<u64>,
    pub tags: BTreeSet<String>,
    /// Keys this entry was derived from
    pub dependencies: BTreeSet<String>,
    pub access_pattern: AccessPattern,
    pub predicted_next_access: Option<u64>,
    /// Stored size over original size, 1.0 when uncompressed
    pub compression_ratio: f64,
    pub cost_score: f64,
    pub quality_score: f64,
    /// Seconds between the last update and the last access
    pub staleness: f64,
    recent_intervals: VecDeque<u64>,
}

impl CacheMetadata {
    /// Fresh metadata for an entry created now
    pub fn new(size: u64, priority: u32) -> Self {
        Self::new_at(size, priority, now_millis())
    }

    /// Fresh metadata for an entry created at `now`
    pub fn new_at(size: u64, priority: u32, now: u64) -> Self {
        Self {
            size,
            priority: priority.max(1),
            access_count: 0,
            hit_count: 0,
            miss_count: 0,
            created_at: now,
            last_access_time: now,
            last_update_time: now,
            expires_at: None,
            tags: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            access_pattern: AccessPattern::Random,
            predicted_next_access: None,
            compression_ratio: 1.0,
            cost_score: 0.0,
            quality_score: 1.0,
            staleness: 0.0,
            recent_intervals: VecDeque::new(),
        }
    }

    /// Record an access at the current time with default thresholds
    pub fn record_access(&mut self, hit: bool) {
        self.record_access_at(hit, now_millis(), &PatternThresholds::default());
    }

    /// Record an access at `now`, reclassify the pattern and refresh the forecast
    pub fn record_access_at(&mut self, hit: bool, now: u64, thresholds: &PatternThresholds) {
        let prior_accesses = self.access_count;
        let gap = (prior_accesses > 0).then(|| now.saturating_sub(self.last_access_time));

        if let Some(gap) = gap {
            self.recent_intervals.push_back(gap);
            while self.recent_intervals.len() > thresholds.max_intervals.max(1) {
                self.recent_intervals.pop_front();
            }
        }

        self.access_count += 1;
        if hit {
            self.hit_count += 1;
        } else {
            self.miss_count += 1;
        }
        self.last_access_time = now;
        self.staleness = now.saturating_sub(self.last_update_time) as f64 / 1000.0;

        let stats = self.interval_stats();
        self.access_pattern = pattern::classify(gap, prior_accesses, &stats, thresholds);
        self.predicted_next_access = pattern::predict_next(self.access_pattern, now, &stats);
    }

    /// Mark the payload as rewritten at `now`
    pub fn mark_updated(&mut self, size: u64, now: u64) {
        self.size = size;
        self.last_update_time = now;
        self.staleness = 0.0;
    }

    /// Statistics over the recent access intervals
    #[inline]
    pub fn interval_stats(&self) -> IntervalStats {
        IntervalStats::from_intervals(&self.recent_intervals)
    }

    /// Hit count over access count, 0 without accesses
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        if self.access_count == 0 {
            0.0
        } else {
            self.hit_count as f64 / self.access_count as f64
        }
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Expired when an expiry is set and `now` is past it
    #[inline]
    pub fn is_expired_at(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    /// Set the expiry relative to the creation time
    pub fn set_ttl_ms(&mut self, ttl_ms: u64) {
        self.expires_at = Some(self.created_at.saturating_add(ttl_ms));
    }

    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn priority_score(&self) -> f64 {
        self.priority_score_at(now_millis(), &ScoreWeights::default())
    }

    /// Eviction value at `now`; higher is more valuable
    pub fn priority_score_at(&self, now: u64, weights: &ScoreWeights) -> f64 {
        let age_secs = (now.saturating_sub(self.created_at) as f64 / 1000.0).max(1.0);
        let inputs = ScoreInputs {
            priority: self.priority,
            hit_rate: self.hit_rate(),
            access_frequency: self.access_count as f64 / age_secs,
            idle_ms: now.saturating_sub(self.last_access_time),
            quality: self.quality_score,
            cost: self.cost_score,
        };
        scoring::priority_score(&inputs, weights)
    }
}
