//! Data types for access-pattern learning

use std::collections::VecDeque;

use crate::cache::metadata::IntervalStats;

/// One recorded access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    pub key: String,
    pub timestamp: u64,
}

/// Interval model fitted to one key's recent accesses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyPattern {
    /// Most recent access timestamps, oldest first
    pub recent_accesses: VecDeque<u64>,
    /// Most recent intervals, oldest first
    pub intervals: VecDeque<u64>,
    pub avg_interval: f64,
    pub variance: f64,
    pub access_count: u64,
    /// Forecast produced after the latest access, kept after the prediction is purged
    pub last_forecast: Option<u64>,
}

impl KeyPattern {
    /// Append an access and refit the interval model
    pub fn observe(&mut self, timestamp: u64, max_accesses: usize, max_intervals: usize) {
        if let Some(&previous) = self.recent_accesses.back() {
            self.intervals.push_back(timestamp.saturating_sub(previous));
            while self.intervals.len() > max_intervals {
                self.intervals.pop_front();
            }
        }
        self.recent_accesses.push_back(timestamp);
        while self.recent_accesses.len() > max_accesses {
            self.recent_accesses.pop_front();
        }
        self.access_count += 1;

        let stats = IntervalStats::from_intervals(&self.intervals);
        self.avg_interval = stats.mean;
        self.variance = stats.variance;
    }

    #[inline]
    pub fn last_access(&self) -> Option<u64> {
        self.recent_accesses.back().copied()
    }

    /// `1 / (1 + variance / avg_interval)`
    #[inline]
    pub fn regularity(&self) -> f64 {
        IntervalStats {
            count: self.intervals.len(),
            mean: self.avg_interval,
            variance: self.variance,
        }
        .regularity()
    }

    /// Accesses per second implied by the average interval
    #[inline]
    pub fn frequency(&self) -> f64 {
        if self.avg_interval <= 0.0 {
            0.0
        } else {
            1000.0 / self.avg_interval
        }
    }
}

/// Forecast of a key's next access
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub key: String,
    /// Expected access time in epoch milliseconds
    pub predicted_at: u64,
    /// `frequency × regularity`
    pub priority: f64,
    /// Learned confidence in [0, 1]
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_bounds() {
        let mut pattern = KeyPattern::default();
        for i in 0..30u64 {
            pattern.observe(i * 500, 10, 20);
        }
        assert_eq!(pattern.recent_accesses.len(), 10);
        assert_eq!(pattern.intervals.len(), 20);
        assert_eq!(pattern.avg_interval, 500.0);
        assert_eq!(pattern.regularity(), 1.0);
        assert_eq!(pattern.frequency(), 2.0);
        assert_eq!(pattern.last_access(), Some(29 * 500));
    }
}
