//! Interval statistics and access-pattern classification

use crate::cache::config::PatternThresholds;
use crate::cache::traits::AccessPattern;

/// Mean and population variance of a set of access intervals (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntervalStats {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
}

impl IntervalStats {
    /// Compute statistics over the given intervals
    pub fn from_intervals<'a, I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = &'a u64>,
        I::IntoIter: Clone,
    {
        let iter = intervals.into_iter();
        let count = iter.clone().count();
        if count == 0 {
            return Self::default();
        }

        let mean = iter.clone().map(|&x| x as f64).sum::<f64>() / count as f64;
        let variance = iter
            .map(|&x| {
                let diff = x as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / count as f64;

        Self {
            count,
            mean,
            variance,
        }
    }

    /// Standard deviation relative to the mean
    #[inline]
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean <= 0.0 {
            0.0
        } else {
            self.variance.sqrt() / self.mean
        }
    }

    /// Regularity in (0, 1]: `1 / (1 + variance / mean)`
    #[inline]
    pub fn regularity(&self) -> f64 {
        if self.mean <= 0.0 {
            1.0
        } else {
            1.0 / (1.0 + self.variance / self.mean)
        }
    }
}

/// Classify the latest access
///
/// `gap_ms` is the time since the previous access (absent on the first access) and
/// `prior_accesses` the count before this one.
pub fn classify(
    gap_ms: Option<u64>,
    prior_accesses: u64,
    stats: &IntervalStats,
    thresholds: &PatternThresholds,
) -> AccessPattern {
    let Some(gap) = gap_ms else {
        return AccessPattern::Random;
    };

    if gap < thresholds.burst_window_ms {
        return AccessPattern::Burst;
    }

    let frequent = stats.count > 0 && stats.mean < thresholds.periodic_window_ms as f64;
    if !frequent {
        return AccessPattern::Random;
    }

    let low_variance = stats.coefficient_of_variation() < thresholds.low_variance_cv;
    if prior_accesses >= thresholds.periodic_min_accesses && low_variance {
        AccessPattern::Periodic
    } else if !low_variance {
        AccessPattern::Temporal
    } else {
        // regular but not enough history yet
        AccessPattern::Random
    }
}

/// Forecast the next access time for a classified key
pub fn predict_next(pattern: AccessPattern, last_access: u64, stats: &IntervalStats) -> Option<u64> {
    const BURST_FOLLOW_UP_MS: u64 = 100;

    let avg = stats.mean;
    let offset = match pattern {
        AccessPattern::Burst => return Some(last_access.saturating_add(BURST_FOLLOW_UP_MS)),
        _ if stats.count == 0 => return None,
        AccessPattern::Periodic => avg,
        AccessPattern::Temporal => avg / 2.0,
        AccessPattern::Random => avg * 2.0,
    };
    Some(last_access.saturating_add(offset.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_stats() {
        let intervals = [100u64, 100, 100, 100];
        let stats = IntervalStats::from_intervals(&intervals);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 100.0);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.regularity(), 1.0);

        let irregular = [100u64, 3000];
        let stats = IntervalStats::from_intervals(&irregular);
        assert!(stats.coefficient_of_variation() > 0.5);
        assert!(stats.regularity() < 0.01);
    }

    #[test]
    fn test_classification_rules() {
        let thresholds = PatternThresholds::default();
        let steady = IntervalStats::from_intervals(&[2000u64; 10]);
        let jittery = IntervalStats::from_intervals(&[1200u64, 4800, 1500, 4500]);
        let slow = IntervalStats::from_intervals(&[30_000u64, 31_000]);

        assert_eq!(classify(None, 0, &steady, &thresholds), AccessPattern::Random);
        assert_eq!(
            classify(Some(200), 3, &steady, &thresholds),
            AccessPattern::Burst
        );
        assert_eq!(
            classify(Some(2000), 10, &steady, &thresholds),
            AccessPattern::Periodic
        );
        assert_eq!(
            classify(Some(2000), 4, &steady, &thresholds),
            AccessPattern::Random
        );
        assert_eq!(
            classify(Some(4500), 4, &jittery, &thresholds),
            AccessPattern::Temporal
        );
        assert_eq!(
            classify(Some(31_000), 12, &slow, &thresholds),
            AccessPattern::Random
        );
    }

    #[test]
    fn test_predictions_per_pattern() {
        let stats = IntervalStats::from_intervals(&[2000u64, 2000]);
        assert_eq!(
            predict_next(AccessPattern::Periodic, 10_000, &stats),
            Some(12_000)
        );
        assert_eq!(
            predict_next(AccessPattern::Temporal, 10_000, &stats),
            Some(11_000)
        );
        assert_eq!(
            predict_next(AccessPattern::Random, 10_000, &stats),
            Some(14_000)
        );
        assert_eq!(
            predict_next(AccessPattern::Burst, 10_000, &IntervalStats::default()),
            Some(10_100)
        );
        assert_eq!(
            predict_next(AccessPattern::Random, 10_000, &IntervalStats::default()),
            None
        );
    }
}
