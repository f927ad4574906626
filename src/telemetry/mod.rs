//! Cache telemetry
//!
//! Lock-free counters, a rolling performance history and the serializable snapshots
//! returned by `stats()` and `performance_report()`.

pub mod performance_history;
pub mod types;
pub mod unified_stats;

pub use performance_history::PerformanceHistory;
pub use types::{CacheStats, HitRateSample, KeyUsage, PerformanceReport, TierDistribution};
pub use unified_stats::UnifiedCacheStatistics;
