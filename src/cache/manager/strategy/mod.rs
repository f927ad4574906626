//! Eviction-strategy selection and adaptation
//!
//! Performance samples feed per-strategy estimates; a switcher with hysteresis decides
//! when a challenger should replace the active strategy.

pub mod core;
pub mod metrics;
pub mod switcher;
pub mod thresholds;

pub use self::core::{AdaptiveCacheStrategy, EvictionStrategy};
pub use metrics::{PerformanceSample, StrategyMetrics, StrategyStats, performance_score};
pub use switcher::{StrategySwitcher, SwitchEvaluation};
pub use thresholds::StrategyThresholds;
