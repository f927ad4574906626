//! Switching thresholds for eviction-strategy adaptation

use crate::cache::config::StrategyConfig;

/// Hysteresis parameters for strategy switching
#[derive(Debug, Clone, Copy)]
pub struct StrategyThresholds {
    /// Margin a challenger must exceed
    change_threshold: f64,
    /// Samples of the incumbent required before evaluation
    min_samples: usize,
    /// Incumbent samples averaged
    trailing_window: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self::from_config(&StrategyConfig::default())
    }
}

impl StrategyThresholds {
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            change_threshold: config.change_threshold.max(0.0),
            min_samples: config.min_samples,
            trailing_window: config.trailing_window.max(1),
        }
    }

    /// Switch only when the challenger beats the incumbent by more than the threshold
    #[inline(always)]
    pub fn should_switch(&self, current_score: f64, alternative_score: f64) -> bool {
        alternative_score - current_score > self.change_threshold
    }

    #[inline(always)]
    pub fn has_enough_samples(&self, samples: usize) -> bool {
        samples >= self.min_samples
    }

    #[inline(always)]
    pub fn trailing_window(&self) -> usize {
        self.trailing_window
    }

    #[inline(always)]
    pub fn change_threshold(&self) -> f64 {
        self.change_threshold
    }
}
