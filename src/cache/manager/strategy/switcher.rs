//! Strategy switching decision with hysteresis

use super::core::EvictionStrategy;
use super::metrics::StrategyMetrics;
use super::thresholds::StrategyThresholds;

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchEvaluation {
    pub incumbent: EvictionStrategy,
    pub incumbent_score: f64,
    pub best_alternative: EvictionStrategy,
    pub alternative_score: f64,
}

#[derive(Debug, Default)]
pub struct StrategySwitcher;

impl StrategySwitcher {
    /// Compare the incumbent's trailing performance with the best weighted alternative
    ///
    /// Returns `None` while the incumbent has too few samples.
    pub fn evaluate(
        &self,
        current: EvictionStrategy,
        metrics: &StrategyMetrics,
        thresholds: &StrategyThresholds,
    ) -> Option<SwitchEvaluation> {
        if !thresholds.has_enough_samples(metrics.sample_count(current)) {
            return None;
        }
        let incumbent_score = metrics.trailing_average(current, thresholds.trailing_window())?;

        let (best_alternative, alternative_score) = EvictionStrategy::ALL
            .iter()
            .copied()
            .filter(|&s| s != current)
            .map(|s| (s, metrics.stats(s).weighted()))
            .fold((current, f64::MIN), |best, candidate| {
                if candidate.1 > best.1 { candidate } else { best }
            });

        Some(SwitchEvaluation {
            incumbent: current,
            incumbent_score,
            best_alternative,
            alternative_score,
        })
    }

    /// Strategy to switch to, if any challenger clears the threshold
    pub fn evaluate_switch(
        &self,
        current: EvictionStrategy,
        metrics: &StrategyMetrics,
        thresholds: &StrategyThresholds,
    ) -> Option<EvictionStrategy> {
        let evaluation = self.evaluate(current, metrics, thresholds)?;
        thresholds
            .should_switch(evaluation.incumbent_score, evaluation.alternative_score)
            .then_some(evaluation.best_alternative)
    }
}
