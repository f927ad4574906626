//! Eviction-priority scoring
//!
//! Higher scores mean more valuable entries; the adaptive policy evicts the lowest.

use crate::cache::config::ScoreWeights;

/// Inputs of the priority score, all taken from one metadata snapshot
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub priority: u32,
    pub hit_rate: f64,
    /// Accesses per second of lifetime
    pub access_frequency: f64,
    /// Milliseconds since the last access
    pub idle_ms: u64,
    pub quality: f64,
    pub cost: f64,
}

/// `priority × (w_hit·hit_rate + w_freq·f/(1+f) + w_rec·1/(idle+1) + w_q·quality + w_cost·1/(cost+1))`
pub fn priority_score(inputs: &ScoreInputs, weights: &ScoreWeights) -> f64 {
    let frequency = inputs.access_frequency.max(0.0);
    let normalized_frequency = frequency / (1.0 + frequency);
    let recency = 1.0 / (inputs.idle_ms as f64 + 1.0);
    let cost = 1.0 / (inputs.cost.max(0.0) + 1.0);

    let blended = weights.hit_rate * inputs.hit_rate.clamp(0.0, 1.0)
        + weights.frequency * normalized_frequency
        + weights.recency * recency
        + weights.quality * inputs.quality.clamp(0.0, 1.0)
        + weights.cost * cost;

    f64::from(inputs.priority.max(1)) * blended
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ScoreInputs {
        ScoreInputs {
            priority: 1,
            hit_rate: 1.0,
            access_frequency: 1.0,
            idle_ms: 0,
            quality: 1.0,
            cost: 0.0,
        }
    }

    #[test]
    fn test_score_upper_bound() {
        let weights = ScoreWeights::default();
        // f/(1+f) = 0.5 at one access per second
        let expected = 0.30 + 0.25 * 0.5 + 0.20 + 0.15 + 0.10;
        assert!((priority_score(&inputs(), &weights) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_priority_scales_and_idle_decays() {
        let weights = ScoreWeights::default();
        let base = priority_score(&inputs(), &weights);
        let doubled = priority_score(
            &ScoreInputs {
                priority: 2,
                ..inputs()
            },
            &weights,
        );
        assert!((doubled - 2.0 * base).abs() < 1e-9);

        let idle = priority_score(
            &ScoreInputs {
                idle_ms: 10_000,
                ..inputs()
            },
            &weights,
        );
        assert!(idle < base);
    }
}
