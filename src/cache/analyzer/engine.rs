//! Predictive engine: learns per-key access intervals and forecasts next accesses

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;

use super::confidence::ConfidenceTracker;
use super::types::{AccessEvent, KeyPattern, Prediction};
use crate::cache::config::PredictorConfig;

#[derive(Debug, Default)]
struct History {
    events: VecDeque<AccessEvent>,
    /// Events per key currently held in `events`
    per_key: HashMap<String, usize>,
}

/// Access-pattern learner and next-access forecaster
#[derive(Debug)]
pub struct PredictiveCacheEngine {
    config: PredictorConfig,
    history: Mutex<History>,
    patterns: DashMap<String, KeyPattern>,
    predictions: DashMap<String, Prediction>,
    confidence: ConfidenceTracker,
}

impl Default for PredictiveCacheEngine {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl PredictiveCacheEngine {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            history: Mutex::new(History::default()),
            patterns: DashMap::new(),
            predictions: DashMap::new(),
            confidence: ConfidenceTracker::new(config.initial_confidence, config.learning_rate),
            config,
        }
    }

    /// Record an access and regenerate forecasts
    ///
    /// Keys whose last event leaves the bounded history are forgotten entirely.
    pub fn record_access(&self, key: &str, timestamp: u64) {
        let dropped = self.append_history(key, timestamp);
        for stale in dropped {
            self.patterns.remove(&stale);
            self.predictions.remove(&stale);
            self.confidence.remove(&stale);
            log::trace!("Forgot access pattern for '{}'", stale);
        }

        {
            let mut pattern = self.patterns.entry(key.to_string()).or_default();
            pattern.observe(
                timestamp,
                self.config.recent_accesses,
                self.config.max_intervals,
            );
            pattern.last_forecast = self.forecast(&pattern);
        }

        self.regenerate_predictions(timestamp);
    }

    fn append_history(&self, key: &str, timestamp: u64) -> Vec<String> {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.events.push_back(AccessEvent {
            key: key.to_string(),
            timestamp,
        });
        *history.per_key.entry(key.to_string()).or_insert(0) += 1;

        let mut dropped = Vec::new();
        while history.events.len() > self.config.history_capacity {
            let Some(evicted) = history.events.pop_front() else {
                break;
            };
            if let Some(count) = history.per_key.get_mut(&evicted.key) {
                *count -= 1;
                if *count == 0 {
                    history.per_key.remove(&evicted.key);
                    dropped.push(evicted.key);
                }
            }
        }
        dropped
    }

    #[inline]
    fn forecast(&self, pattern: &KeyPattern) -> Option<u64> {
        if pattern.intervals.is_empty() || pattern.avg_interval <= 0.0 {
            return None;
        }
        let last = pattern.last_access()?;
        Some(last.saturating_add(pattern.avg_interval.round() as u64))
    }

    fn regenerate_predictions(&self, now: u64) {
        let window = self.config.prediction_window_ms;
        let forecasts: Vec<(String, Option<(u64, f64)>)> = self
            .patterns
            .iter()
            .map(|entry| {
                let pattern = entry.value();
                let forecast = self
                    .forecast(pattern)
                    .filter(|&at| at >= now && at - now <= window)
                    .map(|at| (at, pattern.frequency() * pattern.regularity()));
                (entry.key().clone(), forecast)
            })
            .collect();

        for (key, forecast) in forecasts {
            match forecast {
                Some((predicted_at, priority)) => {
                    let confidence = self.confidence.get(&key);
                    self.predictions.insert(
                        key.clone(),
                        Prediction {
                            key,
                            predicted_at,
                            priority,
                            confidence,
                        },
                    );
                }
                None => {
                    self.predictions.remove(&key);
                }
            }
        }

        self.predictions.retain(|_, p| p.predicted_at >= now);
    }

    /// Due forecasts with confidence at or above `min_confidence`, most confident first
    pub fn get_predictions(&self, now: u64) -> Vec<Prediction> {
        self.predictions.retain(|_, p| p.predicted_at >= now);

        let mut ready: Vec<Prediction> = self
            .predictions
            .iter()
            .filter_map(|entry| {
                let confidence = self.confidence.get(entry.key());
                (confidence >= self.config.min_confidence).then(|| Prediction {
                    confidence,
                    ..entry.value().clone()
                })
            })
            .collect();

        ready.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| b.priority.total_cmp(&a.priority))
                .then_with(|| a.key.cmp(&b.key))
        });
        ready
    }

    /// Score the latest forecast for `key` against the observed access time
    ///
    /// Returns the updated confidence, or `None` when no forecast exists.
    pub fn validate_prediction(&self, key: &str, actual: u64) -> Option<f64> {
        let forecast = self
            .predictions
            .get(key)
            .map(|p| p.predicted_at)
            .or_else(|| self.patterns.get(key).and_then(|p| p.last_forecast))?;

        let error = actual.abs_diff(forecast) as f64;
        let window = self.config.prediction_window_ms.max(1) as f64;
        let accuracy = (1.0 - error / window).max(0.0);
        let confidence = self.confidence.update(key, accuracy);

        if let Some(mut prediction) = self.predictions.get_mut(key) {
            prediction.confidence = confidence;
        }
        log::trace!(
            "Prediction for '{}' off by {}ms, confidence now {:.3}",
            key,
            error,
            confidence
        );
        Some(confidence)
    }

    /// Learned confidence for a key
    #[inline]
    pub fn confidence(&self, key: &str) -> f64 {
        self.confidence.get(key)
    }

    /// Snapshot of a key's interval model
    pub fn pattern(&self, key: &str) -> Option<KeyPattern> {
        self.patterns.get(key).map(|p| p.value().clone())
    }

    /// Number of live forecasts regardless of confidence
    #[inline]
    pub fn prediction_count(&self) -> usize {
        self.predictions.len()
    }

    pub fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .len()
    }

    #[inline]
    pub fn tracked_keys(&self) -> usize {
        self.patterns.len()
    }

    pub fn clear(&self) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.events.clear();
        history.per_key.clear();
        self.patterns.clear();
        self.predictions.clear();
        self.confidence.clear();
    }
}
