//! Per-key prediction confidence
//!
//! Confidence moves toward the measured accuracy of each validated forecast by
//! `learning_rate` and is always clamped to [0, 1].

use dashmap::DashMap;

#[derive(Debug)]
pub struct ConfidenceTracker {
    confidences: DashMap<String, f64>,
    initial: f64,
    learning_rate: f64,
}

impl ConfidenceTracker {
    pub fn new(initial: f64, learning_rate: f64) -> Self {
        Self {
            confidences: DashMap::new(),
            initial: initial.clamp(0.0, 1.0),
            learning_rate: learning_rate.clamp(0.0, 1.0),
        }
    }

    /// Confidence for a key; unseen keys report the initial value
    #[inline]
    pub fn get(&self, key: &str) -> f64 {
        self.confidences
            .get(key)
            .map(|entry| *entry.value())
            .unwrap_or(self.initial)
    }

    /// Move confidence toward `accuracy` and return the new value
    pub fn update(&self, key: &str, accuracy: f64) -> f64 {
        let accuracy = if accuracy.is_nan() {
            0.0
        } else {
            accuracy.clamp(0.0, 1.0)
        };
        let mut entry = self
            .confidences
            .entry(key.to_string())
            .or_insert(self.initial);
        let current = *entry.value();
        let updated = (current + self.learning_rate * (accuracy - current)).clamp(0.0, 1.0);
        *entry.value_mut() = updated;
        updated
    }

    pub fn remove(&self, key: &str) {
        self.confidences.remove(key);
    }

    pub fn clear(&self) {
        self.confidences.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.confidences.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.confidences.is_empty()
    }
}
