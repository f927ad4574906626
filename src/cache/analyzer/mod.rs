//! Access-pattern learning and next-access prediction
//!
//! The engine keeps a bounded global access history, fits an interval model per key,
//! and forecasts when each key will be needed next. Forecast quality is learned per key
//! and gates which forecasts are handed to the prefetcher.

pub mod confidence;
pub mod engine;
pub mod types;

pub use engine::PredictiveCacheEngine;
pub use types::{AccessEvent, KeyPattern, Prediction};
