//! Value, option and time types shared across the cache

pub mod options;
pub mod timestamp;
pub mod value;

pub use options::{SetOptions, WarmupItem};
pub use timestamp::{duration_millis, now_millis};
pub use value::{CacheValue, ValueKind};
