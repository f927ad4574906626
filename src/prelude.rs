//! tiercache prelude - convenient imports for users

pub use crate::smart_cache::{SmartCache, SmartCacheBuilder};

pub use crate::cache::config::{
    CacheConfig, CompressionCodec, ConfigError, TierBackendKind, TierConfig,
};
pub use crate::cache::coordinator::Loader;
pub use crate::cache::manager::strategy::EvictionStrategy;
pub use crate::cache::tier::TierBackend;
pub use crate::cache::traits::{AccessPattern, CacheError, CacheOperationError};
pub use crate::cache::types::{CacheValue, SetOptions, WarmupItem};
pub use crate::telemetry::{CacheStats, PerformanceReport};

// Re-export serde traits used with the typed helpers
pub use serde::{Deserialize, Serialize};
