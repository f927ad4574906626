//! Cache configuration system with production-ready defaults

pub mod types;

pub use types::{
    CacheConfig, CompressionCodec, CompressionConfig, ConfigError, MaintenanceConfig,
    MetadataConfig, PatternThresholds, PredictorConfig, ScoreWeights, StrategyConfig,
    TierBackendKind, TierConfig, generate_storage_path, sanitize_cache_id,
};
