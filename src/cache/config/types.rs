//! Core configuration types for the tiered cache
//!
//! All structures derive serde so a complete configuration can be loaded from TOML or
//! JSON. Every section implements `Default` with the documented production values and
//! is marked `#[serde(default)]`, so partial files only override what they name.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::manager::strategy::EvictionStrategy;
use crate::cache::traits::CacheOperationError;

/// Storage backend behind a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierBackendKind {
    /// In-process concurrent map
    Memory,
    /// Store owned by a dedicated worker thread
    Worker,
    /// Directory of checksummed record files
    Persistent,
}

/// Limits and backend selection for one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    pub backend: TierBackendKind,
    /// Maximum number of items
    pub max_items: usize,
    /// Maximum stored bytes
    pub max_size: u64,
    /// Directory for persistent tiers; derived from the cache id when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl TierConfig {
    pub fn memory(max_items: usize, max_size: u64) -> Self {
        Self {
            name: "memory".to_string(),
            backend: TierBackendKind::Memory,
            max_items,
            max_size,
            path: None,
        }
    }

    pub fn worker(max_items: usize, max_size: u64) -> Self {
        Self {
            name: "worker".to_string(),
            backend: TierBackendKind::Worker,
            max_items,
            max_size,
            path: None,
        }
    }

    pub fn persistent(max_items: usize, max_size: u64, path: Option<PathBuf>) -> Self {
        Self {
            name: "persistent".to_string(),
            backend: TierBackendKind::Persistent,
            max_items,
            max_size,
            path,
        }
    }

    /// Rename the tier for logs and reports
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Compression codec used for large values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionCodec {
    #[default]
    Lz4,
    RunLength,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Values strictly larger than this are compressed
    pub threshold_bytes: u64,
    pub codec: CompressionCodec,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: 10 * 1024,
            codec: CompressionCodec::Lz4,
        }
    }
}

/// Access-pattern classification thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternThresholds {
    /// Gap below which consecutive accesses count as a burst
    pub burst_window_ms: u64,
    /// Average interval below which access counts as temporal or periodic
    pub periodic_window_ms: u64,
    /// Prior accesses required before PERIODIC is considered
    pub periodic_min_accesses: u64,
    /// Coefficient of variation below which intervals count as regular
    pub low_variance_cv: f64,
    /// Recent intervals kept per item
    pub max_intervals: usize,
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            burst_window_ms: 1_000,
            periodic_window_ms: 5_000,
            periodic_min_accesses: 10,
            low_variance_cv: 0.3,
            max_intervals: 20,
        }
    }
}

/// Weights of the priority score terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub hit_rate: f64,
    pub frequency: f64,
    pub recency: f64,
    pub quality: f64,
    pub cost: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            hit_rate: 0.30,
            frequency: 0.25,
            recency: 0.20,
            quality: 0.15,
            cost: 0.10,
        }
    }
}

impl ScoreWeights {
    #[inline]
    pub fn total(&self) -> f64 {
        self.hit_rate + self.frequency + self.recency + self.quality + self.cost
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub thresholds: PatternThresholds,
    pub weights: ScoreWeights,
}

/// Predictive engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Global access history capacity
    pub history_capacity: usize,
    /// Accesses per key used to fit the interval model
    pub recent_accesses: usize,
    /// Intervals per key feeding the running average and variance
    pub max_intervals: usize,
    /// Forecasts further out than this are not generated
    pub prediction_window_ms: u64,
    pub min_confidence: f64,
    pub learning_rate: f64,
    /// Confidence assigned to unseen keys
    pub initial_confidence: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1_000,
            recent_accesses: 10,
            max_intervals: 20,
            prediction_window_ms: 60_000,
            min_confidence: 0.7,
            learning_rate: 0.1,
            initial_confidence: 0.5,
        }
    }
}

/// Adaptive eviction-policy selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub initial: EvictionStrategy,
    /// Margin a challenger must exceed to replace the incumbent
    pub change_threshold: f64,
    /// Samples required before adaptation
    pub min_samples: usize,
    /// Trailing samples averaged for the incumbent
    pub trailing_window: usize,
    pub history_capacity: usize,
    /// Latency mapped to a zero latency score
    pub max_latency_ms: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            initial: EvictionStrategy::Adaptive,
            change_threshold: 0.1,
            min_samples: 10,
            trailing_window: 10,
            history_capacity: 100,
            max_latency_ms: 100.0,
        }
    }
}

/// Background maintenance and capacity enforcement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub expiry_sweep_interval_ms: u64,
    pub adaptation_interval_ms: u64,
    /// Deadline for every tier call
    pub tier_timeout_ms: u64,
    /// Share of `max_items` evicted when the count limit is hit
    pub capacity_evict_fraction: f64,
    /// Fill ratio size eviction drains down to
    pub size_eviction_target: f64,
    /// Start background tickers when the system is built
    pub background_tasks: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_interval_ms: 60_000,
            adaptation_interval_ms: 30_000,
            tier_timeout_ms: 2_000,
            capacity_evict_fraction: 0.1,
            size_eviction_target: 0.8,
            background_tasks: true,
        }
    }
}

/// Complete cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Identifier used to derive default storage paths
    pub cache_id: String,
    /// Tiers ordered fastest first
    pub tiers: Vec<TierConfig>,
    pub compression: CompressionConfig,
    pub metadata: MetadataConfig,
    pub predictor: PredictorConfig,
    pub strategy: StrategyConfig,
    pub maintenance: MaintenanceConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_id: uuid::Uuid::new_v4().to_string(),
            tiers: vec![
                TierConfig::memory(1_000, 64 * 1024 * 1024),
                TierConfig::worker(10_000, 256 * 1024 * 1024),
            ],
            compression: CompressionConfig::default(),
            metadata: MetadataConfig::default(),
            predictor: PredictorConfig::default(),
            strategy: StrategyConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Configuration favouring a large fast tier and frequent maintenance
    pub fn high_performance() -> Self {
        let mut config = Self::default();
        config.tiers = vec![
            TierConfig::memory(50_000, 512 * 1024 * 1024),
            TierConfig::worker(200_000, 2 * 1024 * 1024 * 1024),
        ];
        config.compression.threshold_bytes = 64 * 1024;
        config.maintenance.expiry_sweep_interval_ms = 15_000;
        config.maintenance.adaptation_interval_ms = 10_000;
        config
    }

    /// Configuration for constrained environments
    pub fn low_memory() -> Self {
        let mut config = Self::default();
        config.tiers = vec![
            TierConfig::memory(256, 8 * 1024 * 1024),
            TierConfig::persistent(10_000, 256 * 1024 * 1024, None),
        ];
        config.compression.threshold_bytes = 4 * 1024;
        config.predictor.history_capacity = 256;
        config
    }

    /// Load configuration from a TOML or JSON file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::JsonParseError(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::TomlParseError(e.to_string()))?
        };

        config.validate()?;
        log::info!(
            "Loaded cache configuration '{}' from {} ({} tiers)",
            config.cache_id,
            path.display(),
            config.tiers.len()
        );
        Ok(config)
    }

    /// Directory for a persistent tier at `level`
    pub fn storage_path_for(&self, level: usize) -> PathBuf {
        match self.tiers.get(level).and_then(|tier| tier.path.clone()) {
            Some(path) => path,
            None => generate_storage_path(&self.cache_id).join(format!("tier-{}", level)),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one tier is required".to_string(),
            ));
        }
        for (level, tier) in self.tiers.iter().enumerate() {
            if tier.max_items == 0 {
                return Err(invalid_field(
                    &format!("tiers[{}].max_items", level),
                    tier.max_items,
                    "must be greater than zero",
                ));
            }
            if tier.max_size == 0 {
                return Err(invalid_field(
                    &format!("tiers[{}].max_size", level),
                    tier.max_size,
                    "must be greater than zero",
                ));
            }
        }

        let thresholds = &self.metadata.thresholds;
        if thresholds.burst_window_ms >= thresholds.periodic_window_ms {
            return Err(invalid_field(
                "metadata.thresholds.burst_window_ms",
                thresholds.burst_window_ms,
                "must be below periodic_window_ms",
            ));
        }
        if !(thresholds.low_variance_cv > 0.0) {
            return Err(invalid_field(
                "metadata.thresholds.low_variance_cv",
                thresholds.low_variance_cv,
                "must be positive",
            ));
        }
        if thresholds.max_intervals == 0 {
            return Err(invalid_field(
                "metadata.thresholds.max_intervals",
                thresholds.max_intervals,
                "must be greater than zero",
            ));
        }

        let weights = &self.metadata.weights;
        let all_weights = [
            weights.hit_rate,
            weights.frequency,
            weights.recency,
            weights.quality,
            weights.cost,
        ];
        if all_weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.total() <= 0.0 {
            return Err(ConfigError::ValidationError(
                "score weights must be non-negative with a positive sum".to_string(),
            ));
        }

        let predictor = &self.predictor;
        for (field, value) in [
            ("predictor.min_confidence", predictor.min_confidence),
            ("predictor.initial_confidence", predictor.initial_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid_field(field, value, "must be within [0, 1]"));
            }
        }
        if !(predictor.learning_rate > 0.0 && predictor.learning_rate <= 1.0) {
            return Err(invalid_field(
                "predictor.learning_rate",
                predictor.learning_rate,
                "must be within (0, 1]",
            ));
        }
        if predictor.history_capacity == 0
            || predictor.recent_accesses < 2
            || predictor.max_intervals == 0
            || predictor.prediction_window_ms == 0
        {
            return Err(ConfigError::ValidationError(
                "predictor capacities and window must be positive (recent_accesses >= 2)"
                    .to_string(),
            ));
        }

        let strategy = &self.strategy;
        if !(strategy.change_threshold >= 0.0) {
            return Err(invalid_field(
                "strategy.change_threshold",
                strategy.change_threshold,
                "must be non-negative",
            ));
        }
        if strategy.trailing_window == 0 || strategy.history_capacity < strategy.trailing_window
        {
            return Err(ConfigError::ValidationError(
                "strategy.history_capacity must hold at least trailing_window samples"
                    .to_string(),
            ));
        }
        if !(strategy.max_latency_ms > 0.0) {
            return Err(invalid_field(
                "strategy.max_latency_ms",
                strategy.max_latency_ms,
                "must be positive",
            ));
        }

        let maintenance = &self.maintenance;
        if maintenance.expiry_sweep_interval_ms == 0
            || maintenance.adaptation_interval_ms == 0
            || maintenance.tier_timeout_ms == 0
        {
            return Err(ConfigError::ValidationError(
                "maintenance intervals and tier timeout must be positive".to_string(),
            ));
        }
        for (field, value) in [
            (
                "maintenance.capacity_evict_fraction",
                maintenance.capacity_evict_fraction,
            ),
            (
                "maintenance.size_eviction_target",
                maintenance.size_eviction_target,
            ),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid_field(field, value, "must be within (0, 1]"));
            }
        }

        Ok(())
    }
}

fn invalid_field(field: &str, value: impl std::fmt::Display, reason: &str) -> ConfigError {
    ConfigError::InvalidFieldValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration error types
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    FileNotFound(String),
    FileReadError(String),
    TomlParseError(String),
    JsonParseError(String),
    ValidationError(String),
    InvalidFieldValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Configuration file not found: {}", path),
            ConfigError::FileReadError(msg) => {
                write!(f, "Failed to read configuration file: {}", msg)
            }
            ConfigError::TomlParseError(msg) => write!(f, "TOML parsing error: {}", msg),
            ConfigError::JsonParseError(msg) => write!(f, "JSON parsing error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
            ConfigError::InvalidFieldValue {
                field,
                value,
                reason,
            } => write!(
                f,
                "Invalid value '{}' for field '{}': {}",
                value, field, reason
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for CacheOperationError {
    fn from(error: ConfigError) -> Self {
        CacheOperationError::InvalidConfiguration(error.to_string())
    }
}

/// Sanitize cache_id for safe filesystem usage
pub fn sanitize_cache_id(cache_id: &str) -> String {
    let sanitized = cache_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string();

    if sanitized.is_empty() {
        "cache".to_string()
    } else {
        sanitized
    }
}

/// Platform cache directory for a cache id
///
/// Uses `XDG_CACHE_HOME`, then `$HOME/.cache` (`$HOME/Library/Caches` on macOS),
/// then the working directory.
pub fn generate_storage_path(cache_id: &str) -> PathBuf {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|home| {
                if cfg!(target_os = "macos") {
                    Path::new(&home).join("Library").join("Caches")
                } else {
                    Path::new(&home).join(".cache")
                }
            })
        })
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("tiercache").join(sanitize_cache_id(cache_id))
}
