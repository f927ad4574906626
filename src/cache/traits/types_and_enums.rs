//! Type definitions, enums, and error taxonomy for the cache system
//!
//! This module contains the shared enumerations used across metadata, eviction and
//! orchestration, plus the canonical `CacheOperationError` every fallible operation
//! returns.

use serde::{Deserialize, Serialize};

/// Classification of a key's access history
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub enum AccessPattern {
    /// No exploitable structure
    #[default]
    Random,
    /// Back-to-back accesses inside the burst window
    Burst,
    /// Frequent but irregular accesses
    Temporal,
    /// Regular, low-variance accesses
    Periodic,
}

impl AccessPattern {
    /// Stable name for logs and reports
    #[inline(always)]
    pub const fn name(self) -> &'static str {
        match self {
            AccessPattern::Random => "random",
            AccessPattern::Burst => "burst",
            AccessPattern::Temporal => "temporal",
            AccessPattern::Periodic => "periodic",
        }
    }
}

/// Why an item left a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Tier item count reached `max_items`
    CapacityLimit,
    /// Tier byte budget would be exceeded
    MemoryPressure,
    /// TTL elapsed
    Expired,
    /// Explicit delete or tag invalidation
    Manual,
}

impl EvictionReason {
    #[inline(always)]
    pub const fn as_str(self) -> &'static str {
        match self {
            EvictionReason::CapacityLimit => "capacity",
            EvictionReason::MemoryPressure => "memory",
            EvictionReason::Expired => "expired",
            EvictionReason::Manual => "manual",
        }
    }
}

/// Error category for classification and recovery planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Capacity and memory budget problems
    Resource,
    /// Backend I/O and availability problems
    Io,
    /// Encoding, decoding and compression problems
    Serialization,
    /// Invalid settings or programmer errors
    Configuration,
    /// Deadlines exceeded
    Timing,
    /// External loader failures
    Loader,
}

/// Recovery hint for cache operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Evict and retry the operation
    ClearAndRetry,
    /// Retry with exponential backoff
    RetryBackoff,
    /// Fall back to an alternative (raw storage, next tier, no prediction)
    Fallback,
    /// Fix configuration and rebuild the cache
    Restart,
    /// Programmer error, no recovery possible
    Fatal,
}

/// Canonical error type for every cache operation
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOperationError {
    /// Tier index outside the configured hierarchy
    UnknownTier(usize),
    /// Compression codec rejected the input
    CompressionFailed(String),
    /// Value could not be encoded
    SerializationError(String),
    /// Stored bytes could not be decoded
    DeserializationError(String),
    /// Backend refused or could not serve the call
    TierUnavailable(String),
    /// Tier call exceeded its deadline
    TimeoutError(String),
    /// Item cannot fit into the target tier
    CapacityExceeded { required: u64, available: u64 },
    /// Prefetch loader failed for a key
    LoaderFailed(String),
    /// Persistent storage I/O failure
    Io(String),
    /// Invalid configuration value
    InvalidConfiguration(String),
}

impl std::fmt::Display for CacheOperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheOperationError::UnknownTier(level) => write!(f, "Unknown tier: {}", level),
            CacheOperationError::CompressionFailed(msg) => {
                write!(f, "Compression failed: {}", msg)
            }
            CacheOperationError::SerializationError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            CacheOperationError::DeserializationError(msg) => {
                write!(f, "Deserialization error: {}", msg)
            }
            CacheOperationError::TierUnavailable(msg) => write!(f, "Tier unavailable: {}", msg),
            CacheOperationError::TimeoutError(msg) => write!(f, "Operation timed out: {}", msg),
            CacheOperationError::CapacityExceeded {
                required,
                available,
            } => write!(
                f,
                "Capacity exceeded: {} bytes required, {} available",
                required, available
            ),
            CacheOperationError::LoaderFailed(msg) => write!(f, "Loader failed: {}", msg),
            CacheOperationError::Io(msg) => write!(f, "I/O error: {}", msg),
            CacheOperationError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for CacheOperationError {}

impl From<std::io::Error> for CacheOperationError {
    fn from(error: std::io::Error) -> Self {
        CacheOperationError::Io(error.to_string())
    }
}

impl CacheOperationError {
    /// Create tier unavailable error
    #[inline(always)]
    pub fn tier_unavailable(msg: impl Into<String>) -> Self {
        Self::TierUnavailable(msg.into())
    }

    /// Create timeout error
    #[inline(always)]
    pub fn timed_out(msg: impl Into<String>) -> Self {
        Self::TimeoutError(msg.into())
    }

    /// Create serialization error
    #[inline(always)]
    pub fn serialization_failed(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create deserialization error
    #[inline(always)]
    pub fn deserialization_failed(msg: impl Into<String>) -> Self {
        Self::DeserializationError(msg.into())
    }

    /// Create compression error
    #[inline(always)]
    pub fn compression_failed(msg: impl Into<String>) -> Self {
        Self::CompressionFailed(msg.into())
    }

    /// Create IO error
    #[inline(always)]
    pub fn io_failed(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create loader error
    #[inline(always)]
    pub fn loader_failed(msg: impl Into<String>) -> Self {
        Self::LoaderFailed(msg.into())
    }

    /// Create configuration error
    #[inline(always)]
    pub fn configuration_error(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Error category for efficient classification
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownTier(_) | Self::InvalidConfiguration(_) => ErrorCategory::Configuration,
            Self::CompressionFailed(_)
            | Self::SerializationError(_)
            | Self::DeserializationError(_) => ErrorCategory::Serialization,
            Self::TierUnavailable(_) | Self::Io(_) => ErrorCategory::Io,
            Self::TimeoutError(_) => ErrorCategory::Timing,
            Self::CapacityExceeded { .. } => ErrorCategory::Resource,
            Self::LoaderFailed(_) => ErrorCategory::Loader,
        }
    }

    /// Get recovery hint for this error
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::CompressionFailed(_)
            | Self::SerializationError(_)
            | Self::DeserializationError(_) => RecoveryHint::Fallback,
            Self::TierUnavailable(_) | Self::Io(_) | Self::TimeoutError(_) => {
                RecoveryHint::RetryBackoff
            }
            Self::CapacityExceeded { .. } => RecoveryHint::ClearAndRetry,
            Self::LoaderFailed(_) => RecoveryHint::RetryBackoff,
            Self::InvalidConfiguration(_) => RecoveryHint::Restart,
            Self::UnknownTier(_) => RecoveryHint::Fatal,
        }
    }

    /// Whether the error is a programmer error that public operations surface
    #[inline(always)]
    pub fn is_fatal(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::Fatal)
    }
}
