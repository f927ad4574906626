//! Core cache traits and shared enumerations
//!
//! Error taxonomy, access-pattern classification and eviction reasons shared by
//! every layer of the cache.

pub mod error;
pub mod types_and_enums;

pub use error::CacheError;
pub use types_and_enums::{
    AccessPattern, CacheOperationError, ErrorCategory, EvictionReason, RecoveryHint,
};
