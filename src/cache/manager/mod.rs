//! Cache management modules
//!
//! Runtime policy management: the adaptive selection of the eviction strategy.

pub mod strategy;

pub use strategy::{AdaptiveCacheStrategy, EvictionStrategy};
