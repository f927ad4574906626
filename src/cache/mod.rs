//! Cache system module
//!
//! Ordered tiers behind a single orchestrator, with per-item compression, access
//! metadata, interval-based prediction and an adaptive eviction strategy.

pub mod analyzer;
pub mod config;
pub mod coordinator;
pub mod eviction;
pub mod item;
pub mod manager;
pub mod metadata;
pub mod tier;
pub mod traits;
pub mod types;
pub(crate) mod worker;
