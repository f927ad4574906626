//! tiercache - multi-tier smart cache
//!
//! An async cache that keeps items in an ordered list of tiers, fastest first, and
//! learns from how keys are accessed.
//!
//! # Features
//!
//! - **Pluggable tiers**: in-process map, worker-thread store and checksummed on-disk
//!   records behind one async backend trait
//! - **Promotion**: hits in slower tiers are copied into the fastest tier
//! - **Compression**: values above a size threshold are stored LZ4 (or run-length) packed
//! - **Prediction**: per-key access intervals drive next-access forecasts with learned
//!   confidence, used to prefetch through a loader
//! - **Adaptive eviction**: LRU, LFU, TTL and priority-score eviction, switched at runtime
//!   when another strategy performs clearly better
//! - **Telemetry**: lock-free counters, hit-rate history and JSON performance reports

pub mod cache;
pub mod prelude;
pub mod smart_cache;
pub mod telemetry;

pub use cache::coordinator::{Loader, SmartCacheSystem};
pub use cache::traits::CacheOperationError;
pub use smart_cache::{SmartCache, SmartCacheBuilder};
