//! Cache orchestration
//!
//! [`SmartCacheSystem`] ties the tiers, capacity enforcement, per-key locking, the
//! predictive engine and the adaptive strategy together.

pub mod capacity;
pub mod key_locks;
pub mod loader;
pub mod smart_cache_system;
pub mod tier_operations;

pub use capacity::{CapacityPolicy, EvictionOutcome};
pub use key_locks::KeyLocks;
pub use loader::Loader;
pub use smart_cache_system::SmartCacheSystem;
pub use tier_operations::{LedgerEntry, Tier};
