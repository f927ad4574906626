//! Tier backends
//!
//! The orchestrator only needs asynchronous get/set/delete/clear/iterate from a tier.
//! Three backends ship with the crate: an in-process concurrent map, a store owned by a
//! dedicated worker thread, and a directory of checksummed record files. Any other
//! `TierBackend` can be handed to `SmartCacheSystem::with_backends` or
//! `SmartCacheBuilder::tier_with_backend`.

pub mod memory;
pub mod persistent;
pub mod worker;

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::config::{CacheConfig, TierBackendKind};
use crate::cache::item::{Compressor, SmartCacheItem};
use crate::cache::traits::CacheOperationError;

pub use memory::MemoryTier;
pub use persistent::PersistentTier;
pub use worker::WorkerTier;

/// Asynchronous key/value store of cache items
#[async_trait]
pub trait TierBackend: Send + Sync + std::fmt::Debug {
    /// Backend name for logs
    fn kind(&self) -> &'static str;

    /// Contents outlive the process; the tier ledger is rebuilt from `entries()` at startup
    fn is_durable(&self) -> bool {
        false
    }

    async fn get(&self, key: &str) -> Result<Option<SmartCacheItem>, CacheOperationError>;

    /// Insert or replace
    async fn set(&self, key: &str, item: SmartCacheItem) -> Result<(), CacheOperationError>;

    /// Remove; returns whether the key was present
    async fn delete(&self, key: &str) -> Result<bool, CacheOperationError>;

    async fn clear(&self) -> Result<(), CacheOperationError>;

    /// Snapshot of every stored pair
    async fn entries(&self) -> Result<Vec<(String, SmartCacheItem)>, CacheOperationError>;
}

/// Construct the backend configured for tier `level`
pub fn build_backend(
    config: &CacheConfig,
    level: usize,
    compressor: Arc<dyn Compressor>,
) -> Result<Box<dyn TierBackend>, CacheOperationError> {
    let tier = config
        .tiers
        .get(level)
        .ok_or(CacheOperationError::UnknownTier(level))?;

    let backend: Box<dyn TierBackend> = match tier.backend {
        TierBackendKind::Memory => Box::new(MemoryTier::new()),
        TierBackendKind::Worker => Box::new(WorkerTier::spawn(&tier.name)?),
        TierBackendKind::Persistent => Box::new(PersistentTier::open(
            config.storage_path_for(level),
            compressor,
        )?),
    };
    log::debug!(
        "Tier {} '{}' backed by {}",
        level,
        tier.name,
        backend.kind()
    );
    Ok(backend)
}
