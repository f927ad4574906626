//! Capacity enforcement before admission into a tier
//!
//! Callers hold the tier's admission lock and the lock of the key being written.

use crate::cache::config::MaintenanceConfig;
use crate::cache::eviction::{EvictionCandidate, EvictionSelector};
use crate::cache::traits::{CacheOperationError, EvictionReason};

use super::key_locks::KeyLocks;
use super::tier_operations::Tier;

/// Tuning for capacity-driven eviction
#[derive(Debug, Clone, Copy)]
pub struct CapacityPolicy {
    /// Share of `max_items` evicted when the count limit is hit
    pub evict_fraction: f64,
    /// Share of `max_size` to shrink to when the byte limit is hit
    pub size_target: f64,
}

impl CapacityPolicy {
    pub fn from_config(config: &MaintenanceConfig) -> Self {
        Self {
            evict_fraction: config.capacity_evict_fraction,
            size_target: config.size_eviction_target,
        }
    }

    /// Items evicted per count-limit hit, at least one
    pub fn batch_size(&self, max_items: usize) -> usize {
        ((max_items as f64 * self.evict_fraction).ceil() as usize).max(1)
    }
}

/// Keys removed to make room
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EvictionOutcome {
    pub evicted: Vec<String>,
    pub reason: Option<EvictionReason>,
}

impl EvictionOutcome {
    #[inline]
    pub fn count(&self) -> usize {
        self.evicted.len()
    }
}

/// Make room in `tier` for `key` occupying `incoming` bytes
///
/// Fails with `CapacityExceeded` when the item alone is larger than the tier or when
/// enough room cannot be freed because the remaining keys are busy.
pub async fn ensure_capacity(
    tier: &Tier,
    key: &str,
    incoming: u64,
    selector: &EvictionSelector,
    policy: &CapacityPolicy,
    locks: &KeyLocks,
) -> Result<EvictionOutcome, CacheOperationError> {
    let max_items = tier.config().max_items;
    let max_size = tier.config().max_size;

    if incoming > max_size {
        return Err(CacheOperationError::CapacityExceeded {
            required: incoming,
            available: max_size,
        });
    }

    let replaced = tier.ledger_entry(key).map(|entry| entry.stored_size);
    let projected = |tier: &Tier| {
        tier.size()
            .saturating_sub(replaced.unwrap_or(0))
            .saturating_add(incoming)
    };
    let over_count = |tier: &Tier| replaced.is_none() && tier.item_count() >= max_items;

    let mut outcome = EvictionOutcome::default();
    if !over_count(tier) && projected(tier) <= max_size {
        return Ok(outcome);
    }

    let mut candidates = tier.candidates(key);
    selector.rank(&mut candidates);
    let mut queue = candidates.into_iter();

    if over_count(tier) {
        let needed = (tier.item_count() + 1)
            .saturating_sub(max_items)
            .max(policy.batch_size(max_items));
        while outcome.count() < needed {
            match evict_next(tier, &mut queue, locks).await {
                Some(evicted) => outcome.evicted.push(evicted),
                None => break,
            }
        }
        outcome.reason = Some(EvictionReason::CapacityLimit);
        if over_count(tier) {
            return Err(CacheOperationError::CapacityExceeded {
                required: 1,
                available: 0,
            });
        }
    }

    if projected(tier) > max_size {
        let target = (max_size as f64 * policy.size_target) as u64;
        while projected(tier) > target {
            match evict_next(tier, &mut queue, locks).await {
                Some(evicted) => outcome.evicted.push(evicted),
                None => break,
            }
        }
        outcome.reason = Some(EvictionReason::MemoryPressure);
        if projected(tier) > max_size {
            return Err(CacheOperationError::CapacityExceeded {
                required: incoming,
                available: max_size.saturating_sub(projected(tier) - incoming),
            });
        }
    }

    if !outcome.evicted.is_empty() {
        log::debug!(
            "Tier {} evicted {} item(s) under {}",
            tier.level(),
            outcome.count(),
            selector.strategy()
        );
    }
    Ok(outcome)
}

/// Evict the next candidate nobody else is using
async fn evict_next(
    tier: &Tier,
    queue: &mut impl Iterator<Item = EvictionCandidate>,
    locks: &KeyLocks,
) -> Option<String> {
    for candidate in queue.by_ref() {
        let Some(_guard) = locks.try_lock(&candidate.key) else {
            log::trace!("Skipping busy eviction candidate '{}'", candidate.key);
            continue;
        };
        if tier.remove(&candidate.key).await {
            return Some(candidate.key);
        }
    }
    None
}
