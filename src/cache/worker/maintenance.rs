//! Background maintenance jobs for a running cache
//!
//! Two tickers run per cache: the expiry sweep and the adaptation cycle (performance
//! sampling, strategy adaptation and prefetch of due forecasts). Both hold only a weak
//! reference, so they end on their own once the cache is dropped or shut down.

use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::cache::coordinator::SmartCacheSystem;
use crate::cache::traits::CacheOperationError;

use super::ticker::Ticker;

/// Start the expiry sweep and adaptation tickers for `system`
pub fn spawn_maintenance(system: &Arc<SmartCacheSystem>) -> Result<Vec<Ticker>, CacheOperationError> {
    let maintenance = &system.config().maintenance;
    let sweep_period = Duration::from_millis(maintenance.expiry_sweep_interval_ms);
    let adapt_period = Duration::from_millis(maintenance.adaptation_interval_ms);

    let weak = Arc::downgrade(system);
    let sweep = Ticker::spawn("expiry-sweep", sweep_period, move || {
        let weak = weak.clone();
        async move {
            let Some(system) = live(&weak) else {
                return false;
            };
            system.sweep_expired().await;
            true
        }
    })?;

    let weak = Arc::downgrade(system);
    let adapt = Ticker::spawn("adaptation", adapt_period, move || {
        let weak = weak.clone();
        async move {
            let Some(system) = live(&weak) else {
                return false;
            };
            if let Some(strategy) = system.run_adaptation_cycle().await {
                log::debug!("Adaptation cycle switched eviction to {}", strategy);
            }
            true
        }
    })?;

    Ok(vec![sweep, adapt])
}

#[inline]
fn live(weak: &Weak<SmartCacheSystem>) -> Option<Arc<SmartCacheSystem>> {
    weak.upgrade().filter(|system| !system.is_shut_down())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::config::{CacheConfig, TierConfig};
    use crate::cache::types::SetOptions;

    #[tokio::test]
    async fn test_background_sweep_removes_expired() {
        let mut config = CacheConfig::default();
        config.tiers = vec![TierConfig::memory(10, 1 << 16)];
        config.maintenance.expiry_sweep_interval_ms = 20;
        config.maintenance.adaptation_interval_ms = 20;
        let cache = SmartCacheSystem::new(config, None).await.unwrap();

        let options = SetOptions::new().ttl(Duration::from_millis(5));
        cache.set("gone", "soon".into(), options).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.tier(0).unwrap().item_count(), 0);
        assert!(cache.statistics().evictions() >= 1);
        assert!(cache.strategy().sample_count() >= 1);
        cache.cleanup();
    }
}
