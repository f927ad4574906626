//! In-process tier backed by a concurrent map

use async_trait::async_trait;
use dashmap::DashMap;

use super::TierBackend;
use crate::cache::item::SmartCacheItem;
use crate::cache::traits::CacheOperationError;

/// Fastest tier: items live in a sharded concurrent map
#[derive(Debug, Default)]
pub struct MemoryTier {
    items: DashMap<String, SmartCacheItem>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl TierBackend for MemoryTier {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<SmartCacheItem>, CacheOperationError> {
        Ok(self.items.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, item: SmartCacheItem) -> Result<(), CacheOperationError> {
        self.items.insert(key.to_string(), item);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheOperationError> {
        Ok(self.items.remove(key).is_some())
    }

    async fn clear(&self) -> Result<(), CacheOperationError> {
        self.items.clear();
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<(String, SmartCacheItem)>, CacheOperationError> {
        Ok(self
            .items
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::item::Lz4Compressor;
    use crate::cache::types::CacheValue;

    #[tokio::test]
    async fn test_memory_tier_operations() {
        let tier = MemoryTier::new();
        let item = SmartCacheItem::new("a", CacheValue::from("1"), Arc::new(Lz4Compressor), 1024);

        tier.set("a", item).await.unwrap();
        assert_eq!(tier.len(), 1);
        let fetched = tier.get("a").await.unwrap().unwrap();
        assert_eq!(fetched.peek_value().unwrap(), CacheValue::from("1"));
        assert_eq!(tier.entries().await.unwrap().len(), 1);

        assert!(tier.delete("a").await.unwrap());
        assert!(!tier.delete("a").await.unwrap());
        assert!(tier.get("a").await.unwrap().is_none());
    }
}
