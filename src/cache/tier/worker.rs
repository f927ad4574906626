//! Tier owned by a dedicated worker thread
//!
//! The worker thread owns the map outright; callers send requests over a crossbeam
//! channel and await the reply on a oneshot. The thread exits once every handle is
//! dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender, unbounded};
use tokio::sync::oneshot;

use super::TierBackend;
use crate::cache::item::SmartCacheItem;
use crate::cache::traits::CacheOperationError;

enum WorkerMessage {
    Get {
        key: String,
        response: oneshot::Sender<Option<SmartCacheItem>>,
    },
    Set {
        key: String,
        item: SmartCacheItem,
        response: oneshot::Sender<()>,
    },
    Delete {
        key: String,
        response: oneshot::Sender<bool>,
    },
    Clear {
        response: oneshot::Sender<()>,
    },
    Entries {
        response: oneshot::Sender<Vec<(String, SmartCacheItem)>>,
    },
}

/// Service loop that owns all tier state
struct WorkerTierService {
    receiver: Receiver<WorkerMessage>,
    items: HashMap<String, SmartCacheItem>,
}

impl WorkerTierService {
    fn run(mut self) {
        while let Ok(msg) = self.receiver.recv() {
            // a dropped reply receiver means the caller timed out
            match msg {
                WorkerMessage::Get { key, response } => {
                    let _ = response.send(self.items.get(&key).cloned());
                }
                WorkerMessage::Set {
                    key,
                    item,
                    response,
                } => {
                    self.items.insert(key, item);
                    let _ = response.send(());
                }
                WorkerMessage::Delete { key, response } => {
                    let _ = response.send(self.items.remove(&key).is_some());
                }
                WorkerMessage::Clear { response } => {
                    self.items.clear();
                    let _ = response.send(());
                }
                WorkerMessage::Entries { response } => {
                    let entries = self
                        .items
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    let _ = response.send(entries);
                }
            }
        }
        log::debug!("Worker tier service exiting - all handles dropped");
    }
}

/// Handle to a worker-thread tier
#[derive(Debug, Clone)]
pub struct WorkerTier {
    sender: Sender<WorkerMessage>,
}

impl std::fmt::Debug for WorkerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerMessage::Get { .. } => "Get",
            WorkerMessage::Set { .. } => "Set",
            WorkerMessage::Delete { .. } => "Delete",
            WorkerMessage::Clear { .. } => "Clear",
            WorkerMessage::Entries { .. } => "Entries",
        };
        f.write_str(name)
    }
}

impl WorkerTier {
    /// Spawn the worker thread
    pub fn spawn(name: &str) -> Result<Self, CacheOperationError> {
        let (tx, rx) = unbounded();
        let thread_name = format!("tier-{}", name);

        std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                log::debug!("Worker tier thread '{}' started", thread_name);
                WorkerTierService {
                    receiver: rx,
                    items: HashMap::new(),
                }
                .run();
            })
            .map_err(|e| {
                CacheOperationError::tier_unavailable(format!(
                    "Failed to spawn worker tier thread: {}",
                    e
                ))
            })?;

        Ok(Self { sender: tx })
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> WorkerMessage,
    ) -> Result<R, CacheOperationError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .map_err(|_| CacheOperationError::tier_unavailable("worker tier stopped"))?;
        rx.await
            .map_err(|_| CacheOperationError::tier_unavailable("worker tier dropped the reply"))
    }
}

#[async_trait]
impl TierBackend for WorkerTier {
    fn kind(&self) -> &'static str {
        "worker"
    }

    async fn get(&self, key: &str) -> Result<Option<SmartCacheItem>, CacheOperationError> {
        let key = key.to_string();
        self.request(|response| WorkerMessage::Get { key, response })
            .await
    }

    async fn set(&self, key: &str, item: SmartCacheItem) -> Result<(), CacheOperationError> {
        let key = key.to_string();
        self.request(|response| WorkerMessage::Set {
            key,
            item,
            response,
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheOperationError> {
        let key = key.to_string();
        self.request(|response| WorkerMessage::Delete { key, response })
            .await
    }

    async fn clear(&self) -> Result<(), CacheOperationError> {
        self.request(|response| WorkerMessage::Clear { response })
            .await
    }

    async fn entries(&self) -> Result<Vec<(String, SmartCacheItem)>, CacheOperationError> {
        self.request(|response| WorkerMessage::Entries { response })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::item::Lz4Compressor;
    use crate::cache::types::CacheValue;

    #[tokio::test]
    async fn test_worker_tier_round_trip() {
        let tier = WorkerTier::spawn("test").unwrap();
        let item = SmartCacheItem::new(
            "doc",
            CacheValue::from(serde_json::json!({"fps": 30})),
            Arc::new(Lz4Compressor),
            1024,
        );

        tier.set("doc", item).await.unwrap();
        let fetched = tier.get("doc").await.unwrap().unwrap();
        assert_eq!(
            fetched.peek_value().unwrap(),
            CacheValue::from(serde_json::json!({"fps": 30}))
        );

        let handle = tier.clone();
        assert_eq!(handle.entries().await.unwrap().len(), 1);
        handle.clear().await.unwrap();
        assert!(tier.get("doc").await.unwrap().is_none());
        assert!(!tier.delete("doc").await.unwrap());
    }
}
