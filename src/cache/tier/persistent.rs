//! Directory-backed persistent tier
//!
//! One file per key, named by the hex SHA-256 of the key. Each file is a CRC32 of the
//! payload (little endian) followed by the bincode-encoded item record. Files that fail
//! the checksum or do not decode are removed and reported as absent.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bincode::config;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::TierBackend;
use crate::cache::item::{Compressor, ItemRecord, SmartCacheItem};
use crate::cache::traits::CacheOperationError;

const RECORD_EXTENSION: &str = "rec";
const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone)]
pub struct PersistentTier {
    root: Arc<PathBuf>,
    compressor: Arc<dyn Compressor>,
}

impl PersistentTier {
    /// Open or create the tier directory
    pub fn open(
        root: impl Into<PathBuf>,
        compressor: Arc<dyn Compressor>,
    ) -> Result<Self, CacheOperationError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            CacheOperationError::io_failed(format!(
                "cannot create tier directory {}: {}",
                root.display(),
                e
            ))
        })?;
        log::info!("Persistent tier opened at {}", root.display());
        Ok(Self {
            root: Arc::new(root),
            compressor,
        })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root
            .join(format!("{}.{}", hex::encode(digest), RECORD_EXTENSION))
    }

    /// Run blocking file I/O off the async executor
    async fn blocking<R, F>(&self, op: F) -> Result<R, CacheOperationError>
    where
        F: FnOnce(&PersistentTier) -> Result<R, CacheOperationError> + Send + 'static,
        R: Send + 'static,
    {
        let tier = self.clone();
        tokio::task::spawn_blocking(move || op(&tier))
            .await
            .map_err(|e| CacheOperationError::tier_unavailable(format!("I/O task failed: {}", e)))?
    }

    fn encode(item: &SmartCacheItem) -> Result<Vec<u8>, CacheOperationError> {
        let record = item.to_record()?;
        let payload = bincode::encode_to_vec(&record, config::standard())
            .map_err(|e| CacheOperationError::serialization_failed(e.to_string()))?;
        let checksum = crc32fast::hash(&payload);

        let mut bytes = Vec::with_capacity(CHECKSUM_LEN + payload.len());
        bytes.extend_from_slice(&checksum.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<SmartCacheItem, CacheOperationError> {
        if bytes.len() < CHECKSUM_LEN {
            return Err(CacheOperationError::deserialization_failed(
                "record shorter than checksum",
            ));
        }
        let (header, payload) = bytes.split_at(CHECKSUM_LEN);
        let expected = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let actual = crc32fast::hash(payload);
        if expected != actual {
            return Err(CacheOperationError::deserialization_failed(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                expected, actual
            )));
        }

        let (record, _len): (ItemRecord, usize) =
            bincode::decode_from_slice(payload, config::standard())
                .map_err(|e| CacheOperationError::deserialization_failed(e.to_string()))?;
        SmartCacheItem::from_record(record, self.compressor.clone())
    }

    /// Read and verify one file, removing it when corrupt
    fn read_file(&self, path: &Path) -> Result<Option<SmartCacheItem>, CacheOperationError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match self.decode(&bytes) {
            Ok(item) => Ok(Some(item)),
            Err(e) => {
                log::warn!("Discarding corrupt record {}: {}", path.display(), e);
                let _ = fs::remove_file(path);
                Ok(None)
            }
        }
    }

    fn write_file(&self, key: &str, item: &SmartCacheItem) -> Result<(), CacheOperationError> {
        let path = self.path_for(key);
        let bytes = Self::encode(item)?;
        // concurrent writers each stage their own file
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_data()?;
        drop(file);
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>, CacheOperationError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(self.root.as_path())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl TierBackend for PersistentTier {
    fn kind(&self) -> &'static str {
        "persistent"
    }

    fn is_durable(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> Result<Option<SmartCacheItem>, CacheOperationError> {
        let key = key.to_string();
        self.blocking(move |tier| {
            let item = tier.read_file(&tier.path_for(&key))?;
            // guard against digest collisions
            Ok(item.filter(|item| item.key() == key))
        })
        .await
    }

    async fn set(&self, key: &str, item: SmartCacheItem) -> Result<(), CacheOperationError> {
        let key = key.to_string();
        self.blocking(move |tier| tier.write_file(&key, &item)).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheOperationError> {
        let key = key.to_string();
        self.blocking(move |tier| match fs::remove_file(tier.path_for(&key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn clear(&self) -> Result<(), CacheOperationError> {
        self.blocking(|tier| {
            for path in tier.record_paths()? {
                fs::remove_file(&path)?;
            }
            Ok(())
        })
        .await
    }

    async fn entries(&self) -> Result<Vec<(String, SmartCacheItem)>, CacheOperationError> {
        self.blocking(|tier| {
            let mut entries = Vec::new();
            for path in tier.record_paths()? {
                if let Some(item) = tier.read_file(&path)? {
                    entries.push((item.key().to_string(), item));
                }
            }
            Ok(entries)
        })
        .await
    }
}
