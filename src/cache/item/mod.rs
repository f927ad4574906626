//! Cache item with transparent compression
//!
//! `SmartCacheItem` pairs a value with its metadata. Values larger than the compression
//! threshold are encoded and compressed; the compressed form is kept only when it is
//! strictly shorter than the encoded bytes. Reads always hand back a value equal to the
//! one stored.

pub mod compression;

use std::sync::Arc;

use crate::cache::config::PatternThresholds;
use crate::cache::metadata::CacheMetadata;
use crate::cache::traits::CacheOperationError;
use crate::cache::types::{CacheValue, ValueKind, now_millis};

pub use compression::{Compressor, Lz4Compressor, RunLengthCompressor, compressor_for};

/// Default compression threshold in bytes
pub const DEFAULT_COMPRESSION_THRESHOLD: u64 = 10 * 1024;

#[derive(Debug, Clone)]
enum Payload {
    /// Value held as-is
    Raw(CacheValue),
    /// Encoded and compressed bytes of a value of `kind`
    Compressed { kind: ValueKind, bytes: Vec<u8> },
}

/// A cached value together with its metadata
#[derive(Debug, Clone)]
pub struct SmartCacheItem {
    key: String,
    payload: Payload,
    metadata: CacheMetadata,
    compressed: bool,
    serialized: bool,
    original_size: u64,
    compressed_size: u64,
    compression_threshold: u64,
    compressor: Arc<dyn Compressor>,
}

impl SmartCacheItem {
    /// Build an item created now
    pub fn new(
        key: impl Into<String>,
        value: CacheValue,
        compressor: Arc<dyn Compressor>,
        compression_threshold: u64,
    ) -> Self {
        Self::new_at(key, value, compressor, compression_threshold, now_millis())
    }

    /// Build an item created at `now`
    pub fn new_at(
        key: impl Into<String>,
        value: CacheValue,
        compressor: Arc<dyn Compressor>,
        compression_threshold: u64,
        now: u64,
    ) -> Self {
        let mut item = Self {
            key: key.into(),
            payload: Payload::Raw(CacheValue::Bytes(Vec::new())),
            metadata: CacheMetadata::new_at(0, 1, now),
            compressed: false,
            serialized: false,
            original_size: 0,
            compressed_size: 0,
            compression_threshold,
            compressor,
        };
        item.store(value, now);
        item
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn metadata(&self) -> &CacheMetadata {
        &self.metadata
    }

    #[inline]
    pub fn metadata_mut(&mut self) -> &mut CacheMetadata {
        &mut self.metadata
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    #[inline]
    pub fn is_serialized(&self) -> bool {
        self.serialized
    }

    /// Logical size of the value
    #[inline]
    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    #[inline]
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Bytes this item occupies in a tier
    #[inline]
    pub fn stored_size(&self) -> u64 {
        if self.compressed {
            self.compressed_size
        } else {
            self.original_size
        }
    }

    #[inline]
    pub fn compression_threshold(&self) -> u64 {
        self.compression_threshold
    }

    /// Decode the value and record a hit
    pub fn get_value(&mut self) -> Result<CacheValue, CacheOperationError> {
        self.get_value_at(now_millis(), &PatternThresholds::default())
    }

    /// Decode the value and record a hit at `now`
    pub fn get_value_at(
        &mut self,
        now: u64,
        thresholds: &PatternThresholds,
    ) -> Result<CacheValue, CacheOperationError> {
        let value = self.peek_value()?;
        self.metadata.record_access_at(true, now, thresholds);
        Ok(value)
    }

    /// Decode the value without touching metadata
    pub fn peek_value(&self) -> Result<CacheValue, CacheOperationError> {
        match &self.payload {
            Payload::Raw(value) => Ok(value.clone()),
            Payload::Compressed { kind, bytes } => {
                let decoded = self.compressor.decompress(bytes)?;
                CacheValue::from_bytes(*kind, decoded)
            }
        }
    }

    /// Replace the value, optionally with a new compression threshold
    pub fn set_value(&mut self, value: CacheValue, compression_threshold: Option<u64>) {
        if let Some(threshold) = compression_threshold {
            self.compression_threshold = threshold;
        }
        self.store(value, now_millis());
    }

    fn store(&mut self, value: CacheValue, now: u64) {
        self.original_size = value.logical_size();
        self.compressed = false;
        self.serialized = false;
        self.compressed_size = self.original_size;

        self.payload = if self.original_size > self.compression_threshold {
            self.try_compress(value)
        } else {
            Payload::Raw(value)
        };

        self.metadata.mark_updated(self.original_size, now);
        self.metadata.compression_ratio = if self.original_size == 0 {
            1.0
        } else {
            self.stored_size() as f64 / self.original_size as f64
        };
    }

    fn try_compress(&mut self, value: CacheValue) -> Payload {
        let kind = value.kind();
        let encoded = match value.to_bytes() {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("Storing '{}' uncompressed: {}", self.key, e);
                return Payload::Raw(value);
            }
        };

        match self.compressor.compress(&encoded) {
            Ok(packed) if packed.len() < encoded.len() => {
                log::trace!(
                    "Compressed '{}' with {}: {} -> {} bytes",
                    self.key,
                    self.compressor.name(),
                    encoded.len(),
                    packed.len()
                );
                self.compressed = true;
                self.serialized = kind == ValueKind::Structured;
                self.compressed_size = packed.len() as u64;
                Payload::Compressed {
                    kind,
                    bytes: packed,
                }
            }
            Ok(_) => Payload::Raw(value),
            Err(e) => {
                log::warn!("Compression failed for '{}', storing raw: {}", self.key, e);
                Payload::Raw(value)
            }
        }
    }

    /// Encode into the on-disk record form
    pub fn to_record(&self) -> Result<ItemRecord, CacheOperationError> {
        let (kind, payload) = match &self.payload {
            Payload::Raw(value) => (value.kind(), value.to_bytes()?),
            Payload::Compressed { kind, bytes } => (*kind, bytes.clone()),
        };
        Ok(ItemRecord {
            key: self.key.clone(),
            kind,
            compressed: self.compressed,
            serialized: self.serialized,
            codec: self.compressor.name().to_string(),
            payload,
            original_size: self.original_size,
            compressed_size: self.compressed_size,
            compression_threshold: self.compression_threshold,
            metadata: self.metadata.clone(),
        })
    }

    /// Rebuild an item from its record using the tier's codec
    pub fn from_record(
        record: ItemRecord,
        compressor: Arc<dyn Compressor>,
    ) -> Result<Self, CacheOperationError> {
        let payload = if record.compressed {
            if record.codec != compressor.name() {
                return Err(CacheOperationError::deserialization_failed(format!(
                    "record for '{}' uses codec {}, tier uses {}",
                    record.key,
                    record.codec,
                    compressor.name()
                )));
            }
            Payload::Compressed {
                kind: record.kind,
                bytes: record.payload,
            }
        } else {
            Payload::Raw(CacheValue::from_bytes(record.kind, record.payload)?)
        };

        Ok(Self {
            key: record.key,
            payload,
            metadata: record.metadata,
            compressed: record.compressed,
            serialized: record.serialized,
            original_size: record.original_size,
            compressed_size: record.compressed_size,
            compression_threshold: record.compression_threshold,
            compressor,
        })
    }
}

/// Serializable form of an item
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct ItemRecord {
    pub key: String,
    pub kind: ValueKind,
    pub compressed: bool,
    pub serialized: bool,
    pub codec: String,
    pub payload: Vec<u8>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub compression_threshold: u64,
    pub metadata: CacheMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lz4() -> Arc<dyn Compressor> {
        Arc::new(Lz4Compressor)
    }

    #[test]
    fn test_small_value_stays_raw() {
        let mut item = SmartCacheItem::new("k", CacheValue::from("small"), lz4(), 1024);
        assert!(!item.is_compressed());
        assert_eq!(item.original_size(), 5);
        assert_eq!(item.stored_size(), 5);
        assert_eq!(item.get_value().unwrap(), CacheValue::from("small"));
        assert_eq!(item.metadata().hit_count, 1);
    }

    #[test]
    fn test_large_structured_value_round_trips_compressed() {
        let rows: Vec<_> = (0..500)
            .map(|i| serde_json::json!({"frame": i, "label": "background"}))
            .collect();
        let value = CacheValue::from(serde_json::Value::Array(rows));
        let mut item = SmartCacheItem::new("doc", value.clone(), lz4(), 1024);

        assert!(item.is_compressed());
        assert!(item.is_serialized());
        assert!(item.compressed_size() < item.original_size());
        assert!(item.metadata().compression_ratio < 1.0);
        assert_eq!(item.get_value().unwrap(), value);
    }

    #[test]
    fn test_incompressible_value_kept_raw() {
        // distinct bytes never shrink under run-length encoding
        let noise: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let item = SmartCacheItem::new(
            "noise",
            CacheValue::from(noise.clone()),
            Arc::new(RunLengthCompressor),
            16,
        );
        assert!(!item.is_compressed());
        assert_eq!(item.peek_value().unwrap(), CacheValue::from(noise));
    }

    #[test]
    fn test_set_value_resets_compression_state() {
        let mut item = SmartCacheItem::new("k", CacheValue::from(vec![0u8; 8192]), lz4(), 1024);
        assert!(item.is_compressed());

        item.set_value(CacheValue::from("tiny"), None);
        assert!(!item.is_compressed());
        assert_eq!(item.original_size(), 4);
        assert_eq!(item.metadata().size, 4);

        item.set_value(CacheValue::from("tiny but over"), Some(4));
        assert_eq!(item.compression_threshold(), 4);
        assert_eq!(item.peek_value().unwrap(), CacheValue::from("tiny but over"));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = SmartCacheItem::new("k", CacheValue::from("v1"), lz4(), 1024);
        let mut copy = original.clone();
        copy.set_value(CacheValue::from("v2"), None);
        copy.metadata_mut().priority = 9;

        assert_eq!(original.peek_value().unwrap(), CacheValue::from("v1"));
        assert_eq!(original.metadata().priority, 1);
    }

    #[test]
    fn test_record_round_trip_and_codec_mismatch() {
        let item = SmartCacheItem::new("k", CacheValue::from(vec![3u8; 4096]), lz4(), 64);
        let record = item.to_record().unwrap();
        let config = bincode::config::standard();
        let encoded = bincode::encode_to_vec(&record, config).unwrap();
        let (decoded, _): (ItemRecord, usize) =
            bincode::decode_from_slice(&encoded, config).unwrap();
        let restored = SmartCacheItem::from_record(decoded.clone(), lz4()).unwrap();
        assert_eq!(restored.peek_value().unwrap(), item.peek_value().unwrap());
        assert_eq!(restored.metadata(), item.metadata());

        let mismatch = SmartCacheItem::from_record(decoded, Arc::new(RunLengthCompressor));
        assert!(matches!(
            mismatch,
            Err(CacheOperationError::DeserializationError(_))
        ));
    }
}
