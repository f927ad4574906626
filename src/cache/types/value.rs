//! Cached value representation
//!
//! The cache stores three kinds of payload: opaque binary buffers, UTF-8 text and
//! structured JSON documents. Logical size follows the payload kind: byte length,
//! UTF-8 length, or serialized JSON length.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::traits::CacheOperationError;

/// A value held by the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CacheValue {
    /// Opaque binary buffer
    Bytes(Vec<u8>),
    /// UTF-8 text
    Text(String),
    /// Structured document
    Structured(serde_json::Value),
}

/// Discriminant of a `CacheValue`, used by the encoded wire form
#[derive(Debug, Clone, Copy, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum ValueKind {
    Bytes,
    Text,
    Structured,
}

impl CacheValue {
    /// Build a structured value from any serializable type
    pub fn structured<T: Serialize>(value: &T) -> Result<Self, CacheOperationError> {
        serde_json::to_value(value)
            .map(CacheValue::Structured)
            .map_err(|e| CacheOperationError::serialization_failed(e.to_string()))
    }

    /// Kind discriminant
    #[inline(always)]
    pub fn kind(&self) -> ValueKind {
        match self {
            CacheValue::Bytes(_) => ValueKind::Bytes,
            CacheValue::Text(_) => ValueKind::Text,
            CacheValue::Structured(_) => ValueKind::Structured,
        }
    }

    /// Logical size in bytes
    ///
    /// Structured values are measured by their serialized JSON length; a value that
    /// cannot be serialized falls back to the length of its debug rendering.
    pub fn logical_size(&self) -> u64 {
        match self {
            CacheValue::Bytes(bytes) => bytes.len() as u64,
            CacheValue::Text(text) => text.len() as u64,
            CacheValue::Structured(value) => serde_json::to_vec(value)
                .map(|encoded| encoded.len() as u64)
                .unwrap_or_else(|_| format!("{:?}", value).len() as u64),
        }
    }

    /// Encode into raw bytes for compression or persistence
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheOperationError> {
        match self {
            CacheValue::Bytes(bytes) => Ok(bytes.clone()),
            CacheValue::Text(text) => Ok(text.as_bytes().to_vec()),
            CacheValue::Structured(value) => serde_json::to_vec(value)
                .map_err(|e| CacheOperationError::serialization_failed(e.to_string())),
        }
    }

    /// Rebuild a value from its kind and encoded bytes
    pub fn from_bytes(kind: ValueKind, bytes: Vec<u8>) -> Result<Self, CacheOperationError> {
        match kind {
            ValueKind::Bytes => Ok(CacheValue::Bytes(bytes)),
            ValueKind::Text => String::from_utf8(bytes)
                .map(CacheValue::Text)
                .map_err(|e| CacheOperationError::deserialization_failed(e.to_string())),
            ValueKind::Structured => serde_json::from_slice(&bytes)
                .map(CacheValue::Structured)
                .map_err(|e| CacheOperationError::deserialization_failed(e.to_string())),
        }
    }

    /// Deserialize a structured value into a concrete type
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, CacheOperationError> {
        match self {
            CacheValue::Structured(value) => serde_json::from_value(value.clone())
                .map_err(|e| CacheOperationError::deserialization_failed(e.to_string())),
            CacheValue::Text(text) => serde_json::from_str(text)
                .map_err(|e| CacheOperationError::deserialization_failed(e.to_string())),
            CacheValue::Bytes(bytes) => serde_json::from_slice(bytes)
                .map_err(|e| CacheOperationError::deserialization_failed(e.to_string())),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CacheValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CacheValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(bytes: Vec<u8>) -> Self {
        CacheValue::Bytes(bytes)
    }
}

impl From<&[u8]> for CacheValue {
    fn from(bytes: &[u8]) -> Self {
        CacheValue::Bytes(bytes.to_vec())
    }
}

impl From<String> for CacheValue {
    fn from(text: String) -> Self {
        CacheValue::Text(text)
    }
}

impl From<&str> for CacheValue {
    fn from(text: &str) -> Self {
        CacheValue::Text(text.to_owned())
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        CacheValue::Structured(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_size_per_kind() {
        assert_eq!(CacheValue::from(vec![0u8; 12]).logical_size(), 12);
        // multi-byte characters count encoded bytes
        assert_eq!(CacheValue::from("héllo").logical_size(), 6);
        let doc = CacheValue::from(serde_json::json!({"a": 1}));
        assert_eq!(doc.logical_size(), br#"{"a":1}"#.len() as u64);
    }

    #[test]
    fn test_bytes_reconstruct_value() {
        let doc = CacheValue::from(serde_json::json!({"frames": [1, 2, 3], "codec": "h264"}));
        let bytes = doc.to_bytes().unwrap();
        let rebuilt = CacheValue::from_bytes(doc.kind(), bytes).unwrap();
        assert_eq!(rebuilt, doc);

        let invalid = CacheValue::from_bytes(ValueKind::Text, vec![0xff, 0xfe]);
        assert!(matches!(
            invalid,
            Err(CacheOperationError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_encoded_floats_keep_every_bit() {
        let readings = [
            1.079907802215119e-66,
            0.011353012011799505,
            f64::MIN_POSITIVE / 3.0,
            f64::MAX,
            -2.2250738585072014e-308,
        ];
        let doc = CacheValue::structured(&readings).unwrap();
        let rebuilt = CacheValue::from_bytes(doc.kind(), doc.to_bytes().unwrap()).unwrap();

        let decoded: Vec<f64> = rebuilt.to_typed().unwrap();
        assert_eq!(decoded.len(), readings.len());
        for (decoded, original) in decoded.iter().zip(readings) {
            assert_eq!(decoded.to_bits(), original.to_bits());
        }
    }

    #[test]
    fn test_typed_access() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Dims {
            width: u32,
            height: u32,
        }

        let value = CacheValue::structured(&Dims {
            width: 1920,
            height: 1080,
        })
        .unwrap();
        let dims: Dims = value.to_typed().unwrap();
        assert_eq!(
            dims,
            Dims {
                width: 1920,
                height: 1080
            }
        );
    }
}
