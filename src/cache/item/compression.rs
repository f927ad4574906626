//! Pluggable compression codecs for large cache values
//!
//! Codecs only transform bytes. The decision to keep the compressed form (strictly
//! shorter than the input) belongs to the item.

use std::sync::Arc;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::cache::config::CompressionCodec;
use crate::cache::traits::CacheOperationError;

/// Byte-level compression strategy
pub trait Compressor: Send + Sync + std::fmt::Debug {
    /// Stable codec name, persisted next to compressed payloads
    fn name(&self) -> &'static str;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheOperationError>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheOperationError>;
}

/// LZ4 block compression with the uncompressed length prepended
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn name(&self) -> &'static str {
        "lz4"
    }

    #[inline]
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheOperationError> {
        Ok(compress_prepend_size(data))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheOperationError> {
        decompress_size_prepended(data).map_err(|e| {
            CacheOperationError::compression_failed(format!("LZ4 decompression failed: {:?}", e))
        })
    }
}

/// Run-length encoding as `(count, byte)` pairs with counts in `1..=255`
#[derive(Debug, Default, Clone, Copy)]
pub struct RunLengthCompressor;

impl Compressor for RunLengthCompressor {
    fn name(&self) -> &'static str {
        "rle"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheOperationError> {
        let mut out = Vec::with_capacity(data.len() / 2);
        let mut iter = data.iter().copied().peekable();
        while let Some(byte) = iter.next() {
            let mut run: u8 = 1;
            while run < u8::MAX && iter.peek() == Some(&byte) {
                iter.next();
                run += 1;
            }
            out.push(run);
            out.push(byte);
        }
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheOperationError> {
        if data.len() % 2 != 0 {
            return Err(CacheOperationError::compression_failed(
                "run-length payload has odd length",
            ));
        }
        let mut out = Vec::with_capacity(data.len() * 4);
        for pair in data.chunks_exact(2) {
            let (run, byte) = (pair[0], pair[1]);
            if run == 0 {
                return Err(CacheOperationError::compression_failed(
                    "run-length payload has zero-length run",
                ));
            }
            out.extend(std::iter::repeat_n(byte, run as usize));
        }
        Ok(out)
    }
}

/// Shared codec instance for a configured algorithm
pub fn compressor_for(codec: CompressionCodec) -> Arc<dyn Compressor> {
    match codec {
        CompressionCodec::Lz4 => Arc::new(Lz4Compressor),
        CompressionCodec::RunLength => Arc::new(RunLengthCompressor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_length_codec() {
        let codec = RunLengthCompressor;
        let input: Vec<u8> = [vec![7u8; 300], vec![1, 2, 2]].concat();
        let packed = codec.compress(&input).unwrap();
        // 300 sevens need two runs
        assert_eq!(packed, vec![255, 7, 45, 7, 1, 1, 2, 2]);
        assert_eq!(codec.decompress(&packed).unwrap(), input);
        assert!(codec.decompress(&[3]).is_err());
        assert!(codec.decompress(&[0, 9]).is_err());
    }

    #[test]
    fn test_lz4_codec() {
        let codec = compressor_for(CompressionCodec::Lz4);
        assert_eq!(codec.name(), "lz4");
        let input = b"frame-metadata ".repeat(200);
        let packed = codec.compress(&input).unwrap();
        assert!(packed.len() < input.len());
        assert_eq!(codec.decompress(&packed).unwrap(), input);
        assert!(codec.decompress(&[1, 2]).is_err());
    }
}
