//! Codec for Zstandard compressed data
//!
//! Not one of the classic TIFF codes, but GDAL-produced files use it
//! and it doubles as the reference registration for extending the
//! codec registry.

use log::trace;

use crate::tiff::errors::{TiffError, TiffResult};
use super::codec::{Codec, CodecOptions};

/// Levels the zstd library accepts
const LEVEL_MIN: i32 = 1;
const LEVEL_MAX: i32 = 22;

/// ZSTD codec (compression code 14)
pub struct ZstdCodec {
    compression_level: i32,
}

impl ZstdCodec {
    /// Codec at the library's balanced default, level 3
    pub fn new() -> Self {
        ZstdCodec {
            compression_level: 3,
        }
    }

    /// Codec at an explicit level, pinned to the valid range
    pub fn with_level(level: i32) -> Self {
        let compression_level = if level < LEVEL_MIN {
            LEVEL_MIN
        } else if level > LEVEL_MAX {
            LEVEL_MAX
        } else {
            level
        };
        ZstdCodec { compression_level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for ZstdCodec {
    fn decode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        // A zero-length block carries no frame header to parse
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let inflated = zstd::decode_all(data)
            .map_err(|e| TiffError::codec(format!("zstd inflate: {}", e), None))?;
        trace!("zstd: {} -> {} bytes", data.len(), inflated.len());
        Ok(inflated)
    }

    fn encode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let deflated = zstd::encode_all(data, self.compression_level)
            .map_err(|e| TiffError::codec(format!("zstd deflate: {}", e), None))?;
        trace!(
            "zstd level {}: {} -> {} bytes",
            self.compression_level,
            data.len(),
            deflated.len()
        );
        Ok(deflated)
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u64 {
        14
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_pinned_to_the_valid_range() {
        assert_eq!(ZstdCodec::with_level(-5).compression_level, LEVEL_MIN);
        assert_eq!(ZstdCodec::with_level(9).compression_level, 9);
        assert_eq!(ZstdCodec::with_level(99).compression_level, LEVEL_MAX);
    }

    #[test]
    fn round_trips_including_empty_input() {
        let codec = ZstdCodec::new();
        let data = vec![7u8; 4096];
        let encoded = codec.encode(&data, &CodecOptions::default()).unwrap();
        assert_eq!(codec.decode(&encoded, &CodecOptions::default()).unwrap(), data);

        let empty = codec.encode(&[], &CodecOptions::default()).unwrap();
        assert!(codec.decode(&empty, &CodecOptions::default()).unwrap().is_empty());
    }
}
