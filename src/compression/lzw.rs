//! Codec for LZW compressed data
//!
//! TIFF's LZW variant packs variable-width codes MSB-first and bumps
//! the code width one code early; `weezl` implements exactly this
//! dialect behind its TIFF size-switch constructors.

use weezl::{decode, encode, BitOrder};

use crate::tiff::errors::{TiffError, TiffResult};
use super::codec::{Codec, CodecOptions};

/// LZW codec (compression code 5)
pub struct LzwCodec;

impl Codec for LzwCodec {
    fn decode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let mut decompressed = Vec::new();
        let mut decoder = decode::Decoder::with_tiff_size_switch(BitOrder::Msb, 8);
        let result = decoder.into_stream(&mut decompressed).decode_all(data);
        match result.status {
            Ok(_) => Ok(decompressed),
            Err(e) => Err(TiffError::codec(format!("LZW decode: {}", e), None)),
        }
    }

    fn encode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let mut compressed = Vec::new();
        let mut encoder = encode::Encoder::with_tiff_size_switch(BitOrder::Msb, 8);
        let result = encoder.into_stream(&mut compressed).encode_all(data);
        match result.status {
            Ok(_) => Ok(compressed),
            Err(e) => Err(TiffError::codec(format!("LZW encode: {}", e), None)),
        }
    }

    fn name(&self) -> &'static str {
        "LZW"
    }

    fn code(&self) -> u64 {
        5
    }
}
