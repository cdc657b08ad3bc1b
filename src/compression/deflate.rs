//! Codec for Deflate (zlib) compressed data
//!
//! Two compression codes mean the same byte stream: 8 is the Adobe
//! registration, 32946 the older informal one. One codec serves both,
//! instantiated once per code so errors and registry lookups report
//! the code that was actually in the file.

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::tiff::errors::TiffResult;
use super::codec::{Codec, CodecOptions};

/// Deflate codec (compression codes 8 and 32946)
pub struct DeflateCodec {
    code: u64,
}

impl DeflateCodec {
    /// The Adobe-registered code 8
    pub fn adobe() -> Self {
        DeflateCodec { code: 8 }
    }

    /// The legacy code 32946
    pub fn legacy() -> Self {
        DeflateCodec { code: 32946 }
    }
}

impl Codec for DeflateCodec {
    fn decode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        // Tile data rarely compresses below 1:4, so seed the buffer
        let mut inflated = Vec::with_capacity(data.len().saturating_mul(4));
        ZlibDecoder::new(data).read_to_end(&mut inflated)?;
        Ok(inflated)
    }

    fn encode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &'static str {
        "Adobe Deflate"
    }

    fn code(&self) -> u64 {
        self.code
    }
}
