//! Codec registry
//!
//! Maps numeric compression codes to codec capabilities. The registry
//! is open: deployments with external codec bindings (JPEG-2000,
//! vendor formats) register them next to the built-ins. A code the
//! engine knows by name but has no codec for fails with
//! `UnsupportedCompression` only when a decode or encode path actually
//! reaches it.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::tiff::errors::{TiffError, TiffResult};
use super::codec::{Codec, CodecOptions};
use super::deflate::DeflateCodec;
use super::jpeg::JpegCodec;
use super::lzw::LzwCodec;
use super::packbits::PackBitsCodec;
use super::zstd::ZstdCodec;

/// Codec for compression code 1: no compression
///
/// The encoded and unpacked representations coincide for this code, so
/// both directions just hand back an owned copy of the input. It lives
/// beside the registry because it exists only to give code 1 an entry
/// in the table.
pub struct UncompressedCodec;

impl Codec for UncompressedCodec {
    fn decode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn encode(&self, data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "None"
    }

    fn code(&self) -> u64 {
        1
    }
}

/// Lookup table from compression code to codec
pub struct CodecRegistry {
    codecs: HashMap<u64, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// An empty registry with no codecs bound
    pub fn empty() -> Self {
        CodecRegistry {
            codecs: HashMap::new(),
        }
    }

    /// A registry with every built-in codec bound
    pub fn with_builtins() -> Self {
        let mut registry = CodecRegistry::empty();
        registry.register(Arc::new(UncompressedCodec));
        registry.register(Arc::new(LzwCodec));
        registry.register(Arc::new(JpegCodec));
        registry.register(Arc::new(DeflateCodec::adobe()));
        registry.register(Arc::new(DeflateCodec::legacy()));
        registry.register(Arc::new(PackBitsCodec));
        registry.register(Arc::new(ZstdCodec::new()));
        registry
    }

    /// Binds a codec under its own code, replacing any previous binding
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        debug!("registering codec {} for code {}", codec.name(), codec.code());
        self.codecs.insert(codec.code(), codec);
    }

    /// Looks up the codec for a code
    pub fn get(&self, code: u64) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&code).cloned()
    }

    /// Looks up the codec for a code, failing when unbound or when the
    /// codec needs external context that was never supplied
    pub fn require(&self, code: u64) -> TiffResult<Arc<dyn Codec>> {
        match self.codecs.get(&code) {
            Some(codec) if !codec.needs_external_context() => Ok(codec.clone()),
            _ => Err(TiffError::UnsupportedCompression(code)),
        }
    }

    /// Codes currently bound, for reporting
    pub fn bound_codes(&self) -> Vec<u64> {
        let mut codes: Vec<u64> = self.codecs.keys().copied().collect();
        codes.sort_unstable();
        codes
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        CodecRegistry::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::compression;

    #[test]
    fn builtins_cover_the_named_lossless_codes() {
        let registry = CodecRegistry::with_builtins();
        for code in [
            compression::NONE,
            compression::LZW,
            compression::DEFLATE,
            compression::PROPRIETARY_DEFLATE,
            compression::PACKBITS,
        ] {
            assert!(registry.require(code).is_ok(), "code {} unbound", code);
        }
    }

    #[test]
    fn unbound_named_codes_fail_as_unsupported() {
        let registry = CodecRegistry::with_builtins();
        for code in [
            compression::JPEG_2000,
            compression::NIKON_NEF,
            compression::LURAWAVE,
        ] {
            match registry.require(code) {
                Err(TiffError::UnsupportedCompression(c)) => assert_eq!(c, code),
                other => panic!("expected UnsupportedCompression, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn both_deflate_codes_decode_identically() {
        let registry = CodecRegistry::with_builtins();
        let adobe = registry.require(compression::DEFLATE).unwrap();
        let legacy = registry.require(compression::PROPRIETARY_DEFLATE).unwrap();

        let data = vec![42u8; 512];
        let encoded = adobe.encode(&data, &CodecOptions::default()).unwrap();
        let decoded = legacy.decode(&encoded, &CodecOptions::default()).unwrap();
        assert_eq!(decoded, data);
    }
}
