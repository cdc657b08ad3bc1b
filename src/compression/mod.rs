//! Compression codecs for tile data
//!
//! Codecs are opaque capabilities looked up by numeric compression
//! code through the registry; everything above this module is codec
//! agnostic.

mod codec;
mod registry;
mod lzw;
mod deflate;
mod packbits;
mod jpeg;
mod zstd;

pub use codec::{Codec, CodecOptions};
pub use registry::{CodecRegistry, UncompressedCodec};
pub use lzw::LzwCodec;
pub use deflate::DeflateCodec;
pub use packbits::PackBitsCodec;
pub use jpeg::JpegCodec;
pub use self::zstd::ZstdCodec;
