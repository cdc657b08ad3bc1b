//! Codec capability trait
//!
//! A codec turns encoded tile bytes into unpacked bytes and back. The
//! engine treats codecs as opaque capabilities looked up by numeric
//! compression code; pixel-layout knowledge stays in the tile paths.

use crate::tiff::errors::TiffResult;
use crate::tile::tile::Tile;

/// Per-tile parameters a codec may consult
///
/// Most codecs ignore these entirely; image codecs (JPEG) need the
/// geometry to validate their own headers against the tile.
#[derive(Debug, Clone, Default)]
pub struct CodecOptions {
    pub tile_width: u32,
    pub tile_height: u32,
    pub samples_per_pixel: u32,
    pub bytes_per_sample: u32,
    /// Lossy codecs only; None means codec default
    pub quality: Option<u8>,
}

impl CodecOptions {
    /// Options describing a tile's geometry
    pub fn for_tile(tile: &Tile) -> Self {
        CodecOptions {
            tile_width: tile.tile_width(),
            tile_height: tile.tile_height(),
            samples_per_pixel: tile.samples_per_pixel(),
            bytes_per_sample: tile.bytes_per_sample(),
            quality: None,
        }
    }
}

/// Strategy trait for compression codecs
pub trait Codec: Send + Sync {
    /// Decompress encoded bytes into the file's sample layout
    fn decode(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>>;

    /// Compress unpacked bytes
    fn encode(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>>;

    /// Adapts default options to a concrete tile
    ///
    /// The default implementation overlays the tile's geometry on the
    /// defaults; codecs with richer option spaces override this.
    fn customize_options(&self, tile: &Tile, defaults: &CodecOptions) -> CodecOptions {
        CodecOptions {
            tile_width: tile.tile_width(),
            tile_height: tile.tile_height(),
            samples_per_pixel: tile.samples_per_pixel(),
            bytes_per_sample: tile.bytes_per_sample(),
            quality: defaults.quality,
        }
    }

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Get the compression code
    fn code(&self) -> u64;

    /// Whether this codec depends on context the engine cannot provide
    ///
    /// Codecs flagged here (externally supplied JPEG-2000 bindings, for
    /// example) are only usable in deployments that install that
    /// context; the registry reports them as unbound otherwise.
    fn needs_external_context(&self) -> bool {
        false
    }
}
