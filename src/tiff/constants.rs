//! Numeric constants of the TIFF and BigTIFF formats
//!
//! Everything in here is fixed by the format: magic numbers, tag
//! codes, element types and the enumerated tag values the engine
//! interprets. Grouped by the part of the file that consumes them.

/// File header magic
pub mod header {
    /// Version word identifying a classic TIFF (the famous 42)
    pub const TIFF_VERSION: u16 = 42;

    /// Version word identifying a BigTIFF
    pub const BIG_TIFF_VERSION: u16 = 43;

    /// "II": every following number is little-endian
    pub const LITTLE_ENDIAN_MARKER: [u8; 2] = [0x49, 0x49];

    /// "MM": every following number is big-endian
    pub const BIG_ENDIAN_MARKER: [u8; 2] = [0x4D, 0x4D];

    /// BigTIFF headers restate their offset width; only 8 is defined
    pub const BIGTIFF_OFFSET_SIZE: u16 = 8;

    /// Bytes before the first IFD pointer's end, classic layout
    pub const CLASSIC_HEADER_SIZE: u64 = 8;

    /// Bytes before the first IFD pointer's end, BigTIFF layout
    pub const BIGTIFF_HEADER_SIZE: u64 = 16;
}

/// Element types an IFD entry may declare
///
/// Types 1 through 12 are classic TIFF; 16 through 18 exist only in
/// BigTIFF files. The numeric gap is part of the format.
pub mod field_types {
    pub const BYTE: u16 = 1;
    pub const ASCII: u16 = 2;
    pub const SHORT: u16 = 3;
    pub const LONG: u16 = 4;
    pub const RATIONAL: u16 = 5;
    pub const SBYTE: u16 = 6;
    pub const UNDEFINED: u16 = 7;
    pub const SSHORT: u16 = 8;
    pub const SLONG: u16 = 9;
    pub const SRATIONAL: u16 = 10;
    pub const FLOAT: u16 = 11;
    pub const DOUBLE: u16 = 12;
    pub const LONG8: u16 = 16;
    pub const SLONG8: u16 = 17;
    pub const IFD8: u16 = 18;
}

/// Tag codes the engine reads or writes, in numeric order
pub mod tags {
    /// Bit flags describing the image's role in the document
    pub const NEW_SUBFILE_TYPE: u16 = 254;
    /// Pixels per row
    pub const IMAGE_WIDTH: u16 = 256;
    /// Rows in the image
    pub const IMAGE_LENGTH: u16 = 257;
    /// Per-channel sample width in bits
    pub const BITS_PER_SAMPLE: u16 = 258;
    /// Codec code for the stored tile/strip bytes
    pub const COMPRESSION: u16 = 259;
    /// How sample values map to colour
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;
    /// Bit packing direction within a byte
    pub const FILL_ORDER: u16 = 266;
    /// Free-text description; drives the image-kind heuristic
    pub const IMAGE_DESCRIPTION: u16 = 270;
    /// Where each strip's bytes start
    pub const STRIP_OFFSETS: u16 = 273;
    /// Display orientation of the raster
    pub const ORIENTATION: u16 = 274;
    /// Channels per pixel
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    /// Rows grouped into one strip
    pub const ROWS_PER_STRIP: u16 = 278;
    /// Stored length of each strip
    pub const STRIP_BYTE_COUNTS: u16 = 279;
    /// Pixels per resolution unit, horizontally
    pub const X_RESOLUTION: u16 = 282;
    /// Pixels per resolution unit, vertically
    pub const Y_RESOLUTION: u16 = 283;
    /// Channel interleaving: chunky or one plane per tile
    pub const PLANAR_CONFIGURATION: u16 = 284;
    /// Unit for the resolution tags
    pub const RESOLUTION_UNIT: u16 = 296;
    /// Producing software
    pub const SOFTWARE: u16 = 305;
    /// Creation timestamp
    pub const DATE_TIME: u16 = 306;
    /// Differencing applied before compression
    pub const PREDICTOR: u16 = 317;
    /// Palette for colour-mapped images
    pub const COLOR_MAP: u16 = 320;
    /// Pixels per tile row
    pub const TILE_WIDTH: u16 = 322;
    /// Rows per tile
    pub const TILE_LENGTH: u16 = 323;
    /// Where each tile's bytes start
    pub const TILE_OFFSETS: u16 = 324;
    /// Stored length of each tile
    pub const TILE_BYTE_COUNTS: u16 = 325;
    /// Signed/unsigned/float interpretation of samples
    pub const SAMPLE_FORMAT: u16 = 339;
    /// Quantization and Huffman tables shared by JPEG tiles
    pub const JPEG_TABLES: u16 = 347;
    /// Copyright notice
    pub const COPYRIGHT: u16 = 33432;
}

/// Compression codes the engine knows by name
///
/// Codes not listed here can still flow through the codec registry if
/// a caller binds an external codec to the numeric code.
pub mod compression {
    /// Stored bytes are the raw sample bytes
    pub const NONE: u64 = 1;
    /// LZW, MSB-first with the early code-width switch
    pub const LZW: u64 = 5;
    /// Baseline JPEG inside tiles
    pub const JPEG: u64 = 7;
    /// Deflate under its Adobe registration
    pub const DEFLATE: u64 = 8;
    /// Zstandard, as written by GDAL
    pub const ZSTD: u64 = 14;
    /// Run-length PackBits
    pub const PACKBITS: u64 = 32773;
    /// Deflate under its older informal code
    pub const PROPRIETARY_DEFLATE: u64 = 32946;
    /// JPEG-2000, Aperio YCbCr flavour
    pub const JPEG_2000_APERIO_YCBCR: u64 = 33003;
    /// JPEG-2000, generic registration
    pub const JPEG_2000: u64 = 33004;
    /// JPEG-2000, Aperio RGB flavour
    pub const JPEG_2000_APERIO_RGB: u64 = 33005;
    /// Nikon's NEF raw encoding
    pub const NIKON_NEF: u64 = 34713;
    /// LuraWave, decodable only with a vendor licence
    pub const LURAWAVE: u64 = 65535;
}

/// PhotometricInterpretation values
pub mod photometric {
    /// Inverted grayscale: sample 0 renders white
    pub const WHITE_IS_ZERO: u16 = 0;
    /// Grayscale: sample 0 renders black
    pub const BLACK_IS_ZERO: u16 = 1;
    pub const RGB: u16 = 2;
    /// Samples index into the ColorMap tag
    pub const PALETTE: u16 = 3;
    /// One-bit mask over another image
    pub const TRANSPARENCY_MASK: u16 = 4;
    /// Ink model; 0 means no ink, so blanks are 0xFF
    pub const CMYK: u16 = 5;
    pub const YCBCR: u16 = 6;
    pub const CIELAB: u16 = 8;
    pub const ICCLAB: u16 = 9;
    /// Un-demosaiced sensor data
    pub const CFA_ARRAY: u16 = 32803;
}

/// PlanarConfiguration values
pub mod planar_config {
    /// All channels of a pixel stored together in each tile
    pub const CHUNKY: u16 = 1;
    /// Each tile holds a single channel plane
    pub const PLANAR: u16 = 2;
}

/// SampleFormat values
pub mod sample_format {
    pub const UNSIGNED: u16 = 1;
    pub const SIGNED: u16 = 2;
    /// IEEE floating point
    pub const IEEEFP: u16 = 3;
    /// Declared meaningless by the writer
    pub const VOID: u16 = 4;
}

/// Predictor values
pub mod predictor {
    /// Samples stored as-is
    pub const NONE: u16 = 1;
    /// Each sample stored as a delta from its left neighbour
    pub const HORIZONTAL_DIFFERENCING: u16 = 2;
    /// Byte-shuffled floating point deltas
    pub const FLOATING_POINT: u16 = 3;
}
