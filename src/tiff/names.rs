//! Display names for TIFF codes
//!
//! Log lines, error messages and IFD summaries print tags and
//! enumerated values by name where one is known; everything else
//! falls back to "Unknown" so unrecognized codes never block output.

use crate::tiff::constants::{compression, field_types, photometric, tags};

/// Tag names keyed by code, kept sorted for binary search
const TAG_NAMES: &[(u16, &str)] = &[
    (tags::NEW_SUBFILE_TYPE, "NewSubfileType"),
    (tags::IMAGE_WIDTH, "ImageWidth"),
    (tags::IMAGE_LENGTH, "ImageLength"),
    (tags::BITS_PER_SAMPLE, "BitsPerSample"),
    (tags::COMPRESSION, "Compression"),
    (tags::PHOTOMETRIC_INTERPRETATION, "PhotometricInterpretation"),
    (tags::FILL_ORDER, "FillOrder"),
    (tags::IMAGE_DESCRIPTION, "ImageDescription"),
    (tags::STRIP_OFFSETS, "StripOffsets"),
    (tags::ORIENTATION, "Orientation"),
    (tags::SAMPLES_PER_PIXEL, "SamplesPerPixel"),
    (tags::ROWS_PER_STRIP, "RowsPerStrip"),
    (tags::STRIP_BYTE_COUNTS, "StripByteCounts"),
    (tags::X_RESOLUTION, "XResolution"),
    (tags::Y_RESOLUTION, "YResolution"),
    (tags::PLANAR_CONFIGURATION, "PlanarConfiguration"),
    (tags::RESOLUTION_UNIT, "ResolutionUnit"),
    (tags::SOFTWARE, "Software"),
    (tags::DATE_TIME, "DateTime"),
    (tags::PREDICTOR, "Predictor"),
    (tags::COLOR_MAP, "ColorMap"),
    (tags::TILE_WIDTH, "TileWidth"),
    (tags::TILE_LENGTH, "TileLength"),
    (tags::TILE_OFFSETS, "TileOffsets"),
    (tags::TILE_BYTE_COUNTS, "TileByteCounts"),
    (tags::SAMPLE_FORMAT, "SampleFormat"),
    (tags::JPEG_TABLES, "JPEGTables"),
    (tags::COPYRIGHT, "Copyright"),
];

/// Name of a tag, or "Unknown" for codes outside the table
pub fn tag_name(tag: u16) -> &'static str {
    TAG_NAMES
        .binary_search_by_key(&tag, |&(code, _)| code)
        .map(|i| TAG_NAMES[i].1)
        .unwrap_or("Unknown")
}

/// Name of an IFD element type
pub fn field_type_name(field_type: u16) -> &'static str {
    match field_type {
        field_types::BYTE => "BYTE",
        field_types::ASCII => "ASCII",
        field_types::SHORT => "SHORT",
        field_types::LONG => "LONG",
        field_types::RATIONAL => "RATIONAL",
        field_types::SBYTE => "SBYTE",
        field_types::UNDEFINED => "UNDEFINED",
        field_types::SSHORT => "SSHORT",
        field_types::SLONG => "SLONG",
        field_types::SRATIONAL => "SRATIONAL",
        field_types::FLOAT => "FLOAT",
        field_types::DOUBLE => "DOUBLE",
        field_types::LONG8 => "LONG8",
        field_types::SLONG8 => "SLONG8",
        field_types::IFD8 => "IFD8",
        _ => "Unknown",
    }
}

/// Name of a compression code
///
/// Covers every code the engine recognizes, bound to a codec or not,
/// so an unbound code still reports something readable in errors.
pub fn compression_name(code: u64) -> &'static str {
    match code {
        compression::NONE => "None",
        compression::LZW => "LZW",
        compression::JPEG => "JPEG",
        compression::DEFLATE => "Adobe Deflate",
        compression::ZSTD => "Zstandard",
        compression::PACKBITS => "PackBits",
        compression::PROPRIETARY_DEFLATE => "Deflate (legacy code)",
        compression::JPEG_2000 => "JPEG-2000",
        compression::JPEG_2000_APERIO_YCBCR => "JPEG-2000 (Aperio YCbCr)",
        compression::JPEG_2000_APERIO_RGB => "JPEG-2000 (Aperio RGB)",
        compression::NIKON_NEF => "Nikon NEF",
        compression::LURAWAVE => "LuraWave",
        _ => "Unknown",
    }
}

/// Name of a PhotometricInterpretation value
pub fn photometric_name(code: u64) -> &'static str {
    match code as u16 {
        photometric::WHITE_IS_ZERO => "WhiteIsZero",
        photometric::BLACK_IS_ZERO => "BlackIsZero",
        photometric::RGB => "RGB",
        photometric::PALETTE => "Palette",
        photometric::TRANSPARENCY_MASK => "TransparencyMask",
        photometric::CMYK => "CMYK",
        photometric::YCBCR => "YCbCr",
        photometric::CIELAB => "CIELAB",
        photometric::ICCLAB => "ICCLAB",
        photometric::CFA_ARRAY => "CFAArray",
        _ => "Unknown",
    }
}
