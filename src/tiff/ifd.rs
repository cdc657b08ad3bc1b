//! Image File Directory (IFD) structures and methods
//!
//! An IFD is an ordered mapping from a 16-bit tag code to a typed
//! value, describing one image of a multi-image TIFF. IFDs read from a
//! file are immutable; the writer works on a mutable clone that is
//! frozen when it is committed to disk.

use std::collections::BTreeMap;
use std::fmt;

use log::trace;

use crate::tiff::constants::{photometric, planar_config, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::names;
use crate::tiff::value::Value;

/// Photometric interpretation of the samples in an image
///
/// Out-of-range codes map to `Unknown` rather than failing; the engine
/// only surfaces an error when it cannot proceed without the meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Photometric {
    WhiteIsZero,
    BlackIsZero,
    Rgb,
    Palette,
    TransparencyMask,
    Cmyk,
    YCbCr,
    CieLab,
    IccLab,
    CfaArray,
    Unknown(u16),
}

impl Photometric {
    /// Maps a raw tag value to the enum
    pub fn from_code(code: u16) -> Self {
        match code {
            photometric::WHITE_IS_ZERO => Photometric::WhiteIsZero,
            photometric::BLACK_IS_ZERO => Photometric::BlackIsZero,
            photometric::RGB => Photometric::Rgb,
            photometric::PALETTE => Photometric::Palette,
            photometric::TRANSPARENCY_MASK => Photometric::TransparencyMask,
            photometric::CMYK => Photometric::Cmyk,
            photometric::YCBCR => Photometric::YCbCr,
            photometric::CIELAB => Photometric::CieLab,
            photometric::ICCLAB => Photometric::IccLab,
            photometric::CFA_ARRAY => Photometric::CfaArray,
            other => Photometric::Unknown(other),
        }
    }

    /// Fill byte for pixels of a tile with no stored data
    ///
    /// Zero-length tile entries materialise as blank tiles; the blank
    /// value sits at the photometric-inversion boundary for inverted
    /// interpretations.
    pub fn blank_fill(&self) -> u8 {
        match self {
            Photometric::WhiteIsZero | Photometric::Cmyk => 0xFF,
            _ => 0x00,
        }
    }
}

/// Planar configuration of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanarConfig {
    /// Channels interleaved within each tile
    Chunky,
    /// One channel plane per tile
    Planar,
    Unknown(u16),
}

impl PlanarConfig {
    pub fn from_code(code: u16) -> Self {
        match code {
            planar_config::CHUNKY => PlanarConfig::Chunky,
            planar_config::PLANAR => PlanarConfig::Planar,
            other => PlanarConfig::Unknown(other),
        }
    }
}

/// An Image File Directory: ordered tag -> typed value mapping
#[derive(Debug, Clone)]
pub struct Ifd {
    /// Entries keyed by tag, kept in ascending tag order as the
    /// on-disk format requires
    entries: BTreeMap<u16, Value>,
    /// IFD number within the file (0-based)
    number: usize,
    /// Offset of this IFD in the file, 0 for IFDs not yet written
    offset: u64,
}

impl Ifd {
    /// Creates an empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        Ifd {
            entries: BTreeMap::new(),
            number,
            offset,
        }
    }

    /// The IFD's position in the file's chain
    pub fn number(&self) -> usize {
        self.number
    }

    /// File offset this IFD was read from (or written to)
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    pub(crate) fn set_number(&mut self, number: usize) {
        self.number = number;
    }

    /// Looks up a tag's typed value
    pub fn get(&self, tag: u16) -> Option<&Value> {
        let value = self.entries.get(&tag);
        trace!(
            "IFD #{}: tag {} ({}) {}",
            self.number,
            tag,
            names::tag_name(tag),
            if value.is_some() { "hit" } else { "miss" }
        );
        value
    }

    /// Inserts or replaces a tag value (writer-side IFDs only)
    pub fn put(&mut self, tag: u16, value: Value) {
        self.entries.insert(tag, value);
    }

    /// Removes a tag, returning its previous value
    pub fn remove(&mut self, tag: u16) -> Option<Value> {
        self.entries.remove(&tag)
    }

    /// Whether a tag is present
    pub fn has_tag(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Number of entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Iterates entries in ascending tag order
    pub fn entries(&self) -> impl Iterator<Item = (&u16, &Value)> {
        self.entries.iter()
    }

    /// First element of a numeric tag as u32, with a default
    pub fn get_int(&self, tag: u16, default: u32) -> u32 {
        self.get_long(tag, default as u64) as u32
    }

    /// First element of a numeric tag as u64, with a default
    pub fn get_long(&self, tag: u16, default: u64) -> u64 {
        self.entries
            .get(&tag)
            .and_then(|v| v.first_long())
            .unwrap_or(default)
    }

    /// All elements of a numeric tag widened to u64
    pub fn get_long_array(&self, tag: u16) -> Option<Vec<u64>> {
        self.entries.get(&tag).and_then(|v| v.as_long_array())
    }

    /// First element of a numeric tag, failing when absent
    ///
    /// Used for tags required by the layout; the error names the tag so
    /// malformed files produce an actionable message.
    fn require_long(&self, tag: u16) -> TiffResult<u64> {
        self.entries
            .get(&tag)
            .and_then(|v| v.first_long())
            .ok_or_else(|| {
                TiffError::MalformedIfd(format!(
                    "IFD #{} is missing required tag {} ({})",
                    self.number,
                    tag,
                    names::tag_name(tag)
                ))
            })
    }

    // Geometry and layout queries

    /// Image width in pixels
    pub fn image_width(&self) -> TiffResult<u64> {
        self.require_long(tags::IMAGE_WIDTH)
    }

    /// Image height in pixels
    pub fn image_height(&self) -> TiffResult<u64> {
        self.require_long(tags::IMAGE_LENGTH)
    }

    /// Number of samples per pixel (defaults to 1)
    pub fn samples_per_pixel(&self) -> u32 {
        self.get_int(tags::SAMPLES_PER_PIXEL, 1)
    }

    /// Bits per sample, one entry per channel (defaults to [1])
    pub fn bits_per_sample(&self) -> Vec<u32> {
        match self.get_long_array(tags::BITS_PER_SAMPLE) {
            Some(bits) if !bits.is_empty() => bits.iter().map(|&b| b as u32).collect(),
            _ => vec![1],
        }
    }

    /// Compression code (defaults to 1, uncompressed)
    pub fn compression_code(&self) -> u64 {
        self.get_long(tags::COMPRESSION, 1)
    }

    /// Photometric interpretation, `Unknown` for out-of-range codes
    pub fn photometric_interpretation(&self) -> Photometric {
        Photometric::from_code(self.get_int(tags::PHOTOMETRIC_INTERPRETATION, photometric::BLACK_IS_ZERO as u32) as u16)
    }

    /// Planar configuration (defaults to chunky)
    pub fn planar_configuration(&self) -> PlanarConfig {
        PlanarConfig::from_code(self.get_int(tags::PLANAR_CONFIGURATION, planar_config::CHUNKY as u32) as u16)
    }

    /// Whether the image data is addressed by tiles (vs strips)
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_OFFSETS)
    }

    /// Tile width; for stripped images this is the image width
    pub fn tile_width(&self) -> TiffResult<u64> {
        if self.is_tiled() {
            self.require_long(tags::TILE_WIDTH)
        } else {
            self.image_width()
        }
    }

    /// Tile height; for stripped images this is RowsPerStrip
    pub fn tile_height(&self) -> TiffResult<u64> {
        if self.is_tiled() {
            self.require_long(tags::TILE_LENGTH)
        } else {
            Ok(self.get_long(tags::ROWS_PER_STRIP, self.image_height()?))
        }
    }

    /// Number of tile columns covering the image
    pub fn tile_grid_width(&self) -> TiffResult<u64> {
        let width = self.image_width()?;
        let tile_width = self.tile_width()?;
        if tile_width == 0 {
            return Err(TiffError::MalformedIfd(format!(
                "IFD #{} declares a zero tile width",
                self.number
            )));
        }
        Ok(width.div_ceil(tile_width))
    }

    /// Number of tile rows covering the image
    pub fn tile_grid_height(&self) -> TiffResult<u64> {
        let height = self.image_height()?;
        let tile_height = self.tile_height()?;
        if tile_height == 0 {
            return Err(TiffError::MalformedIfd(format!(
                "IFD #{} declares a zero tile height",
                self.number
            )));
        }
        Ok(height.div_ceil(tile_height))
    }

    /// Offsets of the image data blocks (tiles or strips)
    pub fn data_offsets(&self) -> TiffResult<Vec<u64>> {
        let tag = if self.is_tiled() {
            tags::TILE_OFFSETS
        } else {
            tags::STRIP_OFFSETS
        };
        self.get_long_array(tag).ok_or_else(|| {
            TiffError::MalformedIfd(format!(
                "IFD #{} is missing required tag {} ({})",
                self.number,
                tag,
                names::tag_name(tag)
            ))
        })
    }

    /// Byte counts of the image data blocks (tiles or strips)
    pub fn data_byte_counts(&self) -> TiffResult<Vec<u64>> {
        let tag = if self.is_tiled() {
            tags::TILE_BYTE_COUNTS
        } else {
            tags::STRIP_BYTE_COUNTS
        };
        self.get_long_array(tag).ok_or_else(|| {
            TiffError::MalformedIfd(format!(
                "IFD #{} is missing required tag {} ({})",
                self.number,
                tag,
                names::tag_name(tag)
            ))
        })
    }

    /// Checks the strip-or-tile exclusivity invariant
    ///
    /// An IFD describing image data must carry either strip metadata or
    /// tile metadata, never both and never neither.
    pub fn validate_layout(&self) -> TiffResult<()> {
        let strips = self.has_tag(tags::STRIP_OFFSETS);
        let tiles = self.has_tag(tags::TILE_OFFSETS);
        match (strips, tiles) {
            (true, true) => Err(TiffError::MalformedIfd(format!(
                "IFD #{} carries both strip and tile metadata",
                self.number
            ))),
            (false, false) => Err(TiffError::MalformedIfd(format!(
                "IFD #{} carries neither strip nor tile metadata",
                self.number
            ))),
            _ => Ok(()),
        }
    }

    // Reporting

    /// Bytes this IFD's structure occupies on disk: the count field,
    /// the entry table, the next-IFD pointer, and the externally
    /// stored value payloads
    pub fn size_of_metadata(&self, big_tiff: bool) -> u64 {
        let (count_size, entry_size, link_size, inline) = if big_tiff {
            (8u64, 20u64, 8u64, 8u64)
        } else {
            (2, 12, 4, 4)
        };

        let external: u64 = self
            .entries
            .values()
            .map(|v| {
                let len = v.byte_len();
                if len > inline {
                    len
                } else {
                    0
                }
            })
            .sum();

        count_size + entry_size * self.entries.len() as u64 + link_size + external
    }

    /// Bytes of encoded image data this IFD points at
    pub fn size_of_data(&self) -> u64 {
        self.data_byte_counts()
            .map(|counts| counts.iter().sum())
            .unwrap_or(0)
    }
}

impl fmt::Display for Ifd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let (Ok(width), Ok(height)) = (self.image_width(), self.image_height()) {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }
        writeln!(f, "  Samples per pixel: {}", self.samples_per_pixel())?;

        writeln!(f, "  Tags:")?;
        for (tag, value) in &self.entries {
            let value_display = match *tag {
                tags::COMPRESSION => format!(
                    "{} ({})",
                    value.first_long().unwrap_or(0),
                    names::compression_name(value.first_long().unwrap_or(0))
                ),
                tags::PHOTOMETRIC_INTERPRETATION => format!(
                    "{} ({})",
                    value.first_long().unwrap_or(0),
                    names::photometric_name(value.first_long().unwrap_or(0))
                ),
                _ => match value {
                    Value::Ascii(s) => format!("{:?}", s),
                    v => v
                        .first_long()
                        .map(|x| x.to_string())
                        .unwrap_or_else(|| format!("{} elements", v.count())),
                },
            };

            writeln!(
                f,
                "    {} ({}): {} [{}]",
                tag,
                names::tag_name(*tag),
                value_display,
                names::field_type_name(value.field_type())
            )?;
        }

        Ok(())
    }
}
