//! Sample layout handling
//!
//! The decoded representation of a tile always holds interleaved,
//! native-endian, whole-octet samples. This module provides the pieces
//! that get raw file bytes into that shape: the canonical sample-kind
//! codes, expansion of packed sub-byte samples, byte-order swaps and
//! the horizontal predictor.

use log::trace;

use crate::bits::BitUnpacker;
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::sample_format;
use crate::tiff::errors::{TiffError, TiffResult};

/// The eight canonical sample types
///
/// The numeric codes are stable and ordered by (width, signedness,
/// float-ness) the way downstream consumers expect them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl SampleKind {
    /// The stable numeric code, 0..=7
    pub fn code(&self) -> u8 {
        match self {
            SampleKind::Int8 => 0,
            SampleKind::UInt8 => 1,
            SampleKind::Int16 => 2,
            SampleKind::UInt16 => 3,
            SampleKind::Int32 => 4,
            SampleKind::UInt32 => 5,
            SampleKind::Float32 => 6,
            SampleKind::Float64 => 7,
        }
    }

    /// Bytes one sample of this kind occupies
    pub fn byte_width(&self) -> u32 {
        match self {
            SampleKind::Int8 | SampleKind::UInt8 => 1,
            SampleKind::Int16 | SampleKind::UInt16 => 2,
            SampleKind::Int32 | SampleKind::UInt32 | SampleKind::Float32 => 4,
            SampleKind::Float64 => 8,
        }
    }

    /// Derives the kind from the decoded byte width and SampleFormat tag
    pub fn from_layout(bytes_per_sample: u32, format: u16) -> TiffResult<Self> {
        let signed = format == sample_format::SIGNED;
        let float = format == sample_format::IEEEFP;

        match (bytes_per_sample, signed, float) {
            (1, false, false) => Ok(SampleKind::UInt8),
            (1, true, false) => Ok(SampleKind::Int8),
            (2, false, false) => Ok(SampleKind::UInt16),
            (2, true, false) => Ok(SampleKind::Int16),
            (4, false, false) => Ok(SampleKind::UInt32),
            (4, true, false) => Ok(SampleKind::Int32),
            (4, _, true) => Ok(SampleKind::Float32),
            (8, _, true) => Ok(SampleKind::Float64),
            _ => Err(TiffError::MalformedIfd(format!(
                "unsupported sample layout: {} bytes, format {}",
                bytes_per_sample, format
            ))),
        }
    }
}

/// Whole-octet width a packed sample of `bits` expands to
pub fn octet_width(bits: u32) -> u32 {
    match bits {
        0..=8 => 1,
        9..=16 => 2,
        _ => 4,
    }
}

/// Whether samples of this width can be memcpy'd straight through
pub fn is_octet_aligned(bits: u32) -> bool {
    matches!(bits, 8 | 16 | 32 | 64)
}

/// Expands packed MSB-first samples to whole octets
///
/// `samples_per_row` counts individual samples (pixels times channels
/// for interleaved data). Every row starts on a byte boundary, which is
/// how TIFF pads packed rows. Output samples are native-endian.
pub fn unpack_to_octets(
    packed: &[u8],
    bits: u32,
    samples_per_row: usize,
    rows: usize,
) -> TiffResult<Vec<u8>> {
    let width = octet_width(bits);
    let mut out = Vec::with_capacity(samples_per_row * rows * width as usize);
    let mut unpacker = BitUnpacker::new(packed);

    trace!(
        "unpacking {} rows of {} samples at {} bits",
        rows,
        samples_per_row,
        bits
    );

    for _ in 0..rows {
        for _ in 0..samples_per_row {
            let sample = unpacker.get_bits(bits);
            if unpacker.is_eof() {
                return Err(TiffError::TruncatedFile(format!(
                    "packed sample data ends early at bit {}",
                    unpacker.position()
                )));
            }
            match width {
                1 => out.push(sample as u8),
                2 => out.extend_from_slice(&(sample as u16).to_ne_bytes()),
                _ => out.extend_from_slice(&(sample as u32).to_ne_bytes()),
            }
        }
        unpacker.skip_to_next_byte();
    }

    Ok(out)
}

/// Swaps multi-byte samples from the file's order to native order
///
/// A no-op for single-byte samples or when the file order matches the
/// host. Works in place; the buffer length must be a multiple of the
/// sample width.
pub fn swap_to_native(buffer: &mut [u8], bytes_per_sample: u32, file_order: ByteOrder) {
    if bytes_per_sample <= 1 || file_order.is_native() {
        return;
    }
    let width = bytes_per_sample as usize;
    for chunk in buffer.chunks_exact_mut(width) {
        chunk.reverse();
    }
}

/// Undoes horizontal differencing (predictor 2) after decompression
///
/// Each sample was stored as the difference from the sample one pixel
/// to its left in the same channel. Supported for 1- and 2-byte
/// integer samples; wider layouts do not use this predictor in
/// practice and are rejected.
pub fn undo_horizontal_predictor(
    buffer: &mut [u8],
    row_pixels: usize,
    samples_per_pixel: usize,
    bytes_per_sample: u32,
) -> TiffResult<()> {
    match bytes_per_sample {
        1 => {
            let stride = samples_per_pixel;
            for row in buffer.chunks_exact_mut(row_pixels * stride) {
                for i in stride..row.len() {
                    row[i] = row[i].wrapping_add(row[i - stride]);
                }
            }
            Ok(())
        }
        2 => {
            let stride = samples_per_pixel;
            for row in buffer.chunks_exact_mut(row_pixels * stride * 2) {
                for i in stride..row_pixels * stride {
                    let prev = u16::from_ne_bytes([row[(i - stride) * 2], row[(i - stride) * 2 + 1]]);
                    let cur = u16::from_ne_bytes([row[i * 2], row[i * 2 + 1]]);
                    let sum = cur.wrapping_add(prev).to_ne_bytes();
                    row[i * 2] = sum[0];
                    row[i * 2 + 1] = sum[1];
                }
            }
            Ok(())
        }
        other => Err(TiffError::GenericError(format!(
            "horizontal predictor not supported for {}-byte samples",
            other
        ))),
    }
}

/// Applies horizontal differencing (predictor 2) before compression
pub fn apply_horizontal_predictor(
    buffer: &mut [u8],
    row_pixels: usize,
    samples_per_pixel: usize,
    bytes_per_sample: u32,
) -> TiffResult<()> {
    match bytes_per_sample {
        1 => {
            let stride = samples_per_pixel;
            for row in buffer.chunks_exact_mut(row_pixels * stride) {
                for i in (stride..row.len()).rev() {
                    row[i] = row[i].wrapping_sub(row[i - stride]);
                }
            }
            Ok(())
        }
        2 => {
            let stride = samples_per_pixel;
            for row in buffer.chunks_exact_mut(row_pixels * stride * 2) {
                for i in (stride..row_pixels * stride).rev() {
                    let prev = u16::from_ne_bytes([row[(i - stride) * 2], row[(i - stride) * 2 + 1]]);
                    let cur = u16::from_ne_bytes([row[i * 2], row[i * 2 + 1]]);
                    let diff = cur.wrapping_sub(prev).to_ne_bytes();
                    row[i * 2] = diff[0];
                    row[i * 2 + 1] = diff[1];
                }
            }
            Ok(())
        }
        other => Err(TiffError::GenericError(format!(
            "horizontal predictor not supported for {}-byte samples",
            other
        ))),
    }
}
