//! Custom error types for TIFF processing

use std::fmt;
use std::io;

use crate::tile::index::TileIndex;

/// TIFF-specific error types
#[derive(Debug)]
pub enum TiffError {
    /// I/O error
    IoError(io::Error),
    /// Invalid TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// An offset or length points past the end of the file,
    /// or the header could not be read in full
    TruncatedFile(String),
    /// Required tag missing, type/count mismatch, or IFD offset cycle
    MalformedIfd(String),
    /// Compression code known but no codec bound
    UnsupportedCompression(u64),
    /// A codec raised a condition while decoding or encoding
    CodecError {
        /// Message from the originating codec
        message: String,
        /// Tile being processed when the codec failed, if any
        tile: Option<TileIndex>,
    },
    /// Requested region is outside image bounds or empty
    BadRectangle(String),
    /// A writer committed the same tile twice
    DuplicateTile(TileIndex),
    /// Generic error with message
    GenericError(String),
}

impl TiffError {
    /// Wraps a codec failure, attaching the tile being worked on
    pub fn codec(message: impl Into<String>, tile: Option<TileIndex>) -> Self {
        TiffError::CodecError {
            message: message.into(),
            tile,
        }
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::IoError(e) => write!(f, "I/O error: {}", e),
            TiffError::InvalidHeader => write!(f, "Invalid TIFF header"),
            TiffError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            TiffError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            TiffError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            TiffError::TruncatedFile(msg) => write!(f, "Truncated file: {}", msg),
            TiffError::MalformedIfd(msg) => write!(f, "Malformed IFD: {}", msg),
            TiffError::UnsupportedCompression(c) => {
                write!(f, "Unsupported compression method: {}", c)
            }
            TiffError::CodecError { message, tile } => match tile {
                Some(idx) => write!(f, "Codec error at tile {}: {}", idx, message),
                None => write!(f, "Codec error: {}", message),
            },
            TiffError::BadRectangle(msg) => write!(f, "Bad rectangle: {}", msg),
            TiffError::DuplicateTile(idx) => write!(f, "Tile {} committed twice", idx),
            TiffError::GenericError(msg) => write!(f, "TIFF error: {}", msg),
        }
    }
}

impl std::error::Error for TiffError {}

impl From<io::Error> for TiffError {
    fn from(error: io::Error) -> Self {
        TiffError::IoError(error)
    }
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}
