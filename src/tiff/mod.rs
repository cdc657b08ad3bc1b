//! TIFF file format core
//!
//! This module provides the structures for reading and writing
//! TIFF and BigTIFF format files: typed IFDs, sample layout handling
//! and the file engine itself.

pub mod constants;
pub mod errors;
pub mod value;
pub mod ifd;
pub mod names;
pub mod samples;
pub mod engine;

#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{TiffError, TiffResult};
pub use value::Value;
pub use ifd::{Ifd, PlanarConfig, Photometric};
pub use samples::SampleKind;
pub use engine::TiffEngine;
