pub mod bits;
pub mod config;
pub mod io;
pub mod tiff;
pub mod tile;
pub mod map;
pub mod compression;
pub mod copier;
pub mod kind;

pub use config::TiffOptions;
pub use tiff::{Ifd, TiffEngine, TiffError, TiffResult, Value};
pub use tile::{Tile, TileCache, TileIndex};
pub use map::{ReadMap, WriteMap};
pub use compression::{Codec, CodecOptions, CodecRegistry};
pub use copier::{Copier, CopyOutcome, CopyProgress};
pub use bits::BitUnpacker;
pub use kind::ImageKind;
