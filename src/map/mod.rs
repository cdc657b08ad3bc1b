//! Read and write maps
//!
//! A map binds one IFD to an engine and exposes the image as a grid of
//! tile indices. Read maps are stateless views (tile storage lives in
//! the cache); a write map owns its staged tiles until commit.

pub mod read_map;
pub mod write_map;

pub use read_map::ReadMap;
pub use write_map::WriteMap;
