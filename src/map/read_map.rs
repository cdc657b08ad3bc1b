//! Read-side tile map
//!
//! A ReadMap is a read-only view over one image: it enumerates the
//! tile grid, decodes tiles lazily through the cache, and assembles
//! rectangular pixel regions. Strips are width-spanning tiles, so one
//! code path serves both layouts.

use std::sync::Arc;

use log::{debug, trace};

use crate::compression::CodecOptions;
use crate::tiff::constants::tags;
use crate::tiff::engine::TiffEngine;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{Ifd, PlanarConfig, Photometric};
use crate::tiff::samples;
use crate::tile::cache::TileKey;
use crate::tile::index::TileIndex;
use crate::tile::tile::Tile;

/// Resolved geometry of one image, computed once per map
#[derive(Debug, Clone)]
pub(crate) struct MapGeometry {
    pub image_width: u64,
    pub image_height: u64,
    pub tile_width: u64,
    pub tile_height: u64,
    pub grid_width: u64,
    pub grid_height: u64,
    /// Channels of the whole image
    pub samples_per_pixel: u32,
    /// Channels stored within one tile (1 for planar layout)
    pub tile_channels: u32,
    /// Number of channel planes (1 for chunky layout)
    pub planes: u32,
    /// Declared bits per sample (uniform across channels)
    pub bits: u32,
    /// Whole-octet width of one decoded sample
    pub bytes_per_sample: u32,
    pub compression: u64,
    pub predictor: u16,
    pub photometric: Photometric,
    pub tiled: bool,
}

impl MapGeometry {
    pub(crate) fn resolve(ifd: &Ifd) -> TiffResult<Self> {
        ifd.validate_layout()?;

        let bits_vec = ifd.bits_per_sample();
        let bits = bits_vec[0];
        if bits_vec.iter().any(|&b| b != bits) {
            return Err(TiffError::MalformedIfd(format!(
                "IFD #{} mixes per-channel bit depths {:?}",
                ifd.number(),
                bits_vec
            )));
        }
        if bits == 0 || bits > 32 {
            return Err(TiffError::MalformedIfd(format!(
                "IFD #{} declares unsupported bit depth {}",
                ifd.number(),
                bits
            )));
        }

        let samples_per_pixel = ifd.samples_per_pixel();
        let planar = matches!(ifd.planar_configuration(), PlanarConfig::Planar);
        let (tile_channels, planes) = if planar {
            (1, samples_per_pixel)
        } else {
            (samples_per_pixel, 1)
        };

        Ok(MapGeometry {
            image_width: ifd.image_width()?,
            image_height: ifd.image_height()?,
            tile_width: ifd.tile_width()?,
            tile_height: ifd.tile_height()?,
            grid_width: ifd.tile_grid_width()?,
            grid_height: ifd.tile_grid_height()?,
            samples_per_pixel,
            tile_channels,
            planes,
            bits,
            bytes_per_sample: samples::octet_width(bits),
            compression: ifd.compression_code(),
            predictor: ifd.get_int(tags::PREDICTOR, 1) as u16,
            photometric: ifd.photometric_interpretation(),
            tiled: ifd.is_tiled(),
        })
    }

    /// Storage rows of the block at grid row `ty`
    ///
    /// Tiles are stored full-height with edge padding; the last strip
    /// of a stripped image is stored short.
    pub(crate) fn storage_rows(&self, ty: u32) -> u64 {
        if self.tiled {
            self.tile_height
        } else {
            let top = ty as u64 * self.tile_height;
            self.tile_height.min(self.image_height - top.min(self.image_height))
        }
    }

    /// Logical (unpadded) extent of the block at (tx, ty)
    pub(crate) fn logical_extent(&self, tx: u32, ty: u32) -> (u32, u32) {
        let left = tx as u64 * self.tile_width;
        let top = ty as u64 * self.tile_height;
        let size_x = self.tile_width.min(self.image_width.saturating_sub(left));
        let size_y = self.tile_height.min(self.image_height.saturating_sub(top));
        (size_x as u32, size_y as u32)
    }
}

/// Read-only tile view over one image of an open file
pub struct ReadMap<'a> {
    engine: &'a TiffEngine,
    ifd: Arc<Ifd>,
    image: usize,
    fingerprint: u64,
    geometry: MapGeometry,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
}

impl<'a> ReadMap<'a> {
    pub(crate) fn new(engine: &'a TiffEngine, image: usize) -> TiffResult<Self> {
        let ifd = engine.ifd(image)?;
        let geometry = MapGeometry::resolve(&ifd)?;
        let offsets = ifd.data_offsets()?;
        let byte_counts = ifd.data_byte_counts()?;

        let blocks = (geometry.grid_width * geometry.grid_height) as usize
            * geometry.planes as usize;
        if offsets.len() < blocks || byte_counts.len() < blocks {
            return Err(TiffError::MalformedIfd(format!(
                "IFD #{} declares {} blocks but stores {} offsets / {} byte counts",
                image,
                blocks,
                offsets.len(),
                byte_counts.len()
            )));
        }

        debug!(
            "ReadMap over image {}: {}x{}, grid {}x{}, {} plane(s), compression {}",
            image,
            geometry.image_width,
            geometry.image_height,
            geometry.grid_width,
            geometry.grid_height,
            geometry.planes,
            geometry.compression
        );

        Ok(ReadMap {
            fingerprint: engine.fingerprint(image),
            engine,
            ifd,
            image,
            geometry,
            offsets,
            byte_counts,
        })
    }

    /// The IFD this map reads from
    pub fn ifd(&self) -> &Arc<Ifd> {
        &self.ifd
    }

    pub fn image_width(&self) -> u64 {
        self.geometry.image_width
    }

    pub fn image_height(&self) -> u64 {
        self.geometry.image_height
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.geometry.samples_per_pixel
    }

    /// Whole-octet width of one decoded sample
    pub fn bytes_per_sample(&self) -> u32 {
        self.geometry.bytes_per_sample
    }

    /// Nominal tile width of the grid
    pub fn tile_width(&self) -> u64 {
        self.geometry.tile_width
    }

    /// Nominal tile height (RowsPerStrip for stripped images)
    pub fn tile_height(&self) -> u64 {
        self.geometry.tile_height
    }

    pub fn tile_grid_width(&self) -> u64 {
        self.geometry.grid_width
    }

    pub fn tile_grid_height(&self) -> u64 {
        self.geometry.grid_height
    }

    /// Total number of tiles across all planes
    pub fn number_of_tiles(&self) -> u64 {
        self.geometry.grid_width * self.geometry.grid_height * self.geometry.planes as u64
    }

    /// Builds the index of the tile at a grid position
    pub fn tile_index(&self, x: u32, y: u32) -> TileIndex {
        TileIndex::new(self.image, x, y)
    }

    /// Builds the index of one plane's tile at a grid position
    pub fn plane_tile_index(&self, x: u32, y: u32, plane: u32) -> TileIndex {
        TileIndex::planar(self.image, x, y, plane)
    }

    /// Fetches one decoded tile through the cache
    ///
    /// Concurrent calls are safe; same-index calls collapse onto a
    /// single decode.
    pub fn read_tile(&self, index: TileIndex) -> TiffResult<Arc<Tile>> {
        if index.image != self.image
            || index.x as u64 >= self.geometry.grid_width
            || index.y as u64 >= self.geometry.grid_height
            || index.plane >= self.geometry.planes
        {
            return Err(TiffError::BadRectangle(format!(
                "tile {} outside the grid of image {}",
                index, self.image
            )));
        }

        let key = TileKey::new(self.fingerprint, index);
        self.engine
            .cache()
            .read_tile(key, || self.decode_tile(index))
    }

    /// Reads a pixel rectangle, assembling it from the covering tiles
    ///
    /// The output is the canonical decoded layout: interleaved
    /// channels, native endianness, whole-octet samples, rows of
    /// `size_x` pixels. Pixels outside the image are never produced.
    pub fn read_rect(
        &self,
        from_x: u64,
        from_y: u64,
        size_x: u64,
        size_y: u64,
    ) -> TiffResult<Vec<u8>> {
        let geometry = &self.geometry;
        if size_x == 0 || size_y == 0 {
            return Err(TiffError::BadRectangle(format!(
                "empty rectangle {}x{}",
                size_x, size_y
            )));
        }
        if from_x + size_x > geometry.image_width || from_y + size_y > geometry.image_height {
            return Err(TiffError::BadRectangle(format!(
                "rectangle {}+{} x {}+{} outside image {}x{}",
                from_x, size_x, from_y, size_y, geometry.image_width, geometry.image_height
            )));
        }

        let spp = geometry.samples_per_pixel as usize;
        let bps = geometry.bytes_per_sample as usize;
        let pixel_size = spp * bps;
        let mut out = vec![0u8; size_x as usize * size_y as usize * pixel_size];

        let tx0 = (from_x / geometry.tile_width) as u32;
        let tx1 = ((from_x + size_x - 1) / geometry.tile_width) as u32;
        let ty0 = (from_y / geometry.tile_height) as u32;
        let ty1 = ((from_y + size_y - 1) / geometry.tile_height) as u32;

        trace!(
            "read_rect ({},{}) {}x{} covers tiles ({},{})..({},{})",
            from_x,
            from_y,
            size_x,
            size_y,
            tx0,
            ty0,
            tx1,
            ty1
        );

        for plane in 0..geometry.planes {
            for ty in ty0..=ty1 {
                for tx in tx0..=tx1 {
                    let index = TileIndex::planar(self.image, tx, ty, plane);
                    let tile = self.read_tile(index)?;
                    self.blit_tile(&tile, plane, from_x, from_y, size_x, size_y, &mut out);
                }
            }
        }

        Ok(out)
    }

    /// Copies the intersection of one tile into the output rectangle
    fn blit_tile(
        &self,
        tile: &Tile,
        plane: u32,
        from_x: u64,
        from_y: u64,
        size_x: u64,
        size_y: u64,
        out: &mut [u8],
    ) {
        let geometry = &self.geometry;
        let decoded = match tile.decoded() {
            Some(d) => d,
            None => return,
        };

        let tile_left = tile.index().x as u64 * geometry.tile_width;
        let tile_top = tile.index().y as u64 * geometry.tile_height;

        let overlap_x0 = from_x.max(tile_left);
        let overlap_x1 = (from_x + size_x).min(tile_left + tile.size_x() as u64);
        let overlap_y0 = from_y.max(tile_top);
        let overlap_y1 = (from_y + size_y).min(tile_top + tile.size_y() as u64);
        if overlap_x0 >= overlap_x1 || overlap_y0 >= overlap_y1 {
            return;
        }

        let spp = geometry.samples_per_pixel as usize;
        let bps = geometry.bytes_per_sample as usize;
        let tile_channels = tile.samples_per_pixel() as usize;
        let src_row_len = tile.tile_width() as usize * tile_channels * bps;
        let run_pixels = (overlap_x1 - overlap_x0) as usize;

        for y in overlap_y0..overlap_y1 {
            let src_row = (y - tile_top) as usize;
            let src_base = src_row * src_row_len + (overlap_x0 - tile_left) as usize * tile_channels * bps;
            let dst_base = ((y - from_y) as usize * size_x as usize
                + (overlap_x0 - from_x) as usize)
                * spp
                * bps;

            if geometry.planes == 1 {
                // Chunky source: rows are already interleaved
                let len = run_pixels * spp * bps;
                out[dst_base..dst_base + len].copy_from_slice(&decoded[src_base..src_base + len]);
            } else {
                // Planar source: scatter this plane's samples into the
                // interleaved output
                for i in 0..run_pixels {
                    let src = src_base + i * bps;
                    let dst = dst_base + i * spp * bps + plane as usize * bps;
                    out[dst..dst + bps].copy_from_slice(&decoded[src..src + bps]);
                }
            }
        }
    }

    /// Decodes one tile from its on-disk bytes
    ///
    /// Called by the cache on a miss, outside all cache locks except
    /// the tile's own decode gate.
    fn decode_tile(&self, index: TileIndex) -> TiffResult<Tile> {
        let geometry = &self.geometry;
        let k = index.linear(geometry.grid_width, geometry.grid_height) as usize;
        let (size_x, size_y) = geometry.logical_extent(index.x, index.y);
        let storage_rows = geometry.storage_rows(index.y) as u32;

        let encoded = self
            .engine
            .read_block_bytes(self.offsets[k], self.byte_counts[k])?;

        let raw = match encoded {
            Some(bytes) => bytes,
            None => {
                // Zero-length entry: a fully-blank tile
                debug!("tile {} has no stored bytes, materialising blank", index);
                return Ok(Tile::blank(
                    index,
                    geometry.tile_width as u32,
                    storage_rows,
                    size_x,
                    size_y,
                    geometry.tile_channels,
                    geometry.bytes_per_sample,
                    geometry.photometric.blank_fill(),
                ));
            }
        };

        let codec = self.engine.registry().require(geometry.compression)?;
        let options = CodecOptions {
            tile_width: geometry.tile_width as u32,
            tile_height: storage_rows,
            samples_per_pixel: geometry.tile_channels,
            bytes_per_sample: geometry.bytes_per_sample,
            quality: None,
        };
        let unpacked = codec
            .decode(&raw, &options)
            .map_err(|e| TiffError::codec(e.to_string(), Some(index)))?;

        let samples_per_row = geometry.tile_width as usize * geometry.tile_channels as usize;
        let mut decoded = if samples::is_octet_aligned(geometry.bits) {
            let mut buffer = unpacked;
            samples::swap_to_native(
                &mut buffer,
                geometry.bytes_per_sample,
                self.engine.byte_order(),
            );
            buffer
        } else {
            samples::unpack_to_octets(
                &unpacked,
                geometry.bits,
                samples_per_row,
                storage_rows as usize,
            )
            .map_err(|e| TiffError::codec(e.to_string(), Some(index)))?
        };

        let expected = samples_per_row * storage_rows as usize * geometry.bytes_per_sample as usize;
        if decoded.len() < expected {
            return Err(TiffError::codec(
                format!(
                    "tile decodes to {} bytes, expected {}",
                    decoded.len(),
                    expected
                ),
                Some(index),
            ));
        }
        decoded.truncate(expected);

        if geometry.predictor == crate::tiff::constants::predictor::HORIZONTAL_DIFFERENCING {
            samples::undo_horizontal_predictor(
                &mut decoded,
                geometry.tile_width as usize,
                geometry.tile_channels as usize,
                geometry.bytes_per_sample,
            )?;
        }

        let mut tile = Tile::new(
            index,
            geometry.tile_width as u32,
            storage_rows,
            size_x,
            size_y,
            geometry.tile_channels,
            geometry.bytes_per_sample,
        );
        tile.set_decoded(decoded);
        Ok(tile)
    }
}
