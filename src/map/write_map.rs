//! Write-side tile map
//!
//! A WriteMap stages the outgoing tiles of one image. The commit
//! protocol is built for streaming: `write_forward` reserves the IFD
//! and its offset/byte-count vectors at the current end of the file,
//! tiles are encoded and appended as they arrive, and
//! `complete_writing` backpatches the reserved region and links the
//! IFD into the chain. A failed or interrupted image is rolled back by
//! truncating to the pre-reservation length.

use std::collections::{HashMap, HashSet};

use log::{debug, trace, warn};

use crate::compression::CodecOptions;
use crate::map::read_map::MapGeometry;
use crate::tiff::constants::tags;
use crate::tiff::engine::TiffEngine;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::Ifd;
use crate::tiff::samples;
use crate::tiff::value::Value;
use crate::tile::index::TileIndex;
use crate::tile::tile::Tile;

/// Bookkeeping for the reserved IFD region
struct Reservation {
    /// Offset of the reserved region
    base: u64,
    /// Size of the reserved region
    size: u64,
    /// Next-IFD pointer position relative to `base`
    link_pos: u64,
    /// File length before the reservation, for rollback
    rollback_len: u64,
}

/// Staging area for the tiles of one outgoing image
pub struct WriteMap<'a> {
    engine: &'a TiffEngine,
    ifd: Ifd,
    geometry: MapGeometry,
    staged: HashMap<TileIndex, Tile>,
    committed: HashSet<TileIndex>,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
    reservation: Option<Reservation>,
    finished: bool,
}

impl<'a> WriteMap<'a> {
    pub(crate) fn new(engine: &'a TiffEngine, mut ifd: Ifd) -> TiffResult<Self> {
        // The map owns the block vectors; stale ones would corrupt the
        // reservation size
        ifd.remove(tags::TILE_OFFSETS);
        ifd.remove(tags::TILE_BYTE_COUNTS);
        ifd.remove(tags::STRIP_OFFSETS);
        ifd.remove(tags::STRIP_BYTE_COUNTS);

        // Stripped images default to a single strip when RowsPerStrip
        // is absent; make that explicit so geometry resolution and the
        // final IFD agree
        let tiled = ifd.has_tag(tags::TILE_WIDTH);
        if !tiled && !ifd.has_tag(tags::ROWS_PER_STRIP) {
            let height = ifd.image_height()?;
            ifd.put(tags::ROWS_PER_STRIP, Value::long(height as u32));
        }

        // Resolve geometry against a probe clone carrying block tags,
        // since MapGeometry insists on a valid layout
        let geometry = {
            let mut probe = ifd.clone();
            if tiled {
                probe.put(tags::TILE_OFFSETS, Value::Long(vec![0]));
                probe.put(tags::TILE_BYTE_COUNTS, Value::Long(vec![0]));
            } else {
                probe.put(tags::STRIP_OFFSETS, Value::Long(vec![0]));
                probe.put(tags::STRIP_BYTE_COUNTS, Value::Long(vec![0]));
            }
            MapGeometry::resolve(&probe)?
        };

        if !samples::is_octet_aligned(geometry.bits) {
            return Err(TiffError::MalformedIfd(format!(
                "writer requires whole-octet samples, got {} bits",
                geometry.bits
            )));
        }

        let blocks = (geometry.grid_width * geometry.grid_height) as usize
            * geometry.planes as usize;
        debug!(
            "WriteMap: {}x{} image, {} blocks, compression {}",
            geometry.image_width, geometry.image_height, blocks, geometry.compression
        );

        Ok(WriteMap {
            engine,
            ifd,
            geometry,
            staged: HashMap::new(),
            committed: HashSet::new(),
            offsets: vec![0; blocks],
            byte_counts: vec![0; blocks],
            reservation: None,
            finished: false,
        })
    }

    /// Nominal tile width of the target grid
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

    pub fn planes(&self) -> u32 {
        self.geometry.planes
    }

    /// Allocates an empty decoded-layout tile of the declared extent
    pub fn new_tile(&self, index: TileIndex) -> TiffResult<Tile> {
        self.check_index(index)?;
        let (size_x, size_y) = self.geometry.logical_extent(index.x, index.y);
        let storage_rows = self.geometry.storage_rows(index.y) as u32;
        Ok(Tile::blank(
            index,
            self.geometry.tile_width as u32,
            storage_rows,
            size_x,
            size_y,
            self.geometry.tile_channels,
            self.geometry.bytes_per_sample,
            0,
        ))
    }

    /// Transfers a tile into the map for deferred writing
    ///
    /// Staged tiles are encoded in raster order during
    /// `complete_writing`.
    pub fn put(&mut self, tile: Tile) -> TiffResult<()> {
        let index = tile.index();
        self.check_index(index)?;
        if self.committed.contains(&index) || self.staged.contains_key(&index) {
            return Err(TiffError::DuplicateTile(index));
        }
        self.staged.insert(index, tile);
        Ok(())
    }

    /// Reserves the IFD and block-vector space at the current end of
    /// the file
    ///
    /// Must be called before any tile is written. Metadata added to the
    /// IFD after this point would change the reserved size, so the tag
    /// set is frozen here.
    pub fn write_forward(&mut self) -> TiffResult<()> {
        if self.reservation.is_some() || self.finished {
            return Err(TiffError::GenericError(
                "write_forward called twice".to_string(),
            ));
        }

        let rollback_len = self.engine.file_len()?;
        self.install_block_vectors();

        // Length is offset-independent, so a probe serialization at
        // base 0 sizes the reservation exactly
        let (probe, link_pos) = self.engine.serialize_ifd(&self.ifd, 0)?;
        let size = probe.len() as u64;
        let base = self.engine.reserve_bytes(size)?;

        debug!(
            "reserved {} bytes for IFD at offset {} (rollback length {})",
            size, base, rollback_len
        );

        self.reservation = Some(Reservation {
            base,
            size,
            link_pos,
            rollback_len,
        });
        Ok(())
    }

    /// Encodes a tile and appends its bytes immediately
    ///
    /// `finish_row` signals that subsequent tiles belong to a
    /// different tile-row; codecs with row-local state would flush it
    /// here.
    pub fn write_tile(&mut self, tile: Tile, finish_row: bool) -> TiffResult<()> {
        if self.reservation.is_none() {
            return Err(TiffError::GenericError(
                "write_tile before write_forward".to_string(),
            ));
        }
        let index = tile.index();
        self.check_index(index)?;
        if self.committed.contains(&index) {
            return Err(TiffError::DuplicateTile(index));
        }

        let encoded = self.encode_tile(&tile)?;
        let offset = self.engine.append_bytes(&encoded)?;
        if !self.engine.is_big_tiff() && offset + encoded.len() as u64 > u32::MAX as u64 {
            return Err(TiffError::GenericError(
                "classic TIFF cannot address beyond 4 GiB; write BigTIFF instead".to_string(),
            ));
        }

        let k = index.linear(self.geometry.grid_width, self.geometry.grid_height) as usize;
        self.offsets[k] = offset;
        self.byte_counts[k] = encoded.len() as u64;
        self.committed.insert(index);

        trace!(
            "tile {} written: {} bytes at offset {}{}",
            index,
            encoded.len(),
            offset,
            if finish_row { " (row finished)" } else { "" }
        );
        Ok(())
    }

    /// Flushes staged tiles, backpatches the reserved region and links
    /// the IFD into the chain
    pub fn complete_writing(&mut self) -> TiffResult<()> {
        if self.finished {
            return Err(TiffError::GenericError(
                "complete_writing called twice".to_string(),
            ));
        }
        if self.reservation.is_none() {
            self.write_forward()?;
        }

        // Staged tiles go out in raster order: plane, then row, then
        // column
        let mut pending: Vec<TileIndex> = self.staged.keys().copied().collect();
        pending.sort_by_key(|i| (i.plane, i.y, i.x));
        for index in pending {
            if let Some(tile) = self.staged.remove(&index) {
                let finish_row = index.x as u64 + 1 == self.geometry.grid_width;
                self.write_tile(tile, finish_row)?;
            }
        }

        let uncommitted = self.offsets.iter().filter(|&&o| o == 0).count();
        if uncommitted > 0 {
            warn!(
                "completing image with {} blank (never-written) blocks",
                uncommitted
            );
        }

        self.install_block_vectors();
        let reservation = match self.reservation.as_ref() {
            Some(r) => r,
            None => {
                return Err(TiffError::GenericError(
                    "complete_writing without a reservation".to_string(),
                ))
            }
        };
        let (buffer, link_pos) = self.engine.serialize_ifd(&self.ifd, reservation.base)?;
        if buffer.len() as u64 != reservation.size || link_pos != reservation.link_pos {
            return Err(TiffError::GenericError(format!(
                "IFD changed between write_forward and complete_writing: reserved {} bytes, need {}",
                reservation.size,
                buffer.len()
            )));
        }

        self.engine.patch_bytes(reservation.base, &buffer)?;
        self.engine
            .link_ifd(self.ifd.clone(), reservation.base, reservation.base + link_pos)?;
        self.finished = true;
        debug!("image committed with IFD at offset {}", reservation.base);
        Ok(())
    }

    /// Rolls back everything this map wrote
    ///
    /// Truncates to the pre-`write_forward` length. The chain still
    /// ends at the previously committed IFD, so the file stays
    /// consistent.
    pub fn roll_back(&mut self) -> TiffResult<()> {
        if let Some(reservation) = self.reservation.take() {
            warn!(
                "rolling back partially-written image, truncating to {}",
                reservation.rollback_len
            );
            self.engine.truncate_to(reservation.rollback_len)?;
        }
        self.staged.clear();
        self.finished = true;
        Ok(())
    }

    /// Writes the current offset/byte-count vectors into the IFD
    fn install_block_vectors(&mut self) {
        let (offsets_tag, counts_tag) = if self.geometry.tiled {
            (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };

        if self.engine.is_big_tiff() {
            self.ifd.put(offsets_tag, Value::Long8(self.offsets.clone()));
            self.ifd
                .put(counts_tag, Value::Long8(self.byte_counts.clone()));
        } else {
            self.ifd.put(
                offsets_tag,
                Value::Long(self.offsets.iter().map(|&o| o as u32).collect()),
            );
            self.ifd.put(
                counts_tag,
                Value::Long(self.byte_counts.iter().map(|&c| c as u32).collect()),
            );
        }
    }

    /// Encodes one tile: predictor, byte order, then the codec
    fn encode_tile(&self, tile: &Tile) -> TiffResult<Vec<u8>> {
        let index = tile.index();
        let decoded = tile.decoded().ok_or_else(|| {
            TiffError::GenericError(format!("tile {} has no decoded pixels to write", index))
        })?;

        let mut buffer = decoded.to_vec();
        if self.geometry.predictor == crate::tiff::constants::predictor::HORIZONTAL_DIFFERENCING {
            samples::apply_horizontal_predictor(
                &mut buffer,
                self.geometry.tile_width as usize,
                self.geometry.tile_channels as usize,
                self.geometry.bytes_per_sample,
            )?;
        }
        // Byte swapping is an involution; the same routine maps native
        // order back to the file's order
        samples::swap_to_native(
            &mut buffer,
            self.geometry.bytes_per_sample,
            self.engine.byte_order(),
        );

        let codec = self.engine.registry().require(self.geometry.compression)?;
        let defaults = CodecOptions::default();
        let options = codec.customize_options(tile, &defaults);
        codec
            .encode(&buffer, &options)
            .map_err(|e| TiffError::codec(e.to_string(), Some(index)))
    }

    fn check_index(&self, index: TileIndex) -> TiffResult<()> {
        if index.x as u64 >= self.geometry.grid_width
            || index.y as u64 >= self.geometry.grid_height
            || index.plane >= self.geometry.planes
        {
            return Err(TiffError::BadRectangle(format!(
                "tile {} outside the {}x{} grid",
                index, self.geometry.grid_width, self.geometry.grid_height
            )));
        }
        Ok(())
    }
}
