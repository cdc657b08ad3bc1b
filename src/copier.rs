//! Image-to-image and file-to-file copying
//!
//! The copier sits on top of the tile engine and exercises both I/O
//! paths: direct mode streams encoded tile bytes between files without
//! touching a codec; transcoding mode decodes every source tile
//! through the cache and re-encodes it for the target. Progress and
//! cancellation are cooperative through caller-supplied callbacks
//! polled between tiles.

use log::{debug, info, warn};

use crate::tiff::constants::tags;
use crate::tiff::engine::TiffEngine;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::Ifd;
use crate::tiff::value::Value;
use crate::tile::index::TileIndex;

/// Progress report delivered after every tile and every image
#[derive(Debug, Clone)]
pub struct CopyProgress {
    pub image: usize,
    pub images_total: usize,
    pub tiles_done: u64,
    pub tiles_total: u64,
    /// True for the per-image report that follows the last tile
    pub image_complete: bool,
}

/// Result of a copy run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Images fully committed to the target
    pub images_copied: usize,
    /// True when the interruption predicate stopped the run
    pub interrupted: bool,
}

type ProgressFn<'c> = Box<dyn Fn(&CopyProgress) + 'c>;
type InterruptFn<'c> = Box<dyn Fn() -> bool + 'c>;
type CorrectorFn<'c> = Box<dyn Fn(&mut Ifd) + 'c>;

/// Copies images between engines
pub struct Copier<'c> {
    direct_copy: bool,
    progress: Option<ProgressFn<'c>>,
    interrupt: Option<InterruptFn<'c>>,
    corrector: Option<CorrectorFn<'c>>,
}

impl<'c> Copier<'c> {
    /// Creates a copier; `direct_copy` selects the pass-through path
    /// where source and target are compatible
    pub fn new(direct_copy: bool) -> Self {
        Copier {
            direct_copy,
            progress: None,
            interrupt: None,
            corrector: None,
        }
    }

    /// Creates a copier configured from engine options
    pub fn from_options(options: &crate::config::TiffOptions) -> Self {
        Copier::new(options.direct_copy)
    }

    /// Installs a progress notifier
    pub fn with_progress(mut self, callback: impl Fn(&CopyProgress) + 'c) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Installs an interruption predicate, polled between tiles
    pub fn with_interrupt(mut self, predicate: impl Fn() -> bool + 'c) -> Self {
        self.interrupt = Some(Box::new(predicate));
        self
    }

    /// Installs a metadata corrector for direct copies
    ///
    /// The corrector must not touch tags that alter the pixel layout
    /// (geometry, sample layout, compression, block vectors); direct
    /// mode streams the encoded bytes unchanged.
    pub fn with_corrector(mut self, corrector: impl Fn(&mut Ifd) + 'c) -> Self {
        self.corrector = Some(Box::new(corrector));
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt.as_ref().map(|p| p()).unwrap_or(false)
    }

    fn notify(&self, report: CopyProgress) {
        if let Some(progress) = &self.progress {
            progress(&report);
        }
    }

    /// Copies every image of the source file into the target
    ///
    /// Interruption leaves the target consistent up to the last fully
    /// committed image.
    pub fn copy_all(&self, src: &TiffEngine, dst: &TiffEngine) -> TiffResult<CopyOutcome> {
        let images_total = src.number_of_images();
        info!(
            "copying {} image(s), mode: {}",
            images_total,
            if self.direct_copy { "direct" } else { "transcode" }
        );

        for image in 0..images_total {
            if self.interrupted() {
                info!("copy interrupted before image {}", image);
                return Ok(CopyOutcome {
                    images_copied: image,
                    interrupted: true,
                });
            }
            if !self.copy_image(src, dst, image)? {
                return Ok(CopyOutcome {
                    images_copied: image,
                    interrupted: true,
                });
            }
        }

        Ok(CopyOutcome {
            images_copied: images_total,
            interrupted: false,
        })
    }

    /// Copies one image; returns false when interrupted mid-image
    ///
    /// A partially-written image is rolled back by truncation, so the
    /// target file stays valid after the last complete IFD.
    pub fn copy_image(
        &self,
        src: &TiffEngine,
        dst: &TiffEngine,
        image: usize,
    ) -> TiffResult<bool> {
        let compatible = src.byte_order() == dst.byte_order()
            && src.is_big_tiff() == dst.is_big_tiff();

        if self.direct_copy && compatible {
            self.copy_image_direct(src, dst, image)
        } else {
            if self.direct_copy && !compatible {
                warn!(
                    "direct copy requested but byte order / BigTIFF flags differ, transcoding image {}",
                    image
                );
            }
            self.copy_image_transcode(src, dst, image)
        }
    }

    /// Streams encoded tile bytes verbatim
    fn copy_image_direct(
        &self,
        src: &TiffEngine,
        dst: &TiffEngine,
        image: usize,
    ) -> TiffResult<bool> {
        let source_ifd = src.ifd(image)?;
        let offsets = source_ifd.data_offsets()?;
        let byte_counts = source_ifd.data_byte_counts()?;
        let tiles_total = offsets.len() as u64;
        let tiled = source_ifd.is_tiled();
        let (offsets_tag, counts_tag) = if tiled {
            (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };

        let mut ifd = (*source_ifd).clone();
        if let Some(corrector) = &self.corrector {
            corrector(&mut ifd);
        }

        // Reserve the IFD region with placeholder vectors; the layout
        // must already have its final shape
        let rollback_len = dst.file_len()?;
        install_vectors(&mut ifd, dst.is_big_tiff(), offsets_tag, &vec![0; offsets.len()]);
        install_vectors(&mut ifd, dst.is_big_tiff(), counts_tag, &byte_counts);
        let (probe, link_pos) = dst.serialize_ifd(&ifd, 0)?;
        let base = dst.reserve_bytes(probe.len() as u64)?;

        debug!(
            "direct copy of image {}: {} blocks, IFD reserved at {}",
            image, tiles_total, base
        );

        let mut new_offsets = vec![0u64; offsets.len()];
        for k in 0..offsets.len() {
            if self.interrupted() {
                warn!("interrupted inside image {}, rolling back", image);
                dst.truncate_to(rollback_len)?;
                return Ok(false);
            }
            let transferred = src
                .read_block_bytes(offsets[k], byte_counts[k])
                .and_then(|bytes| match bytes {
                    Some(bytes) => dst.append_bytes(&bytes).map(Some),
                    None => Ok(None),
                });
            match transferred {
                Ok(Some(offset)) => new_offsets[k] = offset,
                Ok(None) => {}
                Err(e) => {
                    dst.truncate_to(rollback_len)?;
                    return Err(e);
                }
            }
            self.notify(CopyProgress {
                image,
                images_total: src.number_of_images(),
                tiles_done: k as u64 + 1,
                tiles_total,
                image_complete: false,
            });
        }

        install_vectors(&mut ifd, dst.is_big_tiff(), offsets_tag, &new_offsets);
        let (buffer, final_link) = dst.serialize_ifd(&ifd, base)?;
        if buffer.len() as u64 != probe.len() as u64 || final_link != link_pos {
            dst.truncate_to(rollback_len)?;
            return Err(TiffError::GenericError(
                "direct-copy IFD reservation mismatch".to_string(),
            ));
        }
        dst.patch_bytes(base, &buffer)?;
        dst.link_ifd(ifd, base, base + link_pos)?;

        self.notify(CopyProgress {
            image,
            images_total: src.number_of_images(),
            tiles_done: tiles_total,
            tiles_total,
            image_complete: true,
        });
        Ok(true)
    }

    /// Decodes through the cache and re-encodes for the target
    ///
    /// The target IFD is a deep clone of the source's, so the source
    /// stays untouched whatever the target does to its copy.
    fn copy_image_transcode(
        &self,
        src: &TiffEngine,
        dst: &TiffEngine,
        image: usize,
    ) -> TiffResult<bool> {
        let read_map = src.read_map(image)?;
        let target_ifd = (**read_map.ifd()).clone();
        let mut write_map = dst.write_map(target_ifd)?;
        write_map.write_forward()?;

        let grid_width = write_map.tile_grid_width();
        let grid_height = write_map.tile_grid_height();
        let planes = write_map.planes();
        let tiles_total = grid_width * grid_height * planes as u64;
        let mut tiles_done = 0u64;

        for plane in 0..planes {
            for ty in 0..grid_height as u32 {
                for tx in 0..grid_width as u32 {
                    if self.interrupted() {
                        warn!("interrupted inside image {}, rolling back", image);
                        write_map.roll_back()?;
                        return Ok(false);
                    }

                    let source_index = TileIndex::planar(image, tx, ty, plane);
                    let result = read_map.read_tile(source_index).and_then(|source_tile| {
                        let mut tile = write_map.new_tile(source_index)?;
                        if let Some(pixels) = source_tile.decoded() {
                            tile.set_decoded(pixels.to_vec());
                        }
                        let finish_row = tx as u64 + 1 == grid_width;
                        write_map.write_tile(tile, finish_row)
                    });
                    if let Err(e) = result {
                        write_map.roll_back()?;
                        return Err(e);
                    }

                    tiles_done += 1;
                    self.notify(CopyProgress {
                        image,
                        images_total: src.number_of_images(),
                        tiles_done,
                        tiles_total,
                        image_complete: false,
                    });
                }
            }
        }

        write_map.complete_writing()?;
        self.notify(CopyProgress {
            image,
            images_total: src.number_of_images(),
            tiles_done,
            tiles_total,
            image_complete: true,
        });
        Ok(true)
    }

    /// Copies a sub-region of one image into the target as a new image
    ///
    /// The target image has the sub-region's dimensions and the
    /// source's tile layout. Each target tile is filled from the
    /// overlapping source pixels via `read_rect` and committed in
    /// raster order.
    pub fn copy_image_region(
        &self,
        src: &TiffEngine,
        dst: &TiffEngine,
        image: usize,
        from_x: u64,
        from_y: u64,
        size_x: u64,
        size_y: u64,
    ) -> TiffResult<bool> {
        let read_map = src.read_map(image)?;
        if size_x == 0
            || size_y == 0
            || from_x + size_x > read_map.image_width()
            || from_y + size_y > read_map.image_height()
        {
            return Err(TiffError::BadRectangle(format!(
                "copy region {}+{} x {}+{} outside image {}x{}",
                from_x,
                size_x,
                from_y,
                size_y,
                read_map.image_width(),
                read_map.image_height()
            )));
        }

        let mut target_ifd = (**read_map.ifd()).clone();
        target_ifd.put(tags::IMAGE_WIDTH, Value::long(size_x as u32));
        target_ifd.put(tags::IMAGE_LENGTH, Value::long(size_y as u32));

        let spp = read_map.samples_per_pixel() as usize;
        let bps = read_map.bytes_per_sample() as usize;

        let mut write_map = dst.write_map(target_ifd)?;
        write_map.write_forward()?;

        let grid_width = write_map.tile_grid_width();
        let grid_height = write_map.tile_grid_height();
        let nominal_width = write_map.tile_width();
        let nominal_height = write_map.tile_height();
        let planes = write_map.planes();

        for plane in 0..planes {
            for ty in 0..grid_height as u32 {
                for tx in 0..grid_width as u32 {
                    if self.interrupted() {
                        write_map.roll_back()?;
                        return Ok(false);
                    }

                    let index = TileIndex::planar(0, tx, ty, plane);
                    let result = (|| {
                        let mut tile = write_map.new_tile(index)?;
                        // Source pixels overlapping this target tile
                        let rect = read_map.read_rect(
                            from_x + tx as u64 * nominal_width,
                            from_y + ty as u64 * nominal_height,
                            tile.size_x() as u64,
                            tile.size_y() as u64,
                        )?;

                        let tile_row_len =
                            tile.tile_width() as usize * tile.samples_per_pixel() as usize * bps;
                        let tile_channels = tile.samples_per_pixel() as usize;
                        let size_x = tile.size_x() as usize;
                        let size_y = tile.size_y() as usize;
                        let decoded = tile.decoded_mut().ok_or_else(|| {
                            TiffError::GenericError("freshly allocated tile has no buffer".to_string())
                        })?;

                        for row in 0..size_y {
                            let src_base = row * size_x * spp * bps;
                            let dst_base = row * tile_row_len;
                            if planes == 1 {
                                let len = size_x * spp * bps;
                                decoded[dst_base..dst_base + len]
                                    .copy_from_slice(&rect[src_base..src_base + len]);
                            } else {
                                // Planar target tile: gather one channel
                                for px in 0..size_x {
                                    let src = src_base + px * spp * bps + plane as usize * bps;
                                    let dst = dst_base + px * tile_channels * bps;
                                    decoded[dst..dst + bps]
                                        .copy_from_slice(&rect[src..src + bps]);
                                }
                            }
                        }

                        let finish_row = tx as u64 + 1 == grid_width;
                        write_map.write_tile(tile, finish_row)
                    })();
                    if let Err(e) = result {
                        write_map.roll_back()?;
                        return Err(e);
                    }
                }
            }
        }

        write_map.complete_writing()?;
        Ok(true)
    }
}

/// Installs a block vector under the width the target flavour uses
fn install_vectors(ifd: &mut Ifd, big_tiff: bool, tag: u16, values: &[u64]) {
    if big_tiff {
        ifd.put(tag, Value::Long8(values.to_vec()));
    } else {
        ifd.put(tag, Value::Long(values.iter().map(|&v| v as u32).collect()));
    }
}
