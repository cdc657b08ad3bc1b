//! Integration tests for the tile engine
//!
//! These build real files on disk (and a few by hand, byte by byte)
//! and drive the public API end to end: write maps, read maps, the
//! cache and the copier.

use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use tiffgrid::tiff::constants::{compression, photometric, tags};
use tiffgrid::{
    Copier, Ifd, ImageKind, TiffEngine, TiffError, TiffOptions, TileIndex, Value,
};

/// Grayscale 8-bit IFD skeleton
fn gray_ifd(width: u32, height: u32, compression_code: u64) -> Ifd {
    let mut ifd = Ifd::new(0, 0);
    ifd.put(tags::IMAGE_WIDTH, Value::long(width));
    ifd.put(tags::IMAGE_LENGTH, Value::long(height));
    ifd.put(tags::BITS_PER_SAMPLE, Value::short(8));
    ifd.put(tags::SAMPLES_PER_PIXEL, Value::short(1));
    ifd.put(tags::COMPRESSION, Value::short(compression_code as u16));
    ifd.put(
        tags::PHOTOMETRIC_INTERPRETATION,
        Value::short(photometric::BLACK_IS_ZERO),
    );
    ifd
}

fn tiled(mut ifd: Ifd, tile_width: u32, tile_height: u32) -> Ifd {
    ifd.put(tags::TILE_WIDTH, Value::long(tile_width));
    ifd.put(tags::TILE_LENGTH, Value::long(tile_height));
    ifd
}

fn stripped(mut ifd: Ifd, rows_per_strip: u32) -> Ifd {
    ifd.put(tags::ROWS_PER_STRIP, Value::long(rows_per_strip));
    ifd
}

/// Writes one image whose pixel (x, y) is `(x + y) mod 256`
fn write_gradient_image(engine: &TiffEngine, ifd: Ifd) {
    let mut map = engine.write_map(ifd).unwrap();
    map.write_forward().unwrap();

    let tile_width = map.tile_width();
    let tile_height = map.tile_height();
    let grid_width = map.tile_grid_width();
    let grid_height = map.tile_grid_height();

    for ty in 0..grid_height as u32 {
        for tx in 0..grid_width as u32 {
            let mut tile = map.new_tile(TileIndex::new(0, tx, ty)).unwrap();
            let row_len = tile.tile_width() as usize;
            let size_x = tile.size_x() as usize;
            let size_y = tile.size_y() as usize;
            let decoded = tile.decoded_mut().unwrap();
            for y in 0..size_y {
                for x in 0..size_x {
                    let gx = tx as u64 * tile_width + x as u64;
                    let gy = ty as u64 * tile_height + y as u64;
                    decoded[y * row_len + x] = ((gx + gy) % 256) as u8;
                }
            }
            let finish_row = tx as u64 + 1 == grid_width;
            map.write_tile(tile, finish_row).unwrap();
        }
    }

    map.complete_writing().unwrap();
}

/// Reads every pixel back tile by tile and checks the gradient
fn verify_gradient(engine: &TiffEngine, image: usize) {
    let map = engine.read_map(image).unwrap();
    for ty in 0..map.tile_grid_height() as u32 {
        for tx in 0..map.tile_grid_width() as u32 {
            let tile = map.read_tile(map.tile_index(tx, ty)).unwrap();
            let decoded = tile.decoded().unwrap();
            let row_len = tile.tile_width() as usize;
            for y in 0..tile.size_y() as usize {
                for x in 0..tile.size_x() as usize {
                    let gx = tx as u64 * map.tile_width() + x as u64;
                    let gy = ty as u64 * map.tile_height() + y as u64;
                    let expected = ((gx + gy) % 256) as u8;
                    assert_eq!(
                        decoded[y * row_len + x],
                        expected,
                        "pixel mismatch at ({}, {})",
                        gx,
                        gy
                    );
                }
            }
        }
    }
}

#[test]
fn classic_header_round_trip_with_strips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gradient.tif");

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    write_gradient_image(&engine, stripped(gray_ifd(16, 16, compression::NONE), 4));
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    assert!(!engine.is_big_tiff());
    assert_eq!(engine.number_of_images(), 1);

    let map = engine.read_map(0).unwrap();
    assert_eq!(map.number_of_tiles(), 4);
    verify_gradient(&engine, 0);

    // The whole image through read_rect matches too
    let rect = map.read_rect(0, 0, 16, 16).unwrap();
    for y in 0..16u64 {
        for x in 0..16u64 {
            assert_eq!(rect[(y * 16 + x) as usize], ((x + y) % 256) as u8);
        }
    }
}

#[test]
fn tiled_round_trip_across_codecs() {
    for code in [
        compression::NONE,
        compression::LZW,
        compression::DEFLATE,
        compression::PROPRIETARY_DEFLATE,
        compression::PACKBITS,
        compression::ZSTD,
    ] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiled.tif");

        let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
        // 40x35 with 16x16 tiles: ragged right and bottom edges
        write_gradient_image(&engine, tiled(gray_ifd(40, 35, code), 16, 16));
        drop(engine);

        let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
        let map = engine.read_map(0).unwrap();
        assert_eq!(map.tile_grid_width(), 3, "compression {}", code);
        assert_eq!(map.tile_grid_height(), 3, "compression {}", code);
        verify_gradient(&engine, 0);
    }
}

#[test]
fn big_endian_files_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("motorola.tif");

    let options = TiffOptions {
        little_endian: false,
        ..TiffOptions::default()
    };
    let engine = TiffEngine::create(&path, options).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(32, 32, compression::NONE), 16, 16));
    drop(engine);

    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[0..2], b"MM");

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    verify_gradient(&engine, 0);
}

#[test]
fn sixteen_bit_predictor_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("predicted.tif");

    let mut ifd = gray_ifd(24, 8, compression::DEFLATE);
    ifd.put(tags::BITS_PER_SAMPLE, Value::short(16));
    ifd.put(tags::PREDICTOR, Value::short(2));
    let ifd = stripped(ifd, 8);

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    let mut map = engine.write_map(ifd).unwrap();
    map.write_forward().unwrap();
    let mut tile = map.new_tile(TileIndex::new(0, 0, 0)).unwrap();
    let samples: Vec<u16> = (0..24 * 8).map(|i| (i * 321) as u16).collect();
    let bytes: Vec<u8> = samples.iter().flat_map(|v| v.to_ne_bytes()).collect();
    tile.set_decoded(bytes.clone());
    map.write_tile(tile, true).unwrap();
    map.complete_writing().unwrap();
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    let map = engine.read_map(0).unwrap();
    let tile = map.read_tile(map.tile_index(0, 0)).unwrap();
    assert_eq!(tile.decoded().unwrap(), &bytes[..]);
}

#[test]
fn hand_built_classic_file_parses() {
    // Minimal little-endian classic TIFF with one 4x4 uncompressed
    // gray image in a single strip
    let mut raw: Vec<u8> = Vec::new();
    raw.extend_from_slice(b"II");
    raw.extend_from_slice(&42u16.to_le_bytes());
    raw.extend_from_slice(&8u32.to_le_bytes()); // first IFD at 8

    let entry = |tag: u16, field_type: u16, count: u32, value: u32| {
        let mut e = Vec::new();
        e.extend_from_slice(&tag.to_le_bytes());
        e.extend_from_slice(&field_type.to_le_bytes());
        e.extend_from_slice(&count.to_le_bytes());
        e.extend_from_slice(&value.to_le_bytes());
        e
    };

    // 8 entries, 12 bytes each; pixel data at 8 + 2 + 96 + 4 = 110
    raw.extend_from_slice(&8u16.to_le_bytes());
    raw.extend(entry(tags::IMAGE_WIDTH, 3, 1, 4));
    raw.extend(entry(tags::IMAGE_LENGTH, 3, 1, 4));
    raw.extend(entry(tags::BITS_PER_SAMPLE, 3, 1, 8));
    raw.extend(entry(tags::COMPRESSION, 3, 1, 1));
    raw.extend(entry(tags::PHOTOMETRIC_INTERPRETATION, 3, 1, 1));
    raw.extend(entry(tags::STRIP_OFFSETS, 4, 1, 110));
    raw.extend(entry(tags::ROWS_PER_STRIP, 3, 1, 4));
    raw.extend(entry(tags::STRIP_BYTE_COUNTS, 4, 1, 16));
    raw.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
    raw.extend((0u8..16).collect::<Vec<u8>>());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hand.tif");
    std::fs::write(&path, &raw).unwrap();

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    assert_eq!(engine.number_of_images(), 1);
    let ifd = engine.ifd(0).unwrap();
    assert_eq!(ifd.image_width().unwrap(), 4);
    assert_eq!(ifd.image_height().unwrap(), 4);

    let map = engine.read_map(0).unwrap();
    let rect = map.read_rect(0, 0, 4, 4).unwrap();
    assert_eq!(rect, (0u8..16).collect::<Vec<u8>>());
}

#[test]
fn truncated_ifd_offset_is_rejected() {
    let mut raw: Vec<u8> = Vec::new();
    raw.extend_from_slice(b"II");
    raw.extend_from_slice(&42u16.to_le_bytes());
    raw.extend_from_slice(&4096u32.to_le_bytes()); // IFD far past EOF

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("truncated.tif");
    std::fs::write(&path, &raw).unwrap();

    match TiffEngine::open(&path, TiffOptions::default()) {
        Err(TiffError::TruncatedFile(_)) => {}
        other => panic!("expected TruncatedFile, got {:?}", other.map(|_| ())),
    }

    // Lenient mode tolerates it and reads an empty chain
    let lenient = TiffOptions {
        require_valid_tiff: false,
        ..TiffOptions::default()
    };
    let engine = TiffEngine::open(&path, lenient).unwrap();
    assert_eq!(engine.number_of_images(), 0);
}

#[test]
fn bad_rectangles_and_duplicate_tiles_are_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("errors.tif");

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    let mut map = engine
        .write_map(tiled(gray_ifd(32, 32, compression::NONE), 16, 16))
        .unwrap();
    map.write_forward().unwrap();

    let tile = map.new_tile(TileIndex::new(0, 0, 0)).unwrap();
    map.write_tile(tile, false).unwrap();
    let again = map.new_tile(TileIndex::new(0, 0, 0)).unwrap();
    match map.write_tile(again, false) {
        Err(TiffError::DuplicateTile(idx)) => assert_eq!(idx, TileIndex::new(0, 0, 0)),
        other => panic!("expected DuplicateTile, got {:?}", other),
    }
    map.complete_writing().unwrap();
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    let map = engine.read_map(0).unwrap();
    assert!(matches!(
        map.read_rect(20, 20, 20, 20),
        Err(TiffError::BadRectangle(_))
    ));
    assert!(matches!(
        map.read_rect(0, 0, 0, 4),
        Err(TiffError::BadRectangle(_))
    ));
}

#[test]
fn never_written_blocks_read_as_blank_tiles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blanks.tif");

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    let mut ifd = tiled(gray_ifd(32, 16, compression::NONE), 16, 16);
    ifd.put(
        tags::PHOTOMETRIC_INTERPRETATION,
        Value::short(photometric::WHITE_IS_ZERO),
    );
    let mut map = engine.write_map(ifd).unwrap();
    map.write_forward().unwrap();
    // Only the left tile is written; the right one stays blank
    let mut tile = map.new_tile(TileIndex::new(0, 0, 0)).unwrap();
    tile.decoded_mut().unwrap().fill(0x11);
    map.write_tile(tile, false).unwrap();
    map.complete_writing().unwrap();
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    let map = engine.read_map(0).unwrap();
    let written = map.read_tile(map.tile_index(0, 0)).unwrap();
    assert!(written.decoded().unwrap().iter().all(|&b| b == 0x11));

    // WhiteIsZero blanks fill with 0xFF
    let blank = map.read_tile(map.tile_index(1, 0)).unwrap();
    assert!(blank.decoded().unwrap().iter().all(|&b| b == 0xFF));
}

#[test]
fn read_rect_assembles_across_tile_seams() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("seams.tif");

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(64, 64, compression::DEFLATE), 16, 16));
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    let map = engine.read_map(0).unwrap();

    // A rectangle straddling four tiles
    let rect = map.read_rect(10, 12, 20, 18).unwrap();
    for y in 0..18u64 {
        for x in 0..20u64 {
            let expected = ((10 + x + 12 + y) % 256) as u8;
            assert_eq!(rect[(y * 20 + x) as usize], expected);
        }
    }
}

#[test]
fn concurrent_tile_reads_share_one_decode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parallel.tif");

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(32, 32, compression::DEFLATE), 16, 16));
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    let map = engine.read_map(0).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let map = &map;
                scope.spawn(move || {
                    let tile = map.read_tile(map.tile_index(1, 1)).unwrap();
                    tile.decoded().unwrap().to_vec()
                })
            })
            .collect();
        let results: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    });
}

#[test]
fn bigtiff_direct_copy_is_byte_exact() {
    let dir = TempDir::new().unwrap();
    let src_path = dir.path().join("src.btf");
    let dst_path = dir.path().join("dst.btf");

    let big = TiffOptions {
        big_tiff: true,
        ..TiffOptions::default()
    };

    let engine = TiffEngine::create(&src_path, big.clone()).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(64, 48, compression::DEFLATE), 16, 16));
    write_gradient_image(&engine, tiled(gray_ifd(32, 32, compression::DEFLATE), 16, 16));
    drop(engine);

    let src = TiffEngine::open(&src_path, big.clone()).unwrap();
    assert!(src.is_big_tiff());
    assert_eq!(src.number_of_images(), 2);

    let dst = TiffEngine::create(&dst_path, big.clone()).unwrap();
    let tiles_seen = AtomicUsize::new(0);
    let copier = Copier::new(true).with_progress(|p| {
        if !p.image_complete {
            tiles_seen.fetch_add(1, Ordering::SeqCst);
        }
    });
    let outcome = copier.copy_all(&src, &dst).unwrap();
    assert_eq!(outcome.images_copied, 2);
    assert!(!outcome.interrupted);
    assert_eq!(tiles_seen.load(Ordering::SeqCst), 12 + 4);
    drop(dst);

    let dst = TiffEngine::open(&dst_path, big).unwrap();
    assert_eq!(dst.number_of_images(), 2);

    let src_raw = std::fs::read(&src_path).unwrap();
    let dst_raw = std::fs::read(&dst_path).unwrap();

    for image in 0..2 {
        let src_ifd = src.ifd(image).unwrap();
        let dst_ifd = dst.ifd(image).unwrap();
        let src_counts = src_ifd.data_byte_counts().unwrap();
        assert_eq!(src_counts, dst_ifd.data_byte_counts().unwrap());

        // Encoded bytes appear verbatim at the recorded target offsets
        let src_offsets = src_ifd.data_offsets().unwrap();
        let dst_offsets = dst_ifd.data_offsets().unwrap();
        for k in 0..src_counts.len() {
            let n = src_counts[k] as usize;
            assert_eq!(
                &src_raw[src_offsets[k] as usize..src_offsets[k] as usize + n],
                &dst_raw[dst_offsets[k] as usize..dst_offsets[k] as usize + n],
            );
        }

        // And the pixels agree under a transcoding read
        verify_gradient(&dst, image);
    }
}

#[test]
fn transcode_copy_preserves_pixels() {
    let dir = TempDir::new().unwrap();
    let src_path = dir.path().join("src.tif");
    let dst_path = dir.path().join("dst.tif");

    let engine = TiffEngine::create(&src_path, TiffOptions::default()).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(48, 40, compression::LZW), 16, 16));
    drop(engine);

    let src = TiffEngine::open(&src_path, TiffOptions::default()).unwrap();
    let dst = TiffEngine::create(&dst_path, TiffOptions::default()).unwrap();
    let outcome = Copier::new(false).copy_all(&src, &dst).unwrap();
    assert_eq!(outcome.images_copied, 1);
    drop(dst);

    let dst = TiffEngine::open(&dst_path, TiffOptions::default()).unwrap();
    verify_gradient(&dst, 0);
}

#[test]
fn interrupted_copy_rolls_back_to_last_complete_image() {
    let dir = TempDir::new().unwrap();
    let src_path = dir.path().join("src.tif");
    let dst_path = dir.path().join("dst.tif");

    let engine = TiffEngine::create(&src_path, TiffOptions::default()).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(32, 32, compression::NONE), 16, 16));
    write_gradient_image(&engine, tiled(gray_ifd(32, 32, compression::NONE), 16, 16));
    drop(engine);

    let src = TiffEngine::open(&src_path, TiffOptions::default()).unwrap();
    let dst = TiffEngine::create(&dst_path, TiffOptions::default()).unwrap();

    // Let the first image through, then interrupt
    let polls = AtomicUsize::new(0);
    let copier = Copier::new(false).with_interrupt(|| polls.fetch_add(1, Ordering::SeqCst) >= 5);
    let outcome = copier.copy_all(&src, &dst).unwrap();
    assert!(outcome.interrupted);
    assert_eq!(outcome.images_copied, 1);
    drop(dst);

    let dst = TiffEngine::open(&dst_path, TiffOptions::default()).unwrap();
    assert_eq!(dst.number_of_images(), 1);
    verify_gradient(&dst, 0);
}

#[test]
fn sub_region_copy_matches_read_rect() {
    let dir = TempDir::new().unwrap();
    let src_path = dir.path().join("src.tif");
    let dst_path = dir.path().join("region.tif");

    let engine = TiffEngine::create(&src_path, TiffOptions::default()).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(64, 64, compression::DEFLATE), 16, 16));
    drop(engine);

    let src = TiffEngine::open(&src_path, TiffOptions::default()).unwrap();
    let dst = TiffEngine::create(&dst_path, TiffOptions::default()).unwrap();
    let copied = Copier::new(false)
        .copy_image_region(&src, &dst, 0, 11, 7, 30, 25)
        .unwrap();
    assert!(copied);
    drop(dst);

    let expected = src.read_map(0).unwrap().read_rect(11, 7, 30, 25).unwrap();

    let dst = TiffEngine::open(&dst_path, TiffOptions::default()).unwrap();
    let map = dst.read_map(0).unwrap();
    assert_eq!(map.image_width(), 30);
    assert_eq!(map.image_height(), 25);
    assert_eq!(map.read_rect(0, 0, 30, 25).unwrap(), expected);
}

#[test]
fn image_kinds_follow_the_description_heuristic() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("slide.tif");

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(32, 32, compression::NONE), 16, 16));

    let mut label = tiled(gray_ifd(16, 16, compression::NONE), 16, 16);
    label.put(tags::IMAGE_DESCRIPTION, Value::Ascii("label 1234".to_string()));
    write_gradient_image(&engine, label);

    let mut overview = tiled(gray_ifd(16, 16, compression::NONE), 16, 16);
    overview.put(
        tags::IMAGE_DESCRIPTION,
        Value::Ascii("Macro overview".to_string()),
    );
    write_gradient_image(&engine, overview);
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    assert_eq!(engine.image_kind(0).unwrap(), ImageKind::Base);
    assert_eq!(engine.image_kind(1).unwrap(), ImageKind::Label);
    assert_eq!(engine.image_kind(2).unwrap(), ImageKind::Macro);
}

#[test]
fn staged_tiles_commit_in_raster_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("staged.tif");

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    let mut map = engine
        .write_map(tiled(gray_ifd(32, 32, compression::NONE), 16, 16))
        .unwrap();

    // Stage out of order; commit sorts them
    for (tx, ty) in [(1u32, 1u32), (0, 0), (1, 0), (0, 1)] {
        let mut tile = map.new_tile(TileIndex::new(0, tx, ty)).unwrap();
        tile.decoded_mut().unwrap().fill((tx + ty * 2) as u8);
        map.put(tile).unwrap();
    }

    // Double-put is a duplicate
    let dup = map.new_tile(TileIndex::new(0, 0, 0)).unwrap();
    assert!(matches!(map.put(dup), Err(TiffError::DuplicateTile(_))));

    map.complete_writing().unwrap();
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    let ifd = engine.ifd(0).unwrap();
    let offsets = ifd.data_offsets().unwrap();
    // Raster order on disk: each block starts after its predecessor
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));

    let map = engine.read_map(0).unwrap();
    for (tx, ty) in [(0u32, 0u32), (1, 0), (0, 1), (1, 1)] {
        let tile = map.read_tile(map.tile_index(tx, ty)).unwrap();
        assert!(tile
            .decoded()
            .unwrap()
            .iter()
            .all(|&b| b == (tx + ty * 2) as u8));
    }
}

#[test]
fn ifd_reports_metadata_and_data_sizes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sizes.tif");

    let engine = TiffEngine::create(&path, TiffOptions::default()).unwrap();
    write_gradient_image(&engine, tiled(gray_ifd(32, 32, compression::NONE), 16, 16));
    drop(engine);

    let engine = TiffEngine::open(&path, TiffOptions::default()).unwrap();
    let ifd = engine.ifd(0).unwrap();
    // Four uncompressed 16x16 tiles
    assert_eq!(ifd.size_of_data(), 4 * 16 * 16);
    assert!(ifd.size_of_metadata(false) > 0);
}
