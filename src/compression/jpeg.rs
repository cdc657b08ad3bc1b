//! Codec for JPEG compressed tiles
//!
//! Decode goes through the `image` crate's JPEG support. Encoding
//! baseline JPEG inside TIFF needs table management this engine does
//! not do, so the write direction reports a codec error; transcoding
//! copies re-encode with a different target codec instead.

use image::ImageFormat;
use log::debug;

use crate::tiff::errors::{TiffError, TiffResult};
use super::codec::{Codec, CodecOptions};

/// JPEG codec (compression code 7), decode only
pub struct JpegCodec;

impl Codec for JpegCodec {
    fn decode(&self, data: &[u8], options: &CodecOptions) -> TiffResult<Vec<u8>> {
        let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| TiffError::codec(format!("JPEG decode: {}", e), None))?;

        debug!(
            "JPEG tile decoded: {}x{}, want {} channels",
            decoded.width(),
            decoded.height(),
            options.samples_per_pixel
        );

        let bytes = match options.samples_per_pixel {
            1 => decoded.into_luma8().into_raw(),
            _ => decoded.into_rgb8().into_raw(),
        };
        Ok(bytes)
    }

    fn encode(&self, _data: &[u8], _options: &CodecOptions) -> TiffResult<Vec<u8>> {
        Err(TiffError::codec(
            "JPEG encoding into TIFF is not supported; transcode to a lossless codec",
            None,
        ))
    }

    fn name(&self) -> &'static str {
        "JPEG"
    }

    fn code(&self) -> u64 {
        7
    }
}
