//! Lossy recompression of oversized images
//!
//! Re-encodes as JPEG, stepping quality down and then the dimensions, until
//! the output fits the target budget. Any failure leaves the caller holding
//! the original bytes.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use thiserror::Error;

const QUALITY_STEPS: [u8; 4] = [85, 70, 55, 40];
const SCALE_STEP: f32 = 0.75;
const MIN_DIMENSION: u32 = 16;

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("Image decode failed: {0}")]
    Decode(#[source] image::ImageError),

    #[error("JPEG encode failed: {0}")]
    Encode(#[source] image::ImageError),

    /// Shrunk to the minimum size and still over budget
    #[error("Could not reach {target} bytes (smallest attempt {smallest})")]
    OverBudget { target: usize, smallest: usize },
}

/// Recompress `bytes` to a JPEG no larger than `target_bytes`
pub fn compress_to_jpeg(bytes: &[u8], target_bytes: usize) -> Result<Vec<u8>, CompressError> {
    let decoded = image::load_from_memory(bytes).map_err(CompressError::Decode)?;
    let mut rgb = decoded.to_rgb8();
    let mut smallest = usize::MAX;

    loop {
        for quality in QUALITY_STEPS {
            let encoded = encode_jpeg(&rgb, quality)?;
            if encoded.len() <= target_bytes {
                return Ok(encoded);
            }
            smallest = smallest.min(encoded.len());
        }

        let width = (rgb.width() as f32 * SCALE_STEP) as u32;
        let height = (rgb.height() as f32 * SCALE_STEP) as u32;
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Err(CompressError::OverBudget {
                target: target_bytes,
                smallest,
            });
        }
        rgb = image::imageops::resize(&rgb, width, height, FilterType::Triangle);
    }
}

pub(crate) fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, CompressError> {
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(rgb)
        .map_err(CompressError::Encode)?;
    Ok(out.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    /// Noisy PNG that compresses poorly
    pub(crate) fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let mut state: u32 = 0x2545_F491;
        let img = RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb([r, g, b])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_compresses_under_target() {
        let png = noisy_png(256, 256);
        let target = 16 * 1024;
        assert!(png.len() > target);

        let jpeg = compress_to_jpeg(&png, target).unwrap();
        assert!(jpeg.len() <= target);
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_undecodable_bytes_fail() {
        let result = compress_to_jpeg(b"definitely not an image", 1024);
        assert!(matches!(result, Err(CompressError::Decode(_))));
    }

    #[test]
    fn test_impossible_budget_fails() {
        let png = noisy_png(64, 64);
        let result = compress_to_jpeg(&png, 10);
        assert!(matches!(result, Err(CompressError::OverBudget { target: 10, .. })));
    }
}
