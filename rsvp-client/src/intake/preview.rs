//! Bounded-latency previews
//!
//! Decoding runs on the blocking pool under a deadline. Whatever happens the
//! caller gets a [`Preview`]: a thumbnail, the passthrough fallback, or
//! `Unavailable` for an empty payload.

use std::time::Duration;

use image::DynamicImage;
use tracing::debug;

use super::compress::{encode_jpeg, CompressError};
use crate::model::Preview;

const THUMBNAIL_QUALITY: u8 = 80;

/// Produce a preview within `budget`
pub async fn render_preview(bytes: &[u8], max_side: u32, budget: Duration) -> Preview {
    if bytes.is_empty() {
        return Preview::Unavailable;
    }

    let owned = bytes.to_vec();
    let task = tokio::task::spawn_blocking(move || thumbnail(&owned, max_side));

    match tokio::time::timeout(budget, task).await {
        Ok(Ok(Ok(preview))) => preview,
        Ok(Ok(Err(e))) => {
            debug!(error = %e, "Preview decode failed, using passthrough");
            Preview::Passthrough
        }
        Ok(Err(e)) => {
            debug!(error = %e, "Preview task failed, using passthrough");
            Preview::Passthrough
        }
        Err(_) => {
            debug!(budget_ms = budget.as_millis() as u64, "Preview timed out, using passthrough");
            Preview::Passthrough
        }
    }
}

/// Decode and redraw as a JPEG no larger than `max_side` on its longest side
pub fn thumbnail(bytes: &[u8], max_side: u32) -> Result<Preview, CompressError> {
    let decoded = image::load_from_memory(bytes).map_err(CompressError::Decode)?;
    let fitted: DynamicImage = if decoded.width() > max_side || decoded.height() > max_side {
        decoded.thumbnail(max_side, max_side)
    } else {
        decoded
    };

    let rgb = fitted.to_rgb8();
    let jpeg = encode_jpeg(&rgb, THUMBNAIL_QUALITY)?;
    Ok(Preview::Thumbnail {
        jpeg,
        width: rgb.width(),
        height: rgb.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::compress::tests::noisy_png;

    #[tokio::test]
    async fn test_thumbnail_fits_bounds() {
        let png = noisy_png(640, 320);
        match render_preview(&png, 320, Duration::from_secs(5)).await {
            Preview::Thumbnail { width, height, jpeg } => {
                assert_eq!(width, 320);
                assert_eq!(height, 160);
                assert!(!jpeg.is_empty());
            }
            other => panic!("expected thumbnail, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_small_image_not_upscaled() {
        let png = noisy_png(40, 30);
        let preview = render_preview(&png, 320, Duration::from_secs(5)).await;
        assert!(matches!(preview, Preview::Thumbnail { width: 40, height: 30, .. }));
    }

    #[tokio::test]
    async fn test_undecodable_falls_back_to_passthrough() {
        let preview = render_preview(b"\xFF\xD8 truncated", 320, Duration::from_secs(5)).await;
        assert_eq!(preview, Preview::Passthrough);
    }

    #[tokio::test]
    async fn test_empty_payload_is_unavailable() {
        let preview = render_preview(&[], 320, Duration::from_secs(5)).await;
        assert_eq!(preview, Preview::Unavailable);
    }

    #[tokio::test]
    async fn test_zero_budget_still_resolves() {
        let png = noisy_png(1024, 1024);
        let preview = render_preview(&png, 320, Duration::ZERO).await;
        assert!(matches!(preview, Preview::Passthrough | Preview::Thumbnail { .. }));
    }
}
