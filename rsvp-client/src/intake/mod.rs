//! Image intake queue
//!
//! A batch is admitted all-or-nothing: it must contain only images and fit in
//! the remaining guest slots, counting images still in flight. Admitted items
//! are then processed independently (optional recompression, then preview)
//! and each one becomes visible in the queue as soon as it is done.

pub mod compress;
pub mod preview;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::IntakeError;
use crate::events::SessionEvent;
use crate::model::{ImagePayload, ImageStatus, IncomingFile, PassportImage};
use crate::session::Session;

pub use compress::{compress_to_jpeg, CompressError};
pub use preview::{render_preview, thumbnail};

/// Files above this size are recompressed (the per-file upload ceiling)
pub const DEFAULT_COMPRESS_THRESHOLD_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_COMPRESS_TARGET_BYTES: usize = 4 * 1024 * 1024;
pub const DEFAULT_PREVIEW_BUDGET: Duration = Duration::from_millis(1500);
pub const DEFAULT_THUMBNAIL_MAX_SIDE: u32 = 320;

/// Intake tuning
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub compress_threshold_bytes: usize,
    pub compress_target_bytes: usize,
    pub preview_budget: Duration,
    pub thumbnail_max_side: u32,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            compress_threshold_bytes: DEFAULT_COMPRESS_THRESHOLD_BYTES,
            compress_target_bytes: DEFAULT_COMPRESS_TARGET_BYTES,
            preview_budget: DEFAULT_PREVIEW_BUDGET,
            thumbnail_max_side: DEFAULT_THUMBNAIL_MAX_SIDE,
        }
    }
}

/// An admitted batch whose items are still being processed
#[derive(Debug)]
pub struct PendingBatch {
    ids: Vec<Uuid>,
    handles: Vec<JoinHandle<()>>,
}

impl PendingBatch {
    /// Ids of the admitted images, in batch order
    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Wait until every item of the batch is in the queue
    pub async fn finished(self) -> Vec<Uuid> {
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Intake task failed");
            }
        }
        self.ids
    }
}

impl Session {
    /// Admit a batch of files
    ///
    /// Returns immediately after admission; items appear in the queue as they
    /// finish. On rejection the queue is unchanged.
    pub async fn enqueue(&self, files: Vec<IncomingFile>) -> Result<PendingBatch, IntakeError> {
        if let Some(bad) = files.iter().find(|f| !f.is_image()) {
            return Err(IntakeError::NotAnImage(bad.file_name.clone()));
        }

        {
            let mut state = self.state.write().await;
            let occupied = state.live_count() + state.reserved;
            let remaining = state.guests.len().saturating_sub(occupied);
            if files.len() > remaining {
                return Err(IntakeError::TooManyImages {
                    requested: files.len(),
                    remaining,
                });
            }
            state.reserved += files.len();
        }

        let mut ids = Vec::with_capacity(files.len());
        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            let id = Uuid::new_v4();
            let session = self.clone();
            ids.push(id);
            handles.push(tokio::spawn(async move { session.process_file(id, file).await }));
        }

        debug!(count = ids.len(), "Batch admitted");
        Ok(PendingBatch { ids, handles })
    }

    /// Remove one queued image
    pub async fn remove_item(&self, id: Uuid) -> Result<PassportImage, IntakeError> {
        let mut state = self.state.write().await;
        let pos = state
            .images
            .iter()
            .position(|i| i.id == id)
            .ok_or(IntakeError::UnknownImage(id))?;

        let status = state.images[pos].status;
        if status != ImageStatus::Queued {
            return Err(IntakeError::NotQueued { id, status });
        }

        let mut removed = state.images.remove(pos);
        removed.status = ImageStatus::Removed;
        drop(state);

        self.events.emit_lossy(SessionEvent::ImageRemoved {
            image_id: id,
            timestamp: Utc::now(),
        });
        Ok(removed)
    }

    /// Remove every queued image; assigned and submitted images stay
    ///
    /// Returns how many were removed.
    pub async fn clear_queue(&self) -> usize {
        let mut state = self.state.write().await;
        let before = state.images.len();
        state.images.retain(|i| i.status != ImageStatus::Queued);
        let removed = before - state.images.len();
        drop(state);

        if removed > 0 {
            self.events.emit_lossy(SessionEvent::QueueCleared {
                removed,
                timestamp: Utc::now(),
            });
        }
        removed
    }

    async fn process_file(&self, id: Uuid, file: IncomingFile) {
        let config = self.intake.clone();
        let mime_type = file.effective_mime();
        let original_name = file.file_name;
        let mut payload = ImagePayload {
            bytes: file.bytes,
            file_name: original_name.clone(),
            mime_type,
        };
        let mut compressed = false;

        if payload.size() > config.compress_threshold_bytes {
            let original_bytes = payload.size();
            let target = config.compress_target_bytes;
            let shared = Arc::new(std::mem::take(&mut payload.bytes));
            let input = shared.clone();

            let joined =
                tokio::task::spawn_blocking(move || compress_to_jpeg(&input, target)).await;

            match joined {
                Ok(Ok(jpeg)) => {
                    info!(
                        image_id = %id,
                        original_bytes,
                        compressed_bytes = jpeg.len(),
                        "Image recompressed"
                    );
                    self.events.emit_lossy(SessionEvent::ImageCompressed {
                        image_id: id,
                        original_bytes,
                        compressed_bytes: jpeg.len(),
                        timestamp: Utc::now(),
                    });
                    payload.bytes = jpeg;
                    payload.mime_type = Some("image/jpeg".to_string());
                    payload.file_name = with_jpg_extension(&original_name);
                    compressed = true;
                }
                Ok(Err(e)) => {
                    warn!(image_id = %id, error = %e, "Compression failed, keeping original");
                    payload.bytes = unwrap_shared(shared);
                }
                Err(e) => {
                    warn!(image_id = %id, error = %e, "Compression task failed, keeping original");
                    payload.bytes = unwrap_shared(shared);
                }
            }
        }

        let preview = render_preview(
            &payload.bytes,
            config.thumbnail_max_side,
            config.preview_budget,
        )
        .await;

        let file_name = payload.file_name.clone();
        {
            let mut state = self.state.write().await;
            state.reserved = state.reserved.saturating_sub(1);
            state.images.push(PassportImage {
                id,
                payload,
                original_name,
                guest_index: None,
                preview,
                status: ImageStatus::Queued,
                compressed,
            });
        }

        self.events.emit_lossy(SessionEvent::ImageQueued {
            image_id: id,
            file_name,
            timestamp: Utc::now(),
        });
    }
}

/// The blocking task has finished with its clone, so this normally moves
fn unwrap_shared(shared: Arc<Vec<u8>>) -> Vec<u8> {
    Arc::try_unwrap(shared).unwrap_or_else(|still_shared| still_shared.as_ref().clone())
}

fn with_jpg_extension(name: &str) -> String {
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    format!("{}.jpg", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::compress::tests::noisy_png;
    use crate::model::Preview;
    use rsvp_common::GuestRecord;

    async fn session_with_guests(count: usize, config: IntakeConfig) -> Session {
        let session = Session::new(config);
        for n in 0..count {
            session
                .add_guest(GuestRecord {
                    first_name: format!("Guest{}", n),
                    ..Default::default()
                })
                .await;
        }
        session
    }

    fn jpeg_file(name: &str) -> IncomingFile {
        IncomingFile::new(name, Some("image/jpeg"), vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    #[tokio::test]
    async fn test_batch_over_remaining_slots_rejected_in_full() {
        let session = session_with_guests(2, IntakeConfig::default()).await;

        let err = session
            .enqueue(vec![jpeg_file("a.jpg"), jpeg_file("b.jpg"), jpeg_file("c.jpg")])
            .await
            .unwrap_err();
        assert_eq!(err, IntakeError::TooManyImages { requested: 3, remaining: 2 });

        assert!(session.images().await.is_empty());
        assert_eq!(session.processing().await, 0);
        assert_eq!(session.remaining_slots().await, 2);
    }

    #[tokio::test]
    async fn test_in_flight_items_count_against_slots() {
        let session = session_with_guests(2, IntakeConfig::default()).await;

        let first = session.enqueue(vec![jpeg_file("a.jpg")]).await.unwrap();
        let second = session.enqueue(vec![jpeg_file("b.jpg"), jpeg_file("c.jpg")]).await;
        assert_eq!(
            second.unwrap_err(),
            IntakeError::TooManyImages { requested: 2, remaining: 1 }
        );

        first.finished().await;
        assert_eq!(session.images().await.len(), 1);
    }

    #[tokio::test]
    async fn test_non_image_rejects_batch() {
        let session = session_with_guests(3, IntakeConfig::default()).await;

        let err = session
            .enqueue(vec![
                jpeg_file("a.jpg"),
                IncomingFile::new("form.pdf", Some("application/pdf"), vec![1, 2, 3]),
            ])
            .await
            .unwrap_err();
        assert_eq!(err, IntakeError::NotAnImage("form.pdf".to_string()));
        assert_eq!(session.remaining_slots().await, 3);
    }

    #[tokio::test]
    async fn test_items_become_queued() {
        let session = session_with_guests(2, IntakeConfig::default()).await;
        let mut events = session.events().subscribe();

        let ids = session
            .enqueue(vec![IncomingFile::new("scan.png", None, noisy_png(32, 32))])
            .await
            .unwrap()
            .finished()
            .await;

        let image = session.image(ids[0]).await.unwrap();
        assert_eq!(image.status, ImageStatus::Queued);
        assert_eq!(image.guest_index, None);
        assert_eq!(image.payload.mime_type.as_deref(), Some("image/png"));
        assert!(matches!(image.preview, Preview::Thumbnail { .. }));
        assert!(!image.compressed);
        assert_eq!(session.processing().await, 0);

        match events.recv().await.unwrap() {
            SessionEvent::ImageQueued { image_id, .. } => assert_eq!(image_id, ids[0]),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_image_is_recompressed() {
        let config = IntakeConfig {
            compress_threshold_bytes: 1024,
            compress_target_bytes: 16 * 1024,
            ..Default::default()
        };
        let session = session_with_guests(1, config).await;

        let ids = session
            .enqueue(vec![IncomingFile::new("big.png", Some("image/png"), noisy_png(256, 256))])
            .await
            .unwrap()
            .finished()
            .await;

        let image = session.image(ids[0]).await.unwrap();
        assert!(image.compressed);
        assert!(image.payload.size() <= 16 * 1024);
        assert_eq!(image.payload.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(image.payload.file_name, "big.jpg");
        assert_eq!(image.original_name, "big.png");
    }

    #[tokio::test]
    async fn test_compression_failure_keeps_original() {
        let config = IntakeConfig {
            compress_threshold_bytes: 2,
            ..Default::default()
        };
        let session = session_with_guests(1, config).await;
        let file = jpeg_file("broken.jpg");
        let original = file.bytes.clone();

        let ids = session.enqueue(vec![file]).await.unwrap().finished().await;

        let image = session.image(ids[0]).await.unwrap();
        assert!(!image.compressed);
        assert_eq!(image.payload.bytes, original);
        assert_eq!(image.preview, Preview::Passthrough);
    }

    #[tokio::test]
    async fn test_remove_and_clear_queued_items() {
        let session = session_with_guests(3, IntakeConfig::default()).await;
        let ids = session
            .enqueue(vec![jpeg_file("a.jpg"), jpeg_file("b.jpg"), jpeg_file("c.jpg")])
            .await
            .unwrap()
            .finished()
            .await;

        let removed = session.remove_item(ids[0]).await.unwrap();
        assert_eq!(removed.status, ImageStatus::Removed);
        assert_eq!(session.remaining_slots().await, 1);

        assert_eq!(
            session.remove_item(ids[0]).await.unwrap_err(),
            IntakeError::UnknownImage(ids[0])
        );

        assert_eq!(session.clear_queue().await, 2);
        assert!(session.images().await.is_empty());
        assert_eq!(session.clear_queue().await, 0);
    }

    #[test]
    fn test_with_jpg_extension() {
        assert_eq!(with_jpg_extension("scan.PNG"), "scan.jpg");
        assert_eq!(with_jpg_extension("noext"), "noext.jpg");
        assert_eq!(with_jpg_extension(".hidden"), ".hidden.jpg");
    }
}
