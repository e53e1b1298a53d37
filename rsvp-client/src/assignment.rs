//! Guest-image assignment
//!
//! Binds one image to one guest position. A position is held by at most one
//! image; a rejected assignment leaves every image and guest untouched.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AssignError;
use crate::events::SessionEvent;
use crate::model::ImageStatus;
use crate::session::Session;

impl Session {
    /// Assign image `image_id` to the guest at 0-based `guest_index`
    ///
    /// Returns the image's new filename. Assigning an already assigned image to
    /// another guest moves it, subject to the same uniqueness check.
    pub async fn assign(&self, image_id: Uuid, guest_index: usize) -> Result<String, AssignError> {
        let mut state = self.state.write().await;

        let count = state.guests.len();
        if guest_index >= count {
            return Err(AssignError::GuestOutOfRange {
                index: guest_index,
                count,
            });
        }

        let image = state
            .images
            .iter()
            .find(|i| i.id == image_id)
            .ok_or(AssignError::UnknownImage(image_id))?;
        if !matches!(image.status, ImageStatus::Queued | ImageStatus::Assigned) {
            return Err(AssignError::NotAssignable {
                id: image_id,
                status: image.status,
            });
        }
        let mime_type = image.payload.mime_type.clone();

        if let Some(holder) = state.holder_of(guest_index) {
            if holder.id != image_id {
                return Err(AssignError::GuestAlreadyHasImage {
                    guest_index,
                    holder: holder.id,
                });
            }
        }

        let file_name = state.guests[guest_index].image_filename(guest_index, mime_type.as_deref());

        if let Some(image) = state.image_mut(image_id) {
            image.payload.file_name = file_name.clone();
            image.guest_index = Some(guest_index);
            image.status = ImageStatus::Assigned;
        }
        state.refresh_passport_flags();
        drop(state);

        info!(image_id = %image_id, guest_index, file_name = %file_name, "Image assigned");
        self.events.emit_lossy(SessionEvent::ImageAssigned {
            image_id,
            guest_index,
            file_name: file_name.clone(),
            timestamp: Utc::now(),
        });
        Ok(file_name)
    }
}
