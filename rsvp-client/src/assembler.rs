//! Submission assembly
//!
//! Works on an immutable snapshot. Passport flags are recomputed here from
//! the images alone, whatever order assignments happened in.

use rsvp_common::GuestRecord;
use uuid::Uuid;

use crate::error::AssembleError;
use crate::model::{ImageStatus, PassportImage};
use crate::session::SessionSnapshot;

/// One file part of the outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Normalized filename, as assigned
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Everything one submission request carries
#[derive(Debug, Clone)]
pub struct SubmissionPayload {
    pub main_email: String,
    pub guests: Vec<GuestRecord>,
    pub attachments: Vec<Attachment>,
    /// Images included, so they can be marked submitted afterwards
    pub image_ids: Vec<Uuid>,
}

/// Build the payload from an explicit contact, guest list and image set
pub fn build_payload(
    main_email: &str,
    guests: &[GuestRecord],
    images: &[PassportImage],
) -> Result<SubmissionPayload, AssembleError> {
    let main_email = main_email.trim();
    if main_email.is_empty() {
        return Err(AssembleError::MissingEmail);
    }
    if guests.is_empty() {
        return Err(AssembleError::NoGuests);
    }

    let unassigned = count_status(images, ImageStatus::Queued);
    if unassigned > 0 {
        return Err(AssembleError::Unassigned(unassigned));
    }
    let submitted = count_status(images, ImageStatus::Submitted);
    if submitted > 0 {
        return Err(AssembleError::AlreadySubmitted(submitted));
    }

    let assigned: Vec<&PassportImage> = images
        .iter()
        .filter(|i| i.status == ImageStatus::Assigned && i.guest_index.is_some())
        .collect();

    let guests = guests
        .iter()
        .enumerate()
        .map(|(idx, guest)| GuestRecord {
            passport_present: assigned.iter().any(|i| i.guest_index == Some(idx)),
            ..guest.clone()
        })
        .collect();

    let attachments = assigned
        .iter()
        .map(|i| Attachment {
            file_name: i.payload.file_name.clone(),
            mime_type: i.payload.mime_type.clone(),
            bytes: i.payload.bytes.clone(),
        })
        .collect();

    Ok(SubmissionPayload {
        main_email: main_email.to_string(),
        guests,
        attachments,
        image_ids: assigned.iter().map(|i| i.id).collect(),
    })
}

/// Build the payload from a session snapshot
///
/// Refused while any image is still processing.
pub fn build_from_snapshot(snapshot: &SessionSnapshot) -> Result<SubmissionPayload, AssembleError> {
    if snapshot.processing > 0 {
        return Err(AssembleError::StillProcessing(snapshot.processing));
    }
    build_payload(&snapshot.main_email, &snapshot.guests, &snapshot.images)
}

fn count_status(images: &[PassportImage], status: ImageStatus) -> usize {
    images.iter().filter(|i| i.status == status).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImagePayload, Preview};

    fn guest(first: &str, last: &str) -> GuestRecord {
        GuestRecord {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Default::default()
        }
    }

    fn image(guest_index: Option<usize>, status: ImageStatus, name: &str) -> PassportImage {
        PassportImage {
            id: Uuid::new_v4(),
            payload: ImagePayload {
                bytes: vec![1, 2, 3],
                file_name: name.to_string(),
                mime_type: Some("image/jpeg".to_string()),
            },
            original_name: "IMG.jpg".to_string(),
            guest_index,
            preview: Preview::Passthrough,
            status,
            compressed: false,
        }
    }

    #[test]
    fn test_flags_recomputed_from_images() {
        let mut stale = guest("Dana", "Levi");
        stale.passport_present = true;
        let guests = vec![stale, guest("Noa", "Levi"), guest("Avi", "Levi")];
        let images = vec![image(Some(2), ImageStatus::Assigned, "avi_levi_3.jpg")];

        let payload = build_payload(" a@b.com ", &guests, &images).unwrap();

        assert_eq!(payload.main_email, "a@b.com");
        let flags: Vec<bool> = payload.guests.iter().map(|g| g.passport_present).collect();
        assert_eq!(flags, vec![false, false, true]);
        assert_eq!(payload.attachments.len(), 1);
        assert_eq!(payload.attachments[0].file_name, "avi_levi_3.jpg");
        assert_eq!(payload.image_ids, vec![images[0].id]);
    }

    #[test]
    fn test_unassigned_image_blocks_submission() {
        let guests = vec![guest("Dana", "Levi")];
        let images = vec![image(None, ImageStatus::Queued, "IMG.jpg")];
        assert_eq!(
            build_payload("a@b.com", &guests, &images).unwrap_err(),
            AssembleError::Unassigned(1)
        );
    }

    #[test]
    fn test_empty_contact_or_guests() {
        assert_eq!(
            build_payload("  ", &[guest("Dana", "Levi")], &[]).unwrap_err(),
            AssembleError::MissingEmail
        );
        assert_eq!(build_payload("a@b.com", &[], &[]).unwrap_err(), AssembleError::NoGuests);
    }

    #[test]
    fn test_processing_blocks_snapshot() {
        let snapshot = SessionSnapshot {
            main_email: "a@b.com".to_string(),
            guests: vec![guest("Dana", "Levi")],
            images: vec![],
            processing: 1,
        };
        assert_eq!(
            build_from_snapshot(&snapshot).unwrap_err(),
            AssembleError::StillProcessing(1)
        );
    }

    #[test]
    fn test_resubmission_refused() {
        let guests = vec![guest("Dana", "Levi")];
        let images = vec![image(Some(0), ImageStatus::Submitted, "dana_levi_1.jpg")];
        assert_eq!(
            build_payload("a@b.com", &guests, &images).unwrap_err(),
            AssembleError::AlreadySubmitted(1)
        );
    }
}
