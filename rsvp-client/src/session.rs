//! Session-scoped RSVP form state
//!
//! One [`Session`] owns the main contact, the ordered guest list, and the
//! image queue. Components receive the session handle (cheap to clone) or an
//! immutable [`SessionSnapshot`]; nothing is process-global.

use std::sync::Arc;

use rsvp_common::GuestRecord;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::AssignError;
use crate::events::EventBus;
use crate::intake::IntakeConfig;
use crate::model::{ImageStatus, PassportImage};

/// Where the session's one submission stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionState {
    /// Nothing sent yet, or the last attempt failed
    #[default]
    Idle,
    /// A request is in flight
    Submitting,
    /// The server accepted the RSVP
    Submitted,
}

/// Mutable session contents, guarded by the session lock
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) main_email: String,
    pub(crate) guests: Vec<GuestRecord>,
    /// Images that finished processing, in arrival order
    pub(crate) images: Vec<PassportImage>,
    /// Admitted images still being compressed or previewed
    pub(crate) reserved: usize,
    pub(crate) submission: SubmissionState,
}

impl SessionState {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            main_email: self.main_email.clone(),
            guests: self.guests.clone(),
            images: self.images.clone(),
            processing: self.reserved,
        }
    }

    /// Images that occupy a guest slot (queued or assigned)
    pub(crate) fn live_count(&self) -> usize {
        self.images
            .iter()
            .filter(|i| matches!(i.status, ImageStatus::Queued | ImageStatus::Assigned))
            .count()
    }

    pub(crate) fn image_mut(&mut self, id: Uuid) -> Option<&mut PassportImage> {
        self.images.iter_mut().find(|i| i.id == id)
    }

    /// Image currently assigned to `guest_index`, if any
    pub(crate) fn holder_of(&self, guest_index: usize) -> Option<&PassportImage> {
        self.images
            .iter()
            .find(|i| i.status == ImageStatus::Assigned && i.guest_index == Some(guest_index))
    }

    /// Re-derive every guest's passport flag from current assignments
    pub(crate) fn refresh_passport_flags(&mut self) {
        for idx in 0..self.guests.len() {
            let held = self.holder_of(idx).is_some();
            self.guests[idx].passport_present = held;
        }
    }
}

/// Frozen copy of the session for assembly
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub main_email: String,
    pub guests: Vec<GuestRecord>,
    pub images: Vec<PassportImage>,
    /// Images admitted but not yet visible
    pub processing: usize,
}

/// Handle to one RSVP form session
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) state: Arc<RwLock<SessionState>>,
    pub(crate) events: EventBus,
    pub(crate) intake: IntakeConfig,
}

impl Session {
    pub fn new(intake: IntakeConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            events: EventBus::default(),
            intake,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn intake_config(&self) -> &IntakeConfig {
        &self.intake
    }

    pub async fn set_main_email(&self, email: &str) {
        self.state.write().await.main_email = email.trim().to_string();
    }

    pub async fn main_email(&self) -> String {
        self.state.read().await.main_email.clone()
    }

    /// Append a guest; returns its 0-based position
    ///
    /// The record's passport flag is ignored.
    pub async fn add_guest(&self, mut guest: GuestRecord) -> usize {
        guest.passport_present = false;
        let mut state = self.state.write().await;
        state.guests.push(guest);
        state.guests.len() - 1
    }

    /// Replace the guest at `index`
    ///
    /// The passport flag stays derived from assignments. An image already
    /// assigned to this guest is renamed for the new identity.
    pub async fn update_guest(&self, index: usize, guest: GuestRecord) -> Result<(), AssignError> {
        let mut state = self.state.write().await;
        let count = state.guests.len();
        if index >= count {
            return Err(AssignError::GuestOutOfRange { index, count });
        }

        let passport_present = state.guests[index].passport_present;
        state.guests[index] = GuestRecord {
            passport_present,
            ..guest
        };

        let renamed = state.guests[index].clone();
        if let Some(image) = state
            .images
            .iter_mut()
            .find(|i| i.status == ImageStatus::Assigned && i.guest_index == Some(index))
        {
            let name = renamed.image_filename(index, image.payload.mime_type.as_deref());
            debug!(image_id = %image.id, from = %image.payload.file_name, to = %name, "Renaming assigned image");
            image.payload.file_name = name;
        }
        Ok(())
    }

    pub async fn guests(&self) -> Vec<GuestRecord> {
        self.state.read().await.guests.clone()
    }

    pub async fn images(&self) -> Vec<PassportImage> {
        self.state.read().await.images.clone()
    }

    pub async fn image(&self, id: Uuid) -> Option<PassportImage> {
        self.state.read().await.images.iter().find(|i| i.id == id).cloned()
    }

    /// Number of admitted images still being processed
    pub async fn processing(&self) -> usize {
        self.state.read().await.reserved
    }

    /// Guest slots left for new images
    pub async fn remaining_slots(&self) -> usize {
        let state = self.state.read().await;
        state
            .guests
            .len()
            .saturating_sub(state.live_count() + state.reserved)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn submission_state(&self) -> SubmissionState {
        self.state.read().await.submission
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(IntakeConfig::default())
    }
}
