//! Session events
//!
//! Broadcast so a UI (or a test) can follow queue and submission progress
//! without polling the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted by a [`crate::Session`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Image finished processing and is visible in the queue
    ImageQueued {
        image_id: Uuid,
        file_name: String,
        timestamp: DateTime<Utc>,
    },

    /// Oversized image was recompressed
    ImageCompressed {
        image_id: Uuid,
        original_bytes: usize,
        compressed_bytes: usize,
        timestamp: DateTime<Utc>,
    },

    ImageRemoved {
        image_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Every queued image was removed
    QueueCleared {
        removed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Image bound to a guest position and renamed
    ImageAssigned {
        image_id: Uuid,
        guest_index: usize,
        file_name: String,
        timestamp: DateTime<Utc>,
    },

    SubmissionCompleted {
        guests: usize,
        images: usize,
        timestamp: DateTime<Utc>,
    },

    /// `category` is one of `transport_error`, `application_error`, `local_error`
    SubmissionFailed {
        category: String,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast channel for [`SessionEvent`]s
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
