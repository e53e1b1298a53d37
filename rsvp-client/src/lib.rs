//! rsvp-client library
//!
//! Client side of the RSVP pipeline: a session holding the guest list and
//! image queue, image intake (compression and previews), guest-image
//! assignment, payload assembly, and the HTTP submitter.

pub mod assembler;
mod assignment;
pub mod error;
pub mod events;
pub mod intake;
pub mod model;
pub mod session;
pub mod submit;

pub use assembler::{build_payload, Attachment, SubmissionPayload};
pub use error::{AssembleError, AssignError, IntakeError, SubmitError};
pub use events::{EventBus, SessionEvent};
pub use intake::{IntakeConfig, PendingBatch};
pub use model::{ImagePayload, ImageStatus, IncomingFile, PassportImage, Preview};
pub use session::{Session, SessionSnapshot, SubmissionState};
pub use submit::RsvpClient;
