//! Error types for rsvp-client

use rsvp_common::api::{ErrorCode, ErrorResponse};
use thiserror::Error;
use uuid::Uuid;

use crate::model::ImageStatus;

/// Generic message shown for every submission failure
pub const SUBMIT_FAILED_MESSAGE: &str = "Something went wrong while sending your RSVP. Please try again.";

/// Image intake errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    /// Batch would exceed the remaining guest slots; nothing was admitted
    #[error("You can upload at most {remaining} more image(s); {requested} selected")]
    TooManyImages { requested: usize, remaining: usize },

    /// Batch contained a file that is not an image; nothing was admitted
    #[error("Only images can be uploaded: {0}")]
    NotAnImage(String),

    #[error("Image not found: {0}")]
    UnknownImage(Uuid),

    /// Remove/clear is only allowed for queued images
    #[error("Image {id} is {status} and can no longer be removed")]
    NotQueued { id: Uuid, status: ImageStatus },
}

/// Guest-image assignment and guest editing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    #[error("Image not found: {0}")]
    UnknownImage(Uuid),

    #[error("Guest index {index} out of range ({count} guests)")]
    GuestOutOfRange { index: usize, count: usize },

    /// Another image already holds the guest position
    #[error("Guest {guest_index} already has an image ({holder})")]
    GuestAlreadyHasImage { guest_index: usize, holder: Uuid },

    #[error("Image {id} is {status} and cannot be assigned")]
    NotAssignable { id: Uuid, status: ImageStatus },
}

/// Reasons a payload cannot be assembled
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("Main contact email is empty")]
    MissingEmail,

    #[error("Guest list is empty")]
    NoGuests,

    /// Every queued image must be assigned before submitting
    #[error("{0} image(s) not assigned to a guest")]
    Unassigned(usize),

    #[error("{0} image(s) still processing")]
    StillProcessing(usize),

    #[error("{0} image(s) were already submitted")]
    AlreadySubmitted(usize),

    #[error("A submission is already in progress")]
    InProgress,

    #[error("This RSVP was already submitted")]
    SessionSubmitted,
}

/// Submission failures, classified by where they happened
#[derive(Debug, Error)]
pub enum SubmitError {
    /// No response received
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Response received with a non-success status
    #[error("Server returned {status}: {body}")]
    Application { status: u16, body: String },

    /// No request could be constructed
    #[error("Could not build submission: {0}")]
    Local(String),
}

impl SubmitError {
    /// True when the server was never reached; callers may offer a manual retry
    pub fn is_transport(&self) -> bool {
        matches!(self, SubmitError::Transport(_))
    }

    /// Category used in logs and events
    pub fn category(&self) -> &'static str {
        match self {
            SubmitError::Transport(_) => "transport_error",
            SubmitError::Application { .. } => "application_error",
            SubmitError::Local(_) => "local_error",
        }
    }

    /// Error code from an application failure body, if it carried one
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            SubmitError::Application { body, .. } => serde_json::from_str::<ErrorResponse>(body)
                .ok()
                .map(|r| r.error),
            _ => None,
        }
    }

    /// The single user-visible message, whatever the cause
    pub fn user_message(&self) -> &'static str {
        SUBMIT_FAILED_MESSAGE
    }
}

impl From<AssembleError> for SubmitError {
    fn from(err: AssembleError) -> Self {
        SubmitError::Local(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_error_code() {
        let err = SubmitError::Application {
            status: 400,
            body: r#"{"ok":false,"error":"bad_request"}"#.to_string(),
        };
        assert_eq!(err.error_code(), Some(ErrorCode::BadRequest));
        assert!(!err.is_transport());
        assert_eq!(err.category(), "application_error");

        let err = SubmitError::Application {
            status: 502,
            body: "<html>Bad Gateway</html>".to_string(),
        };
        assert_eq!(err.error_code(), None);
    }

    #[test]
    fn test_local_error_from_assemble() {
        let err: SubmitError = AssembleError::Unassigned(2).into();
        assert_eq!(err.category(), "local_error");
        assert_eq!(err.user_message(), SUBMIT_FAILED_MESSAGE);
    }
}
