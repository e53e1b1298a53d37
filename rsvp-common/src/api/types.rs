//! Request/response types for `POST /submit-rsvp`

use serde::{Deserialize, Serialize};

use crate::model::GuestRecord;
use crate::Result;

/// Submission endpoint path
pub const SUBMIT_PATH: &str = "/submit-rsvp";

/// Multipart text field carrying the main contact email
pub const FIELD_MAIN_EMAIL: &str = "mainEmail";

/// Multipart text field carrying the JSON-encoded guest array
pub const FIELD_GUESTS: &str = "guests";

/// Multipart file field; repeated once per passport image
pub const FIELD_PASSPORTS: &str = "passports";

// ========================================
// Response Types
// ========================================

/// Success body: `{ok: true, guests: <int>, images: <int>}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub ok: bool,
    /// Number of guest rows appended to the store
    pub guests: usize,
    /// Number of image files received and written
    pub images: usize,
}

impl SubmitResponse {
    pub fn new(guests: usize, images: usize) -> Self {
        Self {
            ok: true,
            guests,
            images,
        }
    }
}

/// Error category reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing contact email, empty or malformed guest list (400)
    BadRequest,
    /// Non-image part or oversize file (413/415)
    UploadRejected,
    /// Store or image write failed (500)
    ServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::UploadRejected => "upload_rejected",
            ErrorCode::ServerError => "server_error",
        }
    }
}

/// Failure body: `{ok: false, error: "<code>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorCode,
}

impl ErrorResponse {
    pub fn new(error: ErrorCode) -> Self {
        Self { ok: false, error }
    }
}

// ========================================
// Guest list encoding
// ========================================

/// Encode the guest list for the `guests` multipart field
pub fn encode_guests(guests: &[GuestRecord]) -> Result<String> {
    Ok(serde_json::to_string(guests)?)
}

/// Decode the `guests` multipart field
pub fn decode_guests(raw: &str) -> Result<Vec<GuestRecord>> {
    Ok(serde_json::from_str(raw)?)
}
