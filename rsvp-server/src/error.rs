//! Error types for rsvp-server
//!
//! Every failure maps to one of three client-visible codes. The full cause is
//! logged with its category before the generic body is sent.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rsvp_common::api::{ErrorCode, ErrorResponse};
use thiserror::Error;
use tracing::{error, warn};

use crate::persistence::PersistError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing contact, empty or malformed guest list (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// File part over the per-file ceiling or request over the body limit (413)
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// File part that is not an image (415)
    #[error("Unsupported upload: {0}")]
    UnsupportedMedia(String),

    /// Store or image write failure (500)
    #[error(transparent)]
    Persist(PersistError),
}

impl ApiError {
    /// Operational category used in logs
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "validation_error",
            ApiError::PayloadTooLarge(_) | ApiError::UnsupportedMedia(_) => "upload_rejected",
            ApiError::Persist(_) => "store_io_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::BadRequest(_) => ErrorCode::BadRequest,
            ApiError::PayloadTooLarge(_) | ApiError::UnsupportedMedia(_) => ErrorCode::UploadRejected,
            ApiError::Persist(_) => ErrorCode::ServerError,
        }
    }
}

impl From<PersistError> for ApiError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Persist(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(category = self.category(), status = status.as_u16(), "{}", self);
        } else {
            warn!(category = self.category(), status = status.as_u16(), "{}", self);
        }

        (status, Json(ErrorResponse::new(self.code()))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = PersistError::Validation("empty".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.category(), "validation_error");
    }

    #[test]
    fn test_store_failure_maps_to_server_error() {
        let err: ApiError = PersistError::Store(StoreError::Full(5)).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), ErrorCode::ServerError);
        assert_eq!(err.category(), "store_io_error");
    }

    #[test]
    fn test_upload_rejections() {
        let too_big = ApiError::PayloadTooLarge("x".to_string());
        let not_image = ApiError::UnsupportedMedia("y".to_string());
        assert_eq!(too_big.code(), ErrorCode::UploadRejected);
        assert_eq!(not_image.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
