//! `POST /submit-rsvp`
//!
//! Multipart fields:
//! - `mainEmail`: text
//! - `guests`: JSON array of guest objects
//! - `passports`: zero or more image parts, each named by the client's
//!   normalized filename
//!
//! Upload screening (image mimetype, per-file ceiling) happens here, before the
//! persistence engine sees anything.

use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use rsvp_common::api::{
    decode_guests, SubmitResponse, FIELD_GUESTS, FIELD_MAIN_EMAIL, FIELD_PASSPORTS, SUBMIT_PATH,
};
use tracing::debug;

use crate::config::UploadLimits;
use crate::error::{ApiError, ApiResult};
use crate::persistence::{IncomingSubmission, UploadedFile};
use crate::AppState;

/// POST /submit-rsvp
pub async fn submit_rsvp(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let submission = read_submission(&mut multipart, state.limits).await?;
    let outcome = state.engine.handle_submission(submission).await?;

    Ok(Json(SubmitResponse::new(outcome.created, outcome.images.len())))
}

/// Build submission routes with the whole-request body limit applied
pub fn submit_routes(limits: UploadLimits) -> Router<AppState> {
    Router::new()
        .route(SUBMIT_PATH, post(submit_rsvp))
        .layer(DefaultBodyLimit::max(limits.max_request_bytes))
}

async fn read_submission(
    multipart: &mut Multipart,
    limits: UploadLimits,
) -> ApiResult<IncomingSubmission> {
    let mut main_email = String::new();
    let mut guests_raw: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            FIELD_MAIN_EMAIL => main_email = field.text().await.map_err(multipart_error)?,
            FIELD_GUESTS => guests_raw = Some(field.text().await.map_err(multipart_error)?),
            FIELD_PASSPORTS => files.push(read_image(field, limits.max_file_bytes).await?),
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let guests = match guests_raw.as_deref().map(str::trim) {
        None | Some("") => Vec::new(),
        Some(raw) => decode_guests(raw)
            .map_err(|e| ApiError::BadRequest(format!("guests field: {}", e)))?,
    };

    Ok(IncomingSubmission {
        main_email,
        guests,
        files,
    })
}

/// Read one file part, enforcing the image allowlist and the size ceiling
async fn read_image(mut field: Field<'_>, max_file_bytes: usize) -> ApiResult<UploadedFile> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);

    let is_image = content_type
        .as_deref()
        .map(|ct| ct.to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(ApiError::UnsupportedMedia(format!(
            "{} ({})",
            file_name,
            content_type.as_deref().unwrap_or("no content type")
        )));
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > max_file_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "{} exceeds {} bytes",
                file_name, max_file_bytes
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
