//! HTTP submitter
//!
//! Sends one multipart request to `POST /submit-rsvp` and classifies the
//! outcome. Nothing is retried here: a blind resend can append the same
//! guests twice.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use rsvp_common::api::{
    encode_guests, SubmitResponse, FIELD_GUESTS, FIELD_MAIN_EMAIL, FIELD_PASSPORTS, SUBMIT_PATH,
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::assembler::{build_from_snapshot, SubmissionPayload};
use crate::error::{AssembleError, SubmitError};
use crate::events::SessionEvent;
use crate::model::ImageStatus;
use crate::session::{Session, SessionState, SubmissionState};

/// Default request timeout; large uploads over slow links need headroom
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for the RSVP submission endpoint
#[derive(Debug, Clone)]
pub struct RsvpClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RsvpClient {
    /// `base_url` is the server root, e.g. `http://localhost:3001`
    pub fn new(base_url: &str) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SubmitError::Local(format!("HTTP client: {}", e)))?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), SUBMIT_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the payload as one multipart request
    pub async fn send(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, SubmitError> {
        let form = build_form(payload)?;

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(SubmitError::Transport)?;

        let status = response.status();
        // A status arrived, so a broken body is still the server's answer
        let body = response.text().await.map_err(|e| SubmitError::Application {
            status: status.as_u16(),
            body: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(SubmitError::Application {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<SubmitResponse>(&body).map_err(|_| SubmitError::Application {
            status: status.as_u16(),
            body,
        })
    }
}

fn build_form(payload: &SubmissionPayload) -> Result<Form, SubmitError> {
    let guests = encode_guests(&payload.guests).map_err(|e| SubmitError::Local(e.to_string()))?;

    let mut form = Form::new()
        .text(FIELD_MAIN_EMAIL, payload.main_email.clone())
        .text(FIELD_GUESTS, guests);

    for attachment in &payload.attachments {
        let mut part = Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone());
        if let Some(mime) = &attachment.mime_type {
            part = part.mime_str(mime).map_err(|e| {
                SubmitError::Local(format!("{}: {}", attachment.file_name, e))
            })?;
        }
        form = form.part(FIELD_PASSPORTS, part);
    }

    Ok(form)
}

impl Session {
    /// Assemble the current session and send it
    ///
    /// A session is submitted at most once: while a request is in flight or
    /// after one succeeded, further calls fail locally without sending. A
    /// failed attempt leaves the session free to try again.
    ///
    /// On success every included image becomes `submitted`. Failures are
    /// reported once through the event bus and returned; nothing is retried.
    pub async fn submit(&self, client: &RsvpClient) -> Result<SubmitResponse, SubmitError> {
        let result = self.try_submit(client).await;

        match &result {
            Ok(response) => {
                info!(guests = response.guests, images = response.images, "RSVP submitted");
                self.events.emit_lossy(SessionEvent::SubmissionCompleted {
                    guests: response.guests,
                    images: response.images,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                if e.is_transport() {
                    warn!(category = e.category(), "Submission failed: {}", e);
                } else {
                    error!(category = e.category(), "Submission failed: {}", e);
                }
                self.events.emit_lossy(SessionEvent::SubmissionFailed {
                    category: e.category().to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        result
    }

    async fn try_submit(&self, client: &RsvpClient) -> Result<SubmitResponse, SubmitError> {
        // Claim the session and assemble under one write lock, so a second
        // submit sees `Submitting` rather than the same payload
        let (payload, mut in_flight) = {
            let mut state = self.state.write().await;
            match state.submission {
                SubmissionState::Submitting => return Err(AssembleError::InProgress.into()),
                SubmissionState::Submitted => return Err(AssembleError::SessionSubmitted.into()),
                SubmissionState::Idle => {}
            }
            let payload = build_from_snapshot(&state.snapshot())?;
            state.submission = SubmissionState::Submitting;
            (payload, InFlight::new(self.state.clone()))
        };

        let result = client.send(&payload).await;

        let mut state = self.state.write().await;
        in_flight.settled = true;
        match result {
            Ok(response) => {
                state.submission = SubmissionState::Submitted;
                for id in &payload.image_ids {
                    if let Some(image) = state.image_mut(*id) {
                        image.status = ImageStatus::Submitted;
                    }
                }
                Ok(response)
            }
            Err(e) => {
                state.submission = SubmissionState::Idle;
                Err(e)
            }
        }
    }
}

/// Returns the session to `Idle` when a submit future is dropped mid-request
struct InFlight {
    state: Arc<RwLock<SessionState>>,
    settled: bool,
}

impl InFlight {
    fn new(state: Arc<RwLock<SessionState>>) -> Self {
        Self {
            state,
            settled: false,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Ok(mut state) = self.state.try_write() {
            state.submission = SubmissionState::Idle;
            return;
        }
        let state = self.state.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                state.write().await.submission = SubmissionState::Idle;
            });
        }
    }
}
