//! Submission persistence engine
//!
//! Receives one decoded submission and:
//! 1. Builds one row per guest, recomputing each passport flag from the
//!    received file names, and rejects any value too long for a cell
//! 2. Under the store's write lock, writes every uploaded image into the
//!    image folder
//! 3. Appends the rows to the store
//!
//! If writing an image or appending the rows fails, the images this
//! submission already wrote are deleted again.
//!
//! The passport flag a client sends is never trusted; a guest has a passport
//! on record iff a received file's stem equals that guest's normalized stem.
//!
//! # Collision policy
//!
//! Image files are never overwritten. A name that already exists in the image
//! folder is written as `<stem>-<n>.<ext>` with the smallest free `n >= 2`.
//! Passport matching uses the stem as sent, before any suffix.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use rsvp_common::filename::{file_stem_lowercase, sanitize_upload_name};
use rsvp_common::GuestRecord;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{GuestStore, PersistedGuestRow, StoreError, MAX_CELL_CHARS};

/// Persistence errors
#[derive(Debug, Error)]
pub enum PersistError {
    /// Missing contact email, empty guest list, or a value too long to store
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Image file could not be written
    #[error("Image write failed for {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Store read or replace failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One file part received with a submission
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client (pre-normalized, not yet sanitized)
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A decoded submission, owned by the engine for the duration of one request
#[derive(Debug, Clone, Default)]
pub struct IncomingSubmission {
    pub main_email: String,
    pub guests: Vec<GuestRecord>,
    pub files: Vec<UploadedFile>,
}

/// Where one uploaded image ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Lower-cased stem used for passport matching
    pub stem: String,
    /// Filename written in the image folder
    pub stored_name: String,
}

/// Result of a successful submission
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    /// Rows appended for this submission
    pub created: usize,
    /// Images written for this submission
    pub images: Vec<StoredImage>,
    /// Store row count after the append
    pub total_rows: usize,
}

/// Persists submissions into the guest store and image folder
#[derive(Debug)]
pub struct PersistenceEngine {
    store: GuestStore,
    image_dir: PathBuf,
}

impl PersistenceEngine {
    pub fn new(store: GuestStore, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            image_dir: image_dir.into(),
        }
    }

    pub fn store(&self) -> &GuestStore {
        &self.store
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Validate, store images, recompute passport flags, append rows
    pub async fn handle_submission(
        &self,
        submission: IncomingSubmission,
    ) -> Result<SubmissionOutcome, PersistError> {
        let main_email = submission.main_email.trim().to_string();

        // Step 1: Validate
        if main_email.is_empty() {
            return Err(PersistError::Validation("mainEmail is empty".to_string()));
        }
        if submission.guests.is_empty() {
            return Err(PersistError::Validation("guest list is empty".to_string()));
        }

        // Passport presence depends only on the received names, so rows can be
        // built and checked before anything touches the disk
        let received: HashSet<String> = submission
            .files
            .iter()
            .map(|f| file_stem_lowercase(&sanitize_upload_name(&f.file_name)))
            .collect();

        let rows: Vec<PersistedGuestRow> = submission
            .guests
            .iter()
            .enumerate()
            .map(|(idx, guest)| {
                let expected = guest.normalized_stem(idx);
                let passport = received.contains(&expected);
                if passport != guest.passport_present {
                    debug!(
                        guest_index = idx + 1,
                        client_flag = guest.passport_present,
                        server_flag = passport,
                        "Client passport flag disagrees with received files"
                    );
                }
                PersistedGuestRow::from_guest(&main_email, idx, guest, passport)
            })
            .collect();

        if let Some((idx, column)) = rows
            .iter()
            .enumerate()
            .find_map(|(idx, row)| row.oversized_column().map(|c| (idx, c)))
        {
            return Err(PersistError::Validation(format!(
                "guest {} {} exceeds {} characters",
                idx + 1,
                column,
                MAX_CELL_CHARS
            )));
        }

        // Every step from here runs under the single-writer lock, so the image
        // name checks and the store read-modify-write see no interleaving
        let mut writer = self.store.lock().await;

        let mut images = Vec::with_capacity(submission.files.len());
        for file in &submission.files {
            match self.write_image(file).await {
                Ok(image) => images.push(image),
                Err(e) => {
                    self.remove_images(&images).await;
                    return Err(e);
                }
            }
        }

        let created = rows.len();
        let total_rows = match writer.append(rows).await {
            Ok(total) => total,
            Err(e) => {
                self.remove_images(&images).await;
                return Err(e.into());
            }
        };

        info!(
            main_email = %main_email,
            guests = created,
            images = images.len(),
            total_rows,
            "Submission persisted"
        );

        Ok(SubmissionOutcome {
            created,
            images,
            total_rows,
        })
    }

    /// Delete images written by a request that then failed
    async fn remove_images(&self, images: &[StoredImage]) {
        for image in images {
            if let Err(e) = tokio::fs::remove_file(self.image_dir.join(&image.stored_name)).await {
                warn!(file = %image.stored_name, error = %e, "Could not remove image of failed submission");
            }
        }
    }

    async fn write_image(&self, file: &UploadedFile) -> Result<StoredImage, PersistError> {
        let sanitized = sanitize_upload_name(&file.file_name);
        let stem = file_stem_lowercase(&sanitized);

        let stored_name = self
            .free_name(&sanitized)
            .await
            .map_err(|source| PersistError::Image {
                name: sanitized.clone(),
                source,
            })?;

        if stored_name != sanitized {
            info!(
                requested = %sanitized,
                stored = %stored_name,
                "Image name taken, stored with suffix"
            );
        }

        tokio::fs::write(self.image_dir.join(&stored_name), &file.bytes)
            .await
            .map_err(|source| PersistError::Image {
                name: stored_name.clone(),
                source,
            })?;

        Ok(StoredImage { stem, stored_name })
    }

    /// First name among `name`, `stem-2.ext`, `stem-3.ext`, ... not on disk
    async fn free_name(&self, name: &str) -> io::Result<String> {
        if !tokio::fs::try_exists(self.image_dir.join(name)).await? {
            return Ok(name.to_string());
        }

        let path = Path::new(name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

        let mut n = 2u32;
        loop {
            let candidate = match &extension {
                Some(ext) => format!("{}-{}.{}", stem, n, ext),
                None => format!("{}-{}", stem, n),
            };
            if !tokio::fs::try_exists(self.image_dir.join(&candidate)).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}
