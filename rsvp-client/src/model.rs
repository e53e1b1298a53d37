//! Client-side image types

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a queued image
///
/// `Queued -> Assigned -> Submitted` or `Queued -> Removed`. `Submitted` and
/// `Removed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Queued,
    Assigned,
    Submitted,
    Removed,
}

impl ImageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStatus::Queued => "queued",
            ImageStatus::Assigned => "assigned",
            ImageStatus::Submitted => "submitted",
            ImageStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file handed to the intake queue
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    /// Declared mimetype; guessed from the extension when absent
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(file_name: impl Into<String>, mime_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.map(str::to_string),
            bytes,
        }
    }

    /// Mimetype as declared, or guessed from the file extension
    pub fn effective_mime(&self) -> Option<String> {
        self.mime_type
            .as_deref()
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
            .or_else(|| mime_from_extension(&self.file_name).map(str::to_string))
    }

    pub fn is_image(&self) -> bool {
        self.effective_mime()
            .map(|m| m.starts_with("image/"))
            .unwrap_or(false)
    }
}

/// Best-effort mimetype for common image extensions
pub fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(mime)
}

/// Bytes plus the name and type they travel under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: Option<String>,
}

impl ImagePayload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// What the UI shows for a queued image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Decoded and redrawn as a small JPEG
    Thumbnail {
        jpeg: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// Decode failed or ran out of time; show the payload bytes as-is
    Passthrough,
    /// Nothing to show
    Unavailable,
}

/// One image owned by the session
#[derive(Debug, Clone)]
pub struct PassportImage {
    pub id: Uuid,
    pub payload: ImagePayload,
    /// Name the file was selected under
    pub original_name: String,
    /// 0-based guest position; `None` while unassigned
    pub guest_index: Option<usize>,
    pub preview: Preview,
    pub status: ImageStatus,
    /// True when the payload is a recompressed copy
    pub compressed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_mime() {
        let declared = IncomingFile::new("scan.bin", Some("IMAGE/PNG"), vec![]);
        assert_eq!(declared.effective_mime().as_deref(), Some("image/png"));

        let guessed = IncomingFile::new("Passport.JPEG", None, vec![]);
        assert_eq!(guessed.effective_mime().as_deref(), Some("image/jpeg"));
        assert!(guessed.is_image());

        let other = IncomingFile::new("notes.pdf", None, vec![]);
        assert!(!other.is_image());

        let pdf = IncomingFile::new("x.jpg", Some("application/pdf"), vec![]);
        assert!(!pdf.is_image());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ImageStatus::Assigned.to_string(), "assigned");
    }
}
