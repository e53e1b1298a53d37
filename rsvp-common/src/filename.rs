//! Guest image filename normalization
//!
//! The client names an image file at assignment time and the server recomputes
//! the same name at persistence time to decide whether a guest's passport was
//! received. Both sides call into this module, so the two computations are the
//! same code and cannot drift apart.
//!
//! # Algorithm
//!
//! 1. Take the non-blank values among first name, middle name, last name (each
//!    trimmed), then the 1-based guest index, joined with `_`
//! 2. Collapse whitespace runs to `_`
//! 3. Drop every character that is not a Unicode letter, an ASCII digit or `_`
//! 4. Lower-case, collapse repeated `_`
//! 5. If no name character survived, the stem is `_<index>`
//! 6. Append `.` + an extension derived from the image mimetype

use std::path::Path;

/// Extension used when the mimetype is absent or not a known image type
pub const FALLBACK_EXTENSION: &str = "jpg";

/// Replacement for uploaded names that sanitize to nothing usable
const EMPTY_UPLOAD_NAME: &str = "upload";

/// Characters Windows refuses in filenames; stripped from uploaded names
const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Build the full normalized filename for a guest image
///
/// Pure and total: any input produces a filename, never a path.
///
/// # Examples
///
/// ```
/// use rsvp_common::filename::normalize;
///
/// assert_eq!(normalize("Dana", "", "Levi", 1, Some("image/jpeg")), "dana_levi_1.jpg");
/// assert_eq!(normalize("", "", "", 3, None), "_3.jpg");
/// ```
pub fn normalize(
    first_name: &str,
    middle_name: &str,
    last_name: &str,
    one_based_index: usize,
    mime_type: Option<&str>,
) -> String {
    format!(
        "{}.{}",
        normalize_stem(first_name, middle_name, last_name, one_based_index),
        extension_for_mime(mime_type)
    )
}

/// Build the normalized filename stem (no extension) for a guest
pub fn normalize_stem(
    first_name: &str,
    middle_name: &str,
    last_name: &str,
    one_based_index: usize,
) -> String {
    let mut stem = String::new();

    for part in [first_name, middle_name, last_name]
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
    {
        if !stem.is_empty() {
            push_normalized(&mut stem, "_");
        }
        push_normalized(&mut stem, part);
    }

    if stem.chars().all(|c| c == '_') {
        return format!("_{}", one_based_index);
    }

    push_normalized(&mut stem, "_");
    push_normalized(&mut stem, &one_based_index.to_string());
    stem
}

/// Map a declared mimetype to a file extension
///
/// Parameters after `;` are ignored and matching is case-insensitive.
pub fn extension_for_mime(mime_type: Option<&str>) -> &'static str {
    let Some(mime_type) = mime_type else {
        return FALLBACK_EXTENSION;
    };

    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/heif" => "heif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => FALLBACK_EXTENSION,
    }
}

/// Defensively sanitize a filename received in an upload
///
/// Keeps only the final path component, collapses whitespace to `_`, strips
/// filesystem-forbidden and control characters. Unicode letters are kept.
pub fn sanitize_upload_name(raw: &str) -> String {
    let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();

    let mut out = String::with_capacity(base.len());
    let mut in_whitespace = false;
    for c in base.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if FORBIDDEN_FILENAME_CHARS.contains(&c) || c.is_control() {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        EMPTY_UPLOAD_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lower-cased stem of a (sanitized) filename, used for passport matching
pub fn file_stem_lowercase(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn is_allowed(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit() || c == '_'
}

/// Append `raw` to `out`, applying whitespace collapse, stripping,
/// lower-casing and `_` collapse against what is already in `out`
fn push_normalized(out: &mut String, raw: &str) {
    for c in raw.chars() {
        let c = if c.is_whitespace() { '_' } else { c };
        if !is_allowed(c) {
            continue;
        }
        for lc in c.to_lowercase() {
            if !is_allowed(lc) {
                continue;
            }
            if lc == '_' && out.ends_with('_') {
                continue;
            }
            out.push(lc);
        }
    }
}
