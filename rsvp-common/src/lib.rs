//! # RSVP Common Library
//!
//! Shared code for the RSVP client and server:
//! - Filename normalization (the one copy both sides compile in)
//! - Guest record data model
//! - HTTP API request/response types
//! - Configuration path resolution
//! - Common error type

pub mod api;
pub mod config;
pub mod error;
pub mod filename;
pub mod model;

pub use error::{Error, Result};
pub use filename::{extension_for_mime, normalize, normalize_stem, sanitize_upload_name};
pub use model::{AgeGroup, Allergy, Attendance, GuestRecord};
