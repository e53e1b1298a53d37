//! Common error types for the RSVP crates

use thiserror::Error;

/// Common result type for RSVP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by client and server
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Guest list could not be encoded or decoded
    #[error("Guest list encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
