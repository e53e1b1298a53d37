//! Bootstrap configuration for rsvp-server
//!
//! Loaded once at startup from TOML. Every field has a built-in default, so a
//! missing config file still yields a working server.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--data-dir`, `--port`)
//! 2. Environment variables (`RSVP_DATA_DIR`, `RSVP_PORT`)
//! 3. TOML configuration file
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::store::RetryPolicy;

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "RSVP_DATA_DIR";

/// Default config file name under `<config dir>/rsvp/`
pub const CONFIG_FILE_NAME: &str = "rsvp-server.toml";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (default: all interfaces)
    pub bind_address: String,

    /// HTTP port (default: 3001)
    pub port: u16,

    /// Folder holding the store file and the image folder
    ///
    /// If not specified, resolved from CLI → environment → OS default
    pub data_dir: Option<PathBuf>,

    /// Store workbook file name inside the data folder
    pub store_file: String,

    /// Image folder name inside the data folder
    pub image_dir_name: String,

    /// Per-file upload ceiling in MiB
    pub max_file_mb: u64,

    /// Whole-request body ceiling in MiB
    pub max_request_mb: u64,

    /// Extra attempts when the store file is transiently locked
    pub store_write_retries: u32,

    /// Fixed delay between store replace attempts
    pub store_retry_delay_ms: u64,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is not set (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            data_dir: None,
            store_file: "registered guests.xlsx".to_string(),
            image_dir_name: "passport pictures - guests".to_string(),
            max_file_mb: 100,
            max_request_mb: 1024,
            store_write_retries: 5,
            store_retry_delay_ms: 500,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_file_bytes: (self.max_file_mb * BYTES_PER_MB) as usize,
            max_request_bytes: (self.max_request_mb * BYTES_PER_MB) as usize,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.store_write_retries,
            delay: Duration::from_millis(self.store_retry_delay_ms),
        }
    }

    /// Resolve the on-disk locations this config points at
    pub fn data_paths(&self, cli_data_dir: Option<&Path>) -> DataPaths {
        let data_dir =
            rsvp_common::config::resolve_data_dir(cli_data_dir, DATA_DIR_ENV, self.data_dir.as_deref());
        DataPaths::new(data_dir, &self.store_file, &self.image_dir_name)
    }
}

/// Size limits enforced on incoming submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: usize,
    pub max_request_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        ServerConfig::default().upload_limits()
    }
}

/// Resolved data locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub store_path: PathBuf,
    pub image_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: PathBuf, store_file: &str, image_dir_name: &str) -> Self {
        Self {
            store_path: data_dir.join(store_file),
            image_dir: data_dir.join(image_dir_name),
            data_dir,
        }
    }

    /// Create the data folder and image folder if missing
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.image_dir)?;
        Ok(())
    }
}
