//! Configuration file discovery and data folder resolution

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::{Error, Result};

/// Application folder name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "rsvp";

/// Data folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file value
/// 4. OS-dependent default (fallback)
pub fn resolve_data_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config_value: Option<&Path>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = config_value {
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent default
    default_data_dir()
}

/// OS-dependent default data folder
///
/// `~/.local/share/rsvp` on Linux, the matching local data folder elsewhere,
/// `./data` when the platform offers none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Locate the TOML config file
///
/// An explicit path wins; otherwise `<config dir>/rsvp/<file_name>` is used if
/// it exists. Returns `None` when no file is found.
pub fn find_config_file(explicit: Option<&Path>, file_name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join(file_name))
        .filter(|p| p.exists())
}

/// Load a TOML config, falling back to defaults
///
/// A missing file is not an error (warning + defaults). A file that exists but
/// does not parse is an error, so a typo never silently reverts settings.
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No config file found, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using built-in defaults", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}
