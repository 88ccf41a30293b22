//! Configuration file location and loading
//!
//! Resolution order for the bootstrap file:
//! 1. Explicit path (command-line argument)
//! 2. Environment variable
//! 3. Per-user config directory (`<config_dir>/cuedeck/config.toml`)
//! 4. System-wide file (`/etc/cuedeck/config.toml`, Linux only)
//!
//! A missing file is not an error; callers fall back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CUEDECK_CONFIG";

/// Locate the bootstrap config file, if any exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("cuedeck").join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/cuedeck/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load and parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    debug!("Loaded configuration from {}", path.display());
    Ok(parsed)
}

/// OS-dependent data directory for the database file
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cuedeck"))
        .unwrap_or_else(|| PathBuf::from("./cuedeck_data"))
}
