//! cuedeck host configuration
//!
//! Built-in defaults, then the bootstrap TOML file, then command-line and
//! environment overrides (applied by `main`).

use cuedeck_common::config::{default_data_dir, load_toml, resolve_config_path};
use cuedeck_common::FadeCurve;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_PORT: u16 = 3333;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_PROGRESS_TICK_MS: u64 = 100;

/// Logging section of the bootstrap file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "cuedeck_host=info,cuedeck_remote=info,tower_http=info".to_string(),
        }
    }
}

/// Bootstrap configuration file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_ms: u64,
    pub progress_tick_ms: u64,
    pub fade_curve: FadeCurve,
    /// Output device name; `None` uses the system default
    pub audio_device: Option<String>,
    /// Render into a paced null sink instead of a sound card
    pub headless: bool,
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            progress_tick_ms: DEFAULT_PROGRESS_TICK_MS,
            fade_curve: FadeCurve::default(),
            audio_device: None,
            headless: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Load from the resolved bootstrap file, or defaults when none exists
    pub fn load(cli_path: Option<&Path>) -> crate::Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!("Using config file {}", path.display());
                Ok(load_toml(&path)?)
            }
            Some(path) => {
                info!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Database file, defaulting into the per-user data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("cuedeck.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 3333);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.request_timeout_ms, 5000);
        assert_eq!(config.progress_tick_ms, 100);
        assert_eq!(config.fade_curve, FadeCurve::Linear);
        assert!(!config.headless);
        assert!(config.database_path().ends_with("cuedeck.db"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 4000").unwrap();
        writeln!(file, "headless = true").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let config = TomlConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 4000);
        assert!(config.headless);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.request_timeout_ms, 5000);
    }

    #[test]
    fn test_missing_explicit_file_uses_defaults() {
        let config = TomlConfig::load(Some(Path::new("/nonexistent/cuedeck.toml"))).unwrap();
        assert_eq!(config, TomlConfig::default());
    }
}
