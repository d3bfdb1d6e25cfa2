//! Configuration management for license-tracker.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "license-tracker";

/// Prefix for nested environment overrides.
const ENV_PREFIX: &str = "LICENSE_TRACKER_";

/// Flat environment variables and the config keys they set.
const FLAT_ENV_KEYS: [(&str, &str); 4] = [
    ("DATA_FILE", "storage.data_file"),
    ("EXPORT_FILE", "storage.export_file"),
    ("PORT", "server.port"),
    ("STATIC_DIR", "server.static_dir"),
];

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Flat environment variables (`DATA_FILE`, `EXPORT_FILE`, `PORT`, `STATIC_DIR`)
/// 2. Nested environment variables (`LICENSE_TRACKER_SERVER__PORT`, ...)
/// 3. TOML config file at `~/.config/license-tracker/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
}

/// What the store does when the backing file cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptPolicy {
    /// Fail the operation and leave the file untouched.
    #[default]
    Fail,
    /// Move the file aside and start from an empty collection.
    Quarantine,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the JSON file holding the license collection.
    pub data_file: PathBuf,
    /// Path the CSV export is written to.
    pub export_file: PathBuf,
    /// Handling of an unreadable data file.
    pub on_corrupt: CorruptPolicy,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory holding `dashboard.html` and `edit.html`.
    pub static_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("licenses.json"),
            export_file: PathBuf::from("licenses_export.csv"),
            on_corrupt: CorruptPolicy::Fail,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5050,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(config_file))
    }

    /// Build the provider chain for the given config file.
    #[must_use]
    pub fn figment(config_file: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&FLAT_ENV_KEYS.map(|(var, _)| var))
                    .map(|key| flat_env_key(key.as_str()).into()),
            )
    }

    /// Extract and validate a configuration from a figment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "port must be greater than 0".to_string(),
            });
        }

        if self.storage.data_file.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "data_file must not be empty".to_string(),
            });
        }

        if self.storage.export_file.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "export_file must not be empty".to_string(),
            });
        }

        if self.storage.data_file == self.storage.export_file {
            return Err(Error::ConfigValidation {
                message: format!(
                    "data_file and export_file must differ (both are {})",
                    self.storage.data_file.display()
                ),
            });
        }

        Ok(())
    }

    /// Get the socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not a valid IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::ConfigValidation {
                message: format!("invalid host '{}': {e}", self.server.host),
            })
    }

    /// File name offered to clients downloading the CSV export.
    #[must_use]
    pub fn export_file_name(&self) -> String {
        self.storage
            .export_file
            .file_name()
            .map_or_else(
                || "licenses_export.csv".to_string(),
                |name| name.to_string_lossy().into_owned(),
            )
    }
}

/// Map a flat environment variable name to its nested config key.
fn flat_env_key(var: &str) -> String {
    FLAT_ENV_KEYS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(var))
        .map_or_else(|| var.to_ascii_lowercase(), |(_, key)| (*key).to_string())
}
