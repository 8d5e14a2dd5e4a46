//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Record store and vault locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("vitalog").to_string_lossy().to_string())
        .unwrap_or_else(|| "./vitalog_data".to_string())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("vitalog.db")
    }

    /// Directory holding the PIN vault files
    pub fn vault_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("vault")
    }
}

/// WebDAV sync configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Server base URL (e.g. "https://dav.example.com/remote.php/dav")
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_remote_dir() -> String {
    "vitalog".to_string()
}

fn default_request_timeout() -> u64 {
    15_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            username: String::new(),
            password: String::new(),
            remote_dir: default_remote_dir(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("vitalog").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = std::env::var("VITALOG_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        if let Ok(url) = std::env::var("VITALOG_WEBDAV_URL") {
            self.sync.enabled = true;
            self.sync.url = url;
        }
        if let Ok(username) = std::env::var("VITALOG_WEBDAV_USER") {
            self.sync.username = username;
        }
        if let Ok(password) = std::env::var("VITALOG_WEBDAV_PASSWORD") {
            self.sync.password = password;
        }
        if let Ok(dir) = std::env::var("VITALOG_WEBDAV_DIR") {
            self.sync.remote_dir = dir;
        }

        if let Ok(level) = std::env::var("VITALOG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VITALOG_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Vitalog Configuration
#
# Environment variables override these settings:
# - VITALOG_DATA_DIR
# - VITALOG_WEBDAV_URL
# - VITALOG_WEBDAV_USER
# - VITALOG_WEBDAV_PASSWORD
# - VITALOG_WEBDAV_DIR
# - VITALOG_LOG_LEVEL
# - VITALOG_LOG_FORMAT

[storage]
# Directory for the record database and PIN vault
data_dir = "~/.local/share/vitalog"

[sync]
# Enable WebDAV backup sync
enabled = false

# WebDAV server base URL
url = ""

# Basic-Auth credentials
username = ""
password = ""

# Remote collection holding the backup
remote_dir = "vitalog"

# Request timeout (ms)
request_timeout_ms = 15000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert!(!config.sync.enabled);
        assert_eq!(config.sync.remote_dir, "vitalog");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            toml::from_str("[sync]\nenabled = true\nurl = \"https://dav\"\n").unwrap();
        assert!(config.sync.enabled);
        assert_eq!(config.sync.request_timeout_ms, 15_000);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_storage_paths() {
        let storage = StorageConfig {
            data_dir: "/tmp/vitalog".to_string(),
        };
        assert_eq!(
            storage.database_path(),
            PathBuf::from("/tmp/vitalog/vitalog.db")
        );
        assert_eq!(storage.vault_dir(), PathBuf::from("/tmp/vitalog/vault"));
    }
}
