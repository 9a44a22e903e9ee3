//! Configuration management with versioning and migration

use crate::error::{AppError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current configuration version
pub const CONFIG_VERSION: u32 = 1;

/// Portable mode marker filename
const PORTABLE_MARKER: &str = "portable.txt";

/// Configuration filename
const CONFIG_FILENAME: &str = "config.toml";

/// Directory under `%LOCALAPPDATA%` for installed mode
const APP_DIR_NAME: &str = "HeadsetStatus";

/// Hands-free persona friendly name, carries the battery level.
/// `_` stands for the product-line variant character.
pub const DEFAULT_HANDS_FREE_NAME: &str = "W_-1000XM_ Hands-Free AG";

/// Headphones persona friendly name, carries connection state
pub const DEFAULT_HEADPHONES_NAME: &str = "W_-1000XM_";

/// PnP class of the Bluetooth sub-devices cycled by reconnect actions
pub const DEFAULT_BLUETOOTH_CLASS: &str = "Bluetooth";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration version for migration
    #[serde(default = "default_version")]
    pub config_version: u32,

    /// Headset lookup settings
    #[serde(default)]
    pub headset: HeadsetConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadsetConfig {
    /// Friendly name (or pattern) of the hands-free device
    #[serde(default = "default_hands_free_name")]
    pub hands_free_name: String,

    /// Friendly name (or pattern) of the headphones device
    #[serde(default = "default_headphones_name")]
    pub headphones_name: String,

    /// Device class searched by connect/disconnect
    #[serde(default = "default_bluetooth_class")]
    pub bluetooth_class: String,

    /// Pause between the two disable calls of a disconnect, in milliseconds
    #[serde(default = "default_disconnect_delay")]
    pub disconnect_delay_ms: u64,
}

fn default_hands_free_name() -> String {
    DEFAULT_HANDS_FREE_NAME.to_string()
}

fn default_headphones_name() -> String {
    DEFAULT_HEADPHONES_NAME.to_string()
}

fn default_bluetooth_class() -> String {
    DEFAULT_BLUETOOTH_CLASS.to_string()
}

fn default_disconnect_delay() -> u64 {
    100
}

impl Default for HeadsetConfig {
    fn default() -> Self {
        Self {
            hands_free_name: default_hands_free_name(),
            headphones_name: default_headphones_name(),
            bluetooth_class: default_bluetooth_class(),
            disconnect_delay_ms: default_disconnect_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum log file size in bytes
    #[serde(default = "default_max_log_size")]
    pub max_file_size: u64,

    /// Number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: u32,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_max_log_size() -> u64 {
    1024 * 1024 // 1MB
}

fn default_max_log_files() -> u32 {
    3
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_file_size: default_max_log_size(),
            max_files: default_max_log_files(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            headset: HeadsetConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Migrate config from older version
    pub fn migrate(&mut self) -> bool {
        if self.config_version >= CONFIG_VERSION {
            return false;
        }

        info!(
            "Migrating config from version {} to {}",
            self.config_version, CONFIG_VERSION
        );
        // Unversioned files predate the [headset] section; serde defaults fill it in
        self.config_version = CONFIG_VERSION;
        true
    }
}

/// Manages configuration loading and saving
pub struct ConfigManager {
    config_path: PathBuf,
    is_portable: bool,
}

impl ConfigManager {
    /// Create a new config manager, detecting portable vs installed mode
    pub fn new() -> Result<Self> {
        let (config_path, is_portable) = Self::detect_config_path()?;
        Ok(Self {
            config_path,
            is_portable,
        })
    }

    /// Use an explicit config file; logs go next to it
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            is_portable: true,
        }
    }

    /// Detect whether we're running in portable mode and get config path
    fn detect_config_path() -> Result<(PathBuf, bool)> {
        let exe_path = std::env::current_exe()
            .map_err(|e| AppError::ConfigError(format!("Could not get exe path: {}", e)))?;
        let exe_dir = exe_path.parent().ok_or_else(|| {
            AppError::ConfigError("Could not get exe directory".to_string())
        })?;

        // Check for portable marker
        if exe_dir.join(PORTABLE_MARKER).exists() {
            debug!("Portable mode detected via marker file");
            return Ok((exe_dir.join(CONFIG_FILENAME), true));
        }

        match std::env::var("LOCALAPPDATA") {
            Ok(app_data) => {
                let config_dir = PathBuf::from(app_data).join(APP_DIR_NAME);
                Ok((config_dir.join(CONFIG_FILENAME), false))
            }
            Err(_) => {
                debug!("LOCALAPPDATA not set, using exe directory");
                Ok((exe_dir.join(CONFIG_FILENAME), true))
            }
        }
    }

    /// Check if running in portable mode
    pub fn is_portable(&self) -> bool {
        self.is_portable
    }

    /// Get the config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the log directory
    pub fn log_dir(&self) -> PathBuf {
        let base = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if self.is_portable {
            base.join("logs")
        } else {
            base
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Config file not found, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| AppError::ConfigError(format!("Could not read config: {}", e)))?;

        let mut config = parse_config(&content)?;

        if config.migrate() {
            self.save(&config)?;
        }

        info!("Loaded config from {:?}", self.config_path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| AppError::ConfigError(format!("Could not serialize config: {}", e)))?;

        fs::write(&self.config_path, content)
            .map_err(|e| AppError::ConfigError(format!("Could not write config: {}", e)))?;

        info!("Saved config to {:?}", self.config_path);
        Ok(())
    }
}

/// Parse a TOML configuration document
pub fn parse_config(content: &str) -> Result<AppConfig> {
    toml::from_str(content)
        .map_err(|e| AppError::ConfigError(format!("Could not parse config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.config_version, CONFIG_VERSION);
        assert_eq!(config.headset.hands_free_name, "W_-1000XM_ Hands-Free AG");
        assert_eq!(config.headset.headphones_name, "W_-1000XM_");
        assert_eq!(config.headset.disconnect_delay_ms, 100);
    }

    #[test]
    fn test_migrate_unversioned() {
        let mut config = parse_config("config_version = 0").unwrap();
        assert!(config.migrate());
        assert_eq!(config.config_version, CONFIG_VERSION);
        assert!(!config.migrate());
    }

    #[test]
    fn test_log_dir_portable() {
        let manager = ConfigManager::with_path("some/dir/config.toml");
        assert_eq!(manager.log_dir(), PathBuf::from("some/dir/logs"));
    }
}
