//! Configuration system for TabBridge
//!
//! This module provides a trait-based configuration system that supports:
//! - Type-safe config structs via serde
//! - TOML file format
//! - Auto-generation of default configs
//! - Manual reload capability
//!
//! # Example
//!
//! ```ignore
//! use serde::{Deserialize, Serialize};
//! use tabbridge_core::PluginConfig;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! pub struct ClickerConfig {
//!     pub interval_ms: u64,
//!     pub selector: String,
//! }
//!
//! impl PluginConfig for ClickerConfig {
//!     const PLUGIN_NAME: &'static str = "auto_clicker";
//! }
//!
//! let config = ClickerConfig::load().unwrap_or_default();
//! ```

mod loader;

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use loader::{
    base_dir, configs_dir, core_config_path, plugin_config_path, plugin_config_path_in,
    CONFIG_ENV, HOME_ENV,
};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Could not determine config directory from the executable location
    #[error("Config directory not available - could not resolve base path")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Read a TOML file, or write and return the default when it is missing
fn load_or_create<T>(path: &Path, what: &str) -> ConfigResult<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: T = toml::from_str(&content)?;
        tracing::debug!("Loaded {} from {:?}", what, path);
        Ok(config)
    } else {
        let default = T::default();
        write_toml(path, &default)?;
        tracing::info!("Created default {} at {:?}", what, path);
        Ok(default)
    }
}

/// Write `value` as pretty TOML, creating parent directories
fn write_toml<T: Serialize>(path: &Path, value: &T) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Trait for plugin configuration types.
///
/// Implement this trait on your config struct to enable automatic loading,
/// saving, and reloading of configuration files.
///
/// # File Location
///
/// Configs are stored at `<base>/config/plugins/{PLUGIN_NAME}.toml`. The
/// `*_in` variants take the configs directory explicitly.
pub trait PluginConfig: Default + Serialize + DeserializeOwned + Send + Sync {
    /// The plugin name used for config file path resolution.
    const PLUGIN_NAME: &'static str;

    /// Load config from file, creating default if missing.
    fn load() -> ConfigResult<Self> {
        Self::load_in(&configs_dir()?)
    }

    /// Load config from `<configs_dir>/plugins/`, creating default if missing.
    fn load_in(configs_dir: &Path) -> ConfigResult<Self> {
        let path = plugin_config_path_in(configs_dir, Self::PLUGIN_NAME);
        load_or_create(&path, &format!("config for {}", Self::PLUGIN_NAME))
    }

    /// Save config to file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> ConfigResult<()> {
        self.save_in(&configs_dir()?)
    }

    fn save_in(&self, configs_dir: &Path) -> ConfigResult<()> {
        let path = plugin_config_path_in(configs_dir, Self::PLUGIN_NAME);
        write_toml(&path, self)?;
        tracing::debug!("Saved config for {} to {:?}", Self::PLUGIN_NAME, path);
        Ok(())
    }

    /// Reload config from file.
    ///
    /// Updates self with the current file contents.
    fn reload(&mut self) -> ConfigResult<()> {
        self.reload_in(&configs_dir()?)
    }

    fn reload_in(&mut self, configs_dir: &Path) -> ConfigResult<()> {
        let path = plugin_config_path_in(configs_dir, Self::PLUGIN_NAME);
        let content = std::fs::read_to_string(&path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded config for {} from {:?}", Self::PLUGIN_NAME, path);
        Ok(())
    }
}

/// Where [`StorageService`](crate::storage::StorageService) keeps its values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// In-process map, lost on exit
    #[default]
    Memory,

    /// JSON document on disk
    File,
}

/// Core framework configuration.
///
/// Loaded from `$TABBRIDGE_CONFIG` or `<base>/config/tabbridge.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging; also the initial debug mode when storage has
    /// no stored flag
    pub debug: bool,

    /// `tracing` filter directive used when debug is off
    pub log_filter: String,

    /// Storage backend selection
    pub storage_backend: StorageKind,

    /// JSON file for the `file` backend
    pub storage_path: PathBuf,

    /// Warn when a method hook names a method the class does not have
    pub warn_on_missing_methods: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            log_filter: "info".to_string(),
            storage_backend: StorageKind::Memory,
            storage_path: PathBuf::from("tabbridge-storage.json"),
            warn_on_missing_methods: false,
        }
    }
}

impl CoreConfig {
    /// Load core config from file, creating default if missing.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&core_config_path()?)
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        load_or_create(path, "core config")
    }

    /// Save core config to file.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&core_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        write_toml(path, self)?;
        tracing::debug!("Saved core config to {:?}", path);
        Ok(())
    }

    /// Reload core config from file.
    pub fn reload(&mut self) -> ConfigResult<()> {
        self.reload_from(&core_config_path()?)
    }

    pub fn reload_from(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded core config from {:?}", path);
        Ok(())
    }
}
