//! Config path resolution
//!
//! Handles resolving paths for configuration files based on the binary's location.

use std::path::{Path, PathBuf};

use super::{ConfigError, ConfigResult};

/// Environment variable that overrides the base directory
pub const HOME_ENV: &str = "TABBRIDGE_HOME";

/// Environment variable that overrides the core config file path
pub const CONFIG_ENV: &str = "TABBRIDGE_CONFIG";

/// Returns the tabbridge base directory.
///
/// `$TABBRIDGE_HOME` when set, otherwise the directory holding the running
/// executable.
pub fn base_dir() -> ConfigResult<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }

    let exe = std::env::current_exe().map_err(ConfigError::IoError)?;
    exe.parent()
        .map(PathBuf::from)
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Returns the base configs directory.
///
/// Path: `<base>/config/`
pub fn configs_dir() -> ConfigResult<PathBuf> {
    Ok(base_dir()?.join("config"))
}

/// Returns the path for a plugin's config file.
///
/// Path: `<base>/config/plugins/{plugin_name}.toml`
pub fn plugin_config_path(plugin_name: &str) -> ConfigResult<PathBuf> {
    Ok(plugin_config_path_in(&configs_dir()?, plugin_name))
}

/// Plugin config path relative to an explicit configs directory
pub fn plugin_config_path_in(configs_dir: &Path, plugin_name: &str) -> PathBuf {
    configs_dir
        .join("plugins")
        .join(format!("{}.toml", plugin_name))
}

/// Returns the core config path.
///
/// `$TABBRIDGE_CONFIG` when set, otherwise `<base>/config/tabbridge.toml`
pub fn core_config_path() -> ConfigResult<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(configs_dir()?.join("tabbridge.toml"))
}
