//! XDG Base Directory and home directory helpers.

use crate::error::CabinetError;
use std::path::PathBuf;

/// Get XDG config home directory
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise defaults to `$HOME/.config`
pub fn config_home() -> Result<PathBuf, CabinetError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }
    Ok(home_dir()?.join(".config"))
}

/// The user's home directory.
pub fn home_dir() -> Result<PathBuf, CabinetError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| {
            CabinetError::Config("Could not determine home directory (HOME not set)".to_string())
        })
}

/// Global config file: `$XDG_CONFIG_HOME/cabinet/config.toml`
pub fn global_config_path() -> Result<PathBuf, CabinetError> {
    Ok(config_home()?.join("cabinet").join("config.toml"))
}

/// Directory mirrored when none is configured: `$HOME/cabinet`
pub fn default_root() -> Result<PathBuf, CabinetError> {
    Ok(home_dir()?.join("cabinet"))
}
