// src/core/paths.rs

use crate::constants::{APP_DIR_NAME, CONFIG_FILENAME, CONFIG_PATH_ENV};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
}

/// Returns the path to the fanrun configuration directory (`~/.config/fanrun`).
/// Unlike a cache directory, it is never created on demand.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Location of the configuration file: `$FANRUN_CONFIG` when set, otherwise
/// `config.toml` inside the config directory.
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    if let Ok(custom) = env::var(CONFIG_PATH_ENV)
        && !custom.trim().is_empty()
    {
        return Ok(PathBuf::from(shellexpand::tilde(custom.trim()).into_owned()));
    }
    Ok(get_config_dir()?.join(CONFIG_FILENAME))
}
