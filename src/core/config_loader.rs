//! # Config Loader
//!
//! Resolves the immutable [`RunConfig`] for a run. Two layers are merged:
//! the optional `config.toml` and the command-line flags, with the flags
//! taking precedence.

use crate::{
    core::paths,
    models::{ExecMode, FileConfig, RunConfig},
};
use std::{fs, io::ErrorKind, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    TomlParse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Command-line overrides, as far as configuration is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub slots: Option<usize>,
    pub dry_run: bool,
    pub ordered: bool,
    pub keep_order: bool,
    pub shuffle: bool,
    pub no_shell: bool,
}

/// Loads the config file from its default location. A missing file (or a
/// system without a config directory) yields the defaults.
pub fn load_file_config() -> Result<FileConfig, ConfigError> {
    match paths::get_config_file_path() {
        Ok(path) => load_file_config_from(&path),
        Err(e) => {
            log::debug!("{} Using built-in defaults.", e);
            Ok(FileConfig::default())
        }
    }
}

pub fn load_file_config_from(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No config file at '{}'.", path.display());
            return Ok(FileConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let config = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded config from '{}': {:?}", path.display(), config);
    Ok(config)
}

/// Merges the file layer and the command-line layer into the run's config.
pub fn resolve_run_config(file: &FileConfig, overrides: &ConfigOverrides) -> RunConfig {
    let requested = overrides.slots.or(file.slots).unwrap_or(0);
    let slots = if requested == 0 {
        host_parallelism()
    } else {
        requested
    };

    let exec_mode = if overrides.no_shell {
        ExecMode::Direct
    } else {
        ExecMode::shell(file.shell.clone(), file.shell_args.clone())
    };

    RunConfig {
        slots,
        dry_run: overrides.dry_run,
        ordered: overrides.ordered || file.ordered,
        keep_order: overrides.keep_order || file.keep_order,
        shuffle: overrides.shuffle || file.shuffle,
        exec_mode,
    }
}

/// Number of processing units on this host, never less than one.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
