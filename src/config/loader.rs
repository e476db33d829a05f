// src/config/loader.rs

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::Result;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "REPLIT_CONFIG";

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; semantic validation happens in
/// [`crate::config::validate::resolve_session`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: ConfigFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Pick the config file to load, if any.
///
/// `--config` wins over `REPLIT_CONFIG`; an empty env value counts as unset.
pub fn config_path(cli_path: Option<&Path>, env_value: Option<OsString>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    env_value
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Load the config named by `--config` / `REPLIT_CONFIG`, or fall back to
/// built-in defaults when neither is set.
pub fn load_or_default(cli_path: Option<&Path>) -> Result<ConfigFile> {
    match config_path(cli_path, std::env::var_os(CONFIG_ENV_VAR)) {
        Some(path) => load_from_path(path),
        None => Ok(ConfigFile::default()),
    }
}
