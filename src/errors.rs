// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplitError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("language {0} is not in PATH")]
    InterpreterNotFound(String),

    #[error("the command '{0}' is not in PATH; is it installed and available as a command?")]
    EditorNotFound(String),

    #[error("watch utility '{0}' is not in PATH")]
    WatchUtilityNotFound(String),

    #[error("{} was not a directory", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("target file {} does not exist", .0.display())]
    TargetNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ReplitError>;
