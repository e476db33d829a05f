// src/config/mod.rs

//! Configuration loading and validation for replit.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Merge CLI flags, file values and the environment into a validated
//!   [`SessionConfig`] (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_from_path, load_or_default};
pub use model::{ConfigFile, EditorSection, RunSection, WatchSection};
pub use validate::{
    resolve_editor, resolve_session, EditorCommand, RunSettings, SessionConfig, SessionEnv,
    WatchSettings,
};
