// src/types.rs

use std::fmt;

use serde::Deserialize;

/// How the watched file list is obtained in directory mode.
///
/// - `Rescan`: enumerate the directory again before every watch cycle, so
///   files created after startup are picked up on the next cycle (default).
/// - `Snapshot`: enumerate once at startup and reuse that list forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryScan {
    #[default]
    Rescan,
    Snapshot,
}

/// Which output stream of the interpreter a chunk of bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => f.write_str("stdout"),
            OutputStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Where a change event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// The external watch utility observed a change.
    Watcher,
    /// The user asked for a rerun.
    Manual,
}
