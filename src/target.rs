// src/target.rs

//! Target file resolution.
//!
//! The target is either an existing user-supplied file, or a fresh temporary
//! file pre-populated with a shebang for the selected interpreter. Only the
//! temporary kind is ever deleted by replit (at shutdown).

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::errors::{ReplitError, Result};

/// Prefix for temporary target files.
pub const TEMP_PREFIX: &str = "replit";

/// The file being edited and executed.
#[derive(Debug)]
pub struct TargetFile {
    path: PathBuf,
    is_temporary: bool,
    handle: File,
}

impl TargetFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }

    /// Release the open handle, keeping only what cleanup needs.
    pub fn into_parts(self) -> (PathBuf, bool) {
        drop(self.handle);
        (self.path, self.is_temporary)
    }
}

/// Open `file` if given, otherwise create a temporary file under the system
/// temp directory.
pub fn resolve_target(file: Option<&Path>, language: &str) -> Result<TargetFile> {
    resolve_target_in(file, language, &std::env::temp_dir())
}

/// Like [`resolve_target`], with an explicit directory for temporary files.
pub fn resolve_target_in(file: Option<&Path>, language: &str, temp_dir: &Path) -> Result<TargetFile> {
    match file {
        Some(path) => open_existing(path),
        None => create_temporary(language, temp_dir),
    }
}

/// The first line written into temporary targets.
pub fn shebang_for(language: &str) -> String {
    format!("#!/usr/bin/env {language}\n")
}

fn open_existing(path: &Path) -> Result<TargetFile> {
    if !path.is_file() {
        return Err(ReplitError::TargetNotFound(path.to_path_buf()));
    }

    let handle = File::open(path).with_context(|| format!("opening target file {:?}", path))?;
    info!(path = %path.display(), "using existing target file");

    Ok(TargetFile {
        path: path.to_path_buf(),
        is_temporary: false,
        handle,
    })
}

fn create_temporary(language: &str, temp_dir: &Path) -> Result<TargetFile> {
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(temp_dir)
        .with_context(|| format!("creating temporary file in {:?}", temp_dir))?;

    tmp.write_all(shebang_for(language).as_bytes())
        .context("writing shebang to temporary file")?;
    tmp.flush().context("flushing temporary file")?;

    // Cleanup is ours (at shutdown), not the guard's.
    let (handle, path) = tmp
        .keep()
        .map_err(|e| anyhow::anyhow!("persisting temporary file: {}", e.error))?;

    info!(path = %path.display(), language, "created temporary target file");

    Ok(TargetFile {
        path,
        is_temporary: true,
        handle,
    })
}
