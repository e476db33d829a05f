// src/watch/listing.rs

//! The set of paths handed to the watch utility each cycle.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::FileSystem;
use crate::types::DirectoryScan;
use crate::watch::path_utils::relative_str;

/// Compile exclude patterns (relative to the watched directory).
pub fn build_exclude_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern '{pat}'"))?;
        builder.add(glob);
    }
    builder.build().context("building exclude glob set")
}

/// Recursively list regular files under `root`, skipping anything whose
/// root-relative path matches `exclude`. The result is sorted.
pub fn list_directory(fs: &dyn FileSystem, root: &Path, exclude: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in fs.read_dir(&dir)? {
            if let Some(rel) = relative_str(root, &entry) {
                if exclude.is_match(&rel) {
                    continue;
                }
            }

            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if fs.is_file(&entry) {
                files.push(entry);
            }
        }
    }

    files.sort();
    debug!(root = %root.display(), count = files.len(), "enumerated watched directory");
    Ok(files)
}

/// What the watch utility observes.
#[derive(Clone)]
pub enum WatchSet {
    /// Temporary-file mode: only the target itself.
    File(PathBuf),
    /// Directory mode: every file under `root` (minus excludes), plus the
    /// target even if it lives elsewhere.
    Directory {
        root: PathBuf,
        target: PathBuf,
        exclude: GlobSet,
        scan: DirectoryScan,
        snapshot: Vec<PathBuf>,
    },
}

impl fmt::Debug for WatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchSet::File(path) => f.debug_tuple("File").field(path).finish(),
            WatchSet::Directory { root, scan, snapshot, .. } => f
                .debug_struct("Directory")
                .field("root", root)
                .field("scan", scan)
                .field("snapshot_len", &snapshot.len())
                .finish_non_exhaustive(),
        }
    }
}

impl WatchSet {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        WatchSet::File(path.into())
    }

    /// Build a directory watch set. The directory is enumerated once here;
    /// with [`DirectoryScan::Snapshot`] that listing is used forever.
    pub fn directory(
        fs: &dyn FileSystem,
        root: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        exclude: &[String],
        scan: DirectoryScan,
    ) -> Result<Self> {
        let root = root.into();
        let exclude = build_exclude_set(exclude)?;
        let snapshot = list_directory(fs, &root, &exclude)?;

        Ok(WatchSet::Directory {
            root,
            target: target.into(),
            exclude,
            scan,
            snapshot,
        })
    }

    /// Paths to watch for the next cycle.
    pub fn paths(&self, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
        match self {
            WatchSet::File(path) => Ok(vec![path.clone()]),
            WatchSet::Directory {
                root,
                target,
                exclude,
                scan,
                snapshot,
            } => {
                let mut paths = match scan {
                    DirectoryScan::Snapshot => snapshot.clone(),
                    DirectoryScan::Rescan => list_directory(fs, root, exclude)?,
                };
                if !paths.iter().any(|p| p == target) {
                    paths.push(target.clone());
                }
                Ok(paths)
            }
        }
    }
}
