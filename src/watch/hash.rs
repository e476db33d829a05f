// src/watch/hash.rs

//! Content digests used to swallow no-op saves (`use_hash`).

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::listing::WatchSet;

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute a deterministic hash over the contents of the given files.
///
/// Order of `paths` does not matter; they are sorted before hashing. Paths
/// are mixed into the hash too, so renames and new empty files count as a
/// change.
pub fn compute_hash_for_paths(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<String> {
    let mut hasher = Hasher::new();

    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    for path in sorted {
        if fs.is_file(path) {
            let file_hash = compute_file_hash(fs, path)?;
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(file_hash.as_bytes());
        }
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, "computed aggregate hash");
    Ok(hash)
}

/// Remembers the digest of the watch set as of the last delivered change.
#[derive(Debug)]
pub struct ContentDigest {
    fs: Arc<dyn FileSystem>,
    set: WatchSet,
    last: Option<String>,
}

impl ContentDigest {
    /// Take the initial digest so that the first save of unchanged content
    /// is already recognised as a no-op.
    pub fn new(fs: Arc<dyn FileSystem>, set: WatchSet) -> Self {
        let mut digest = Self {
            fs,
            set,
            last: None,
        };
        digest.last = digest.compute().ok();
        digest
    }

    fn compute(&self) -> Result<String> {
        let paths = self.set.paths(self.fs.as_ref())?;
        compute_hash_for_paths(self.fs.as_ref(), &paths)
    }

    /// Recompute the digest and report whether it differs from the last one.
    ///
    /// Any hashing error (e.g. a file briefly missing during an atomic save)
    /// counts as a change.
    pub fn changed(&mut self) -> bool {
        match self.compute() {
            Ok(hash) => {
                let changed = self.last.as_deref() != Some(hash.as_str());
                self.last = Some(hash);
                changed
            }
            Err(e) => {
                debug!(error = %e, "hashing watch set failed; treating as changed");
                self.last = None;
                true
            }
        }
    }
}
