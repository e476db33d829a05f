// src/watch/mod.rs

//! File watching and change detection.
//!
//! Filesystem-event detection itself is delegated to an external blocking
//! watch utility; this module:
//! - builds the watched path set (single file, or a directory enumeration
//!   minus `exclude` globs),
//! - runs the utility once per cycle and re-arms it ([`change_source`],
//!   [`watch_loop`]),
//! - optionally swallows changes that leave contents identical ([`hash`]),
//! - hands coalesced change events to the scheduler ([`notifier`]).

pub mod change_source;
pub mod hash;
pub mod listing;
pub mod notifier;
pub mod path_utils;
pub mod watch_loop;

pub use change_source::{ChangeSource, CommandChangeSource};
pub use hash::{compute_hash_for_paths, ContentDigest};
pub use listing::{build_exclude_set, list_directory, WatchSet};
pub use notifier::{change_channel, ChangeEvent, ChangeNotifier};
pub use watch_loop::{run_watch_loop, spawn_watch_loop, WatchPolicy};
