// src/exec/mod.rs

//! Process execution layer.
//!
//! Everything that owns an OS child process lives here:
//!
//! - [`supervisor`] spawns the interpreter against the target file, pumps its
//!   output into a display sink and exposes `wait` / idempotent `kill`.
//! - [`editor`] launches the user's editor and keeps it around for shutdown.
//! - [`kill`] implements process-group SIGTERM → SIGKILL termination shared by
//!   all of the above (and by the watch utility).

pub mod editor;
pub mod kill;
pub mod supervisor;

pub use editor::{launch_editor, EditorProcess};
pub use kill::terminate;
pub use supervisor::{ProcessSupervisor, RunReport, SupervisedProcess};
