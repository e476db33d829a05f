// src/display/mod.rs

//! Output sink abstraction between the scheduler and whatever renders it.
//!
//! The scheduler and the output pump tasks call into a [`DisplaySink`] from
//! different Tokio tasks; implementations own their synchronization.

pub mod terminal;

use std::fmt;

use crate::types::OutputStream;

pub use terminal::TerminalDisplay;

/// Lifecycle of the most recent run, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No run has started yet.
    Waiting,
    Running,
    /// The interpreter exited; `None` means it was terminated by a signal.
    Exited(Option<i32>),
    /// The run was cancelled (user kill, staleness preemption, shutdown).
    Killed,
    /// The interpreter could not be spawned.
    FailedToStart,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Waiting => f.write_str("waiting"),
            RunStatus::Running => f.write_str("running"),
            RunStatus::Exited(Some(code)) => write!(f, "exit {code}"),
            RunStatus::Exited(None) => f.write_str("terminated"),
            RunStatus::Killed => f.write_str("killed"),
            RunStatus::FailedToStart => f.write_str("failed to start"),
        }
    }
}

/// Live display fed by the run scheduler.
pub trait DisplaySink: Send + Sync {
    /// Reset the output region before a new run.
    fn clear(&self);
    /// Append raw interpreter output.
    fn write(&self, stream: OutputStream, bytes: &[u8]);
    fn set_run_count(&self, count: u64);
    fn set_run_duration(&self, millis: u64);
    fn set_status(&self, status: RunStatus);
    /// Render pending header/status changes.
    fn refresh(&self);
}
