// src/engine/mod.rs

//! Run scheduling engine for replit.
//!
//! This module turns a stream of change events into a disciplined sequence
//! of interpreter runs:
//! - at most one interpreter process is alive at any time (single flight),
//! - changes arriving mid-run are coalesced into one pending run,
//! - a run that is still going `stale_after` past its start is preempted by
//!   a newer change,
//! - user kills cancel the active run without touching statistics.
//!
//! The pure state machine lives in [`core`]; the async/IO shell that owns the
//! processes and the display sink is implemented in [`runtime`].

use std::time::{Duration, Instant};

use crate::types::ChangeOrigin;

/// Monotonic identifier of a run within one session.
pub type RunId = u64;

/// Counters shown in the display header.
///
/// `count` only counts runs that exited on their own; killed and
/// failed-to-start runs are not recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub count: u64,
    pub last_duration_millis: u64,
}

/// How a run ended, as reported by the IO shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The interpreter exited on its own.
    Exited {
        duration: Duration,
        exit_code: Option<i32>,
    },
    /// The interpreter was killed.
    Killed,
    /// The interpreter could not be spawned.
    SpawnFailed,
}

/// Why an active run is being killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillReason {
    /// Explicit user request.
    User,
    /// A change arrived more than `stale_after` after the run started.
    Stale,
    /// A manual rerun replaces the active run.
    Superseded,
    /// The session is shutting down.
    Shutdown,
}

/// Events flowing into the scheduler core.
///
/// Timestamps are taken by the shell so the core never reads the clock.
#[derive(Debug, Clone, Copy)]
pub enum SchedulerEvent {
    /// The watched set changed (or the user asked for a rerun).
    ChangeDetected { origin: ChangeOrigin, at: Instant },
    /// The user asked to kill the active run.
    KillRequested,
    /// A previously started run is over and its process has been reaped.
    RunEnded {
        run_id: RunId,
        outcome: RunOutcome,
        at: Instant,
    },
    /// Graceful shutdown requested.
    ShutdownRequested,
}

/// Out-of-band requests from the user to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Kill,
    /// Run now; supersedes an active run.
    Rerun,
}

pub mod core;
pub mod runtime;

pub use core::{CoreCommand, CoreStep, SchedulerCore, SlotState};
pub use runtime::{RunScheduler, SchedulerHandle};
