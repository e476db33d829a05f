// src/engine/core.rs

//! Pure scheduler state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`SchedulerEvent`]s and produces:
//! - an updated slot state and statistics
//! - a list of [`CoreCommand`]s describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::RunScheduler`) is responsible for:
//! - reading change / control / completion events from channels
//! - spawning and killing interpreter processes
//! - updating the display sink
//!
//! The core has no channels, no Tokio types, no clock reads and no IO, so it
//! can be exercised exhaustively in tests.
//!
//! Slot lifecycle:
//!
//! ```text
//!   Idle ──change──▶ Running ──exit──▶ Idle
//!                      │                 ▲
//!                      └─kill─▶ Killing ─┘ (reaped)
//! ```
//!
//! A new run only ever starts from `Idle`, and `Killing` is left only once
//! the shell reports the killed process as reaped.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::display::RunStatus;
use crate::engine::{KillReason, RunId, RunOutcome, RunStatistics, SchedulerEvent};
use crate::types::ChangeOrigin;

/// Default staleness threshold.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(2);

/// The single execution slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No run active.
    Idle,
    /// A process is spawned (or being spawned) and not yet reaped.
    Running { run_id: RunId, started_at: Instant },
    /// A kill was requested; waiting for the process to be reaped.
    Killing { run_id: RunId, reason: KillReason },
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Clear the display and spawn the interpreter for this run.
    StartRun(RunId),
    /// Kill the process of this run (idempotent on the shell side).
    KillRun { run_id: RunId, reason: KillReason },
    /// A run exited on its own; statistics were updated.
    PublishCompletion {
        stats: RunStatistics,
        exit_code: Option<i32>,
    },
    /// A run ended without completing (killed / failed to start).
    PublishCancelled { run_id: RunId, status: RunStatus },
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer scheduler loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn keep(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Pure scheduler state.
#[derive(Debug)]
pub struct SchedulerCore {
    state: SlotState,
    /// A change arrived that no run has picked up yet.
    pending: bool,
    stats: RunStatistics,
    last_run_started_at: Option<Instant>,
    stale_after: Duration,
    next_run_id: RunId,
    shutting_down: bool,
}

impl SchedulerCore {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            state: SlotState::Idle,
            pending: false,
            stats: RunStatistics::default(),
            last_run_started_at: None,
            stale_after,
            next_run_id: 1,
            shutting_down: false,
        }
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn stats(&self) -> RunStatistics {
        self.stats
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.state == SlotState::Idle
    }

    pub fn last_run_started_at(&self) -> Option<Instant> {
        self.last_run_started_at
    }

    /// The run currently occupying the slot, if any.
    pub fn active_run(&self) -> Option<RunId> {
        match self.state {
            SlotState::Idle => None,
            SlotState::Running { run_id, .. } | SlotState::Killing { run_id, .. } => Some(run_id),
        }
    }

    /// Handle a single event, updating state and returning the resulting
    /// commands for the IO shell.
    pub fn step(&mut self, event: SchedulerEvent) -> CoreStep {
        match event {
            SchedulerEvent::ChangeDetected { origin, at } => self.on_change(origin, at),
            SchedulerEvent::KillRequested => self.on_kill_requested(),
            SchedulerEvent::RunEnded {
                run_id,
                outcome,
                at,
            } => self.on_run_ended(run_id, outcome, at),
            SchedulerEvent::ShutdownRequested => self.on_shutdown(),
        }
    }

    fn on_change(&mut self, origin: ChangeOrigin, at: Instant) -> CoreStep {
        if self.shutting_down {
            debug!(?origin, "ignoring change during shutdown");
            return CoreStep::keep(Vec::new());
        }

        match self.state {
            SlotState::Idle => CoreStep::keep(vec![self.start_run(at)]),
            SlotState::Running { run_id, .. } => {
                self.pending = true;

                if origin == ChangeOrigin::Manual {
                    return CoreStep::keep(vec![self.begin_kill(run_id, KillReason::Superseded)]);
                }

                if self.is_stale(at) {
                    debug!(run_id, "active run is stale; preempting");
                    return CoreStep::keep(vec![self.begin_kill(run_id, KillReason::Stale)]);
                }

                debug!(run_id, "change while running; run queued");
                CoreStep::keep(Vec::new())
            }
            SlotState::Killing { run_id, .. } => {
                debug!(run_id, "change while killing; run queued");
                self.pending = true;
                CoreStep::keep(Vec::new())
            }
        }
    }

    fn on_kill_requested(&mut self) -> CoreStep {
        match self.state {
            SlotState::Running { run_id, .. } => {
                CoreStep::keep(vec![self.begin_kill(run_id, KillReason::User)])
            }
            SlotState::Killing { run_id, .. } => {
                debug!(run_id, "kill already in progress");
                CoreStep::keep(Vec::new())
            }
            SlotState::Idle => {
                debug!("kill requested with no active run; ignoring");
                CoreStep::keep(Vec::new())
            }
        }
    }

    fn on_run_ended(&mut self, run_id: RunId, outcome: RunOutcome, at: Instant) -> CoreStep {
        if self.active_run() != Some(run_id) {
            debug!(run_id, active = ?self.active_run(), "ignoring end of a run that is not active");
            return CoreStep::keep(Vec::new());
        }

        let mut commands = Vec::new();

        match outcome {
            // A kill that lost the race against a natural exit still counts
            // as a completed run.
            RunOutcome::Exited {
                duration,
                exit_code,
            } => {
                self.stats.count += 1;
                self.stats.last_duration_millis = duration_millis(duration);
                commands.push(CoreCommand::PublishCompletion {
                    stats: self.stats,
                    exit_code,
                });
            }
            RunOutcome::Killed => commands.push(CoreCommand::PublishCancelled {
                run_id,
                status: RunStatus::Killed,
            }),
            RunOutcome::SpawnFailed => commands.push(CoreCommand::PublishCancelled {
                run_id,
                status: RunStatus::FailedToStart,
            }),
        }

        self.state = SlotState::Idle;

        if self.shutting_down {
            return CoreStep {
                commands,
                keep_running: false,
            };
        }

        if self.pending {
            commands.push(self.start_run(at));
        }

        CoreStep::keep(commands)
    }

    fn on_shutdown(&mut self) -> CoreStep {
        self.shutting_down = true;
        self.pending = false;

        match self.state {
            SlotState::Idle => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
            SlotState::Running { run_id, .. } => {
                CoreStep::keep(vec![self.begin_kill(run_id, KillReason::Shutdown)])
            }
            SlotState::Killing { run_id, .. } => {
                self.state = SlotState::Killing {
                    run_id,
                    reason: KillReason::Shutdown,
                };
                CoreStep::keep(Vec::new())
            }
        }
    }

    fn start_run(&mut self, at: Instant) -> CoreCommand {
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        self.pending = false;
        self.last_run_started_at = Some(at);
        self.state = SlotState::Running {
            run_id,
            started_at: at,
        };
        debug!(run_id, "starting run");
        CoreCommand::StartRun(run_id)
    }

    fn begin_kill(&mut self, run_id: RunId, reason: KillReason) -> CoreCommand {
        self.state = SlotState::Killing { run_id, reason };
        CoreCommand::KillRun { run_id, reason }
    }

    /// `now - lastRunStartedAt > stale_after`.
    fn is_stale(&self, now: Instant) -> bool {
        self.last_run_started_at
            .map(|started| now.saturating_duration_since(started) > self.stale_after)
            .unwrap_or(false)
    }
}

impl Default for SchedulerCore {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
