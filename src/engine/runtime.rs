// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::display::{DisplaySink, RunStatus};
use crate::errors::Result;
use crate::exec::{ProcessSupervisor, SupervisedProcess};
use crate::types::{ChangeOrigin, OutputStream};
use crate::watch::ChangeEvent;

use super::core::SchedulerCore;
use super::{Control, CoreCommand, RunId, RunOutcome, RunStatistics, SchedulerEvent};

/// Bookkeeping for the run whose process the shell currently owns.
struct ActiveRun {
    run_id: RunId,
    kill: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

/// Drives the scheduler core in response to change, control and completion
/// events, and executes its commands against real processes.
///
/// This is a pure IO shell around `SchedulerCore`, which contains all the
/// scheduling semantics.
pub struct RunScheduler {
    core: SchedulerCore,
    supervisor: ProcessSupervisor,
    target: PathBuf,
    sink: Arc<dyn DisplaySink>,
    changes: mpsc::Receiver<ChangeEvent>,
    control: mpsc::UnboundedReceiver<Control>,
    ended_tx: mpsc::UnboundedSender<(RunId, RunOutcome)>,
    ended_rx: mpsc::UnboundedReceiver<(RunId, RunOutcome)>,
    stats_tx: watch::Sender<RunStatistics>,
    cancel: CancellationToken,
    active: Option<ActiveRun>,
}

impl fmt::Debug for RunScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunScheduler")
            .field("core", &self.core)
            .field("target", &self.target)
            .field("active", &self.active.as_ref().map(|a| a.run_id))
            .finish_non_exhaustive()
    }
}

/// Cheap, cloneable handle for talking to a running [`RunScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    control: mpsc::UnboundedSender<Control>,
    stats: watch::Receiver<RunStatistics>,
}

impl SchedulerHandle {
    /// Ask the scheduler to kill the active run. A no-op when idle.
    ///
    /// Returns `false` once the scheduler has stopped.
    pub fn kill(&self) -> bool {
        self.control.send(Control::Kill).is_ok()
    }

    /// Request a run now. Goes around the change channel, so it is never
    /// merged into a pending watcher change and always supersedes an active run.
    pub fn rerun(&self) -> bool {
        self.control.send(Control::Rerun).is_ok()
    }

    /// Latest published statistics.
    pub fn stats(&self) -> RunStatistics {
        *self.stats.borrow()
    }

    /// Wait until at least `count` runs have completed.
    ///
    /// Returns `None` if the scheduler stopped first.
    pub async fn wait_for_count(&self, count: u64) -> Option<RunStatistics> {
        let mut rx = self.stats.clone();
        let stats = rx.wait_for(|s| s.count >= count).await.ok().map(|s| *s);
        stats
    }
}

impl RunScheduler {
    pub fn new(
        core: SchedulerCore,
        supervisor: ProcessSupervisor,
        target: PathBuf,
        sink: Arc<dyn DisplaySink>,
        changes: mpsc::Receiver<ChangeEvent>,
        cancel: CancellationToken,
    ) -> (Self, SchedulerHandle) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats_rx) = watch::channel(core.stats());

        let scheduler = Self {
            core,
            supervisor,
            target,
            sink,
            changes,
            control: control_rx,
            ended_tx,
            ended_rx,
            stats_tx,
            cancel,
            active: None,
        };
        let handle = SchedulerHandle {
            control: control_tx,
            stats: stats_rx,
        };
        (scheduler, handle)
    }

    /// Main event loop.
    ///
    /// - Turns channel activity into `SchedulerEvent`s.
    /// - Feeds them into the core.
    /// - Executes the commands returned by the core.
    ///
    /// Returns the final statistics once the core asks to stop (after
    /// cancellation and the active run, if any, has been reaped).
    pub async fn run(mut self) -> Result<RunStatistics> {
        info!(target = %self.target.display(), "run scheduler started");

        let mut cancel_seen = false;
        let mut changes_open = true;
        let mut control_open = true;

        loop {
            let event = tokio::select! {
                biased;

                _ = self.cancel.cancelled(), if !cancel_seen => {
                    cancel_seen = true;
                    SchedulerEvent::ShutdownRequested
                }
                Some((run_id, outcome)) = self.ended_rx.recv() => {
                    self.reap(run_id).await;
                    SchedulerEvent::RunEnded { run_id, outcome, at: Instant::now() }
                }
                ctl = self.control.recv(), if control_open => match ctl {
                    Some(Control::Kill) => SchedulerEvent::KillRequested,
                    Some(Control::Rerun) => SchedulerEvent::ChangeDetected {
                        origin: ChangeOrigin::Manual,
                        at: Instant::now(),
                    },
                    None => {
                        control_open = false;
                        continue;
                    }
                },
                change = self.changes.recv(), if changes_open => match change {
                    Some(ChangeEvent { origin }) => SchedulerEvent::ChangeDetected {
                        origin,
                        at: Instant::now(),
                    },
                    None => {
                        debug!("change channel closed");
                        changes_open = false;
                        continue;
                    }
                },
            };

            debug!(?event, "scheduler received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                info!("core requested exit; stopping scheduler");
                break;
            }
        }

        if let Some(active) = self.active.take() {
            warn!(run_id = active.run_id, "scheduler stopping with an active run");
            drop(active.kill);
            let _ = active.handle.await;
        }

        let stats = self.core.stats();
        info!(count = stats.count, "run scheduler exiting");
        Ok(stats)
    }

    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::StartRun(run_id) => self.start_run(run_id),
            CoreCommand::KillRun { run_id, reason } => {
                info!(run_id, ?reason, "killing run");
                match self.active.as_mut() {
                    Some(active) if active.run_id == run_id => {
                        if let Some(kill) = active.kill.take() {
                            if kill.send(()).is_err() {
                                debug!(run_id, "run already finished before kill");
                            }
                        }
                    }
                    _ => debug!(run_id, "no process for run; nothing to kill"),
                }
            }
            CoreCommand::PublishCompletion { stats, exit_code } => {
                self.sink.set_run_count(stats.count);
                self.sink.set_run_duration(stats.last_duration_millis);
                self.sink.set_status(RunStatus::Exited(exit_code));
                self.sink.refresh();
                self.stats_tx.send_replace(stats);
            }
            CoreCommand::PublishCancelled { run_id, status } => {
                debug!(run_id, %status, "run ended without completing");
                self.sink.set_status(status);
                self.sink.refresh();
            }
        }
    }

    fn start_run(&mut self, run_id: RunId) {
        self.sink.clear();
        self.sink.set_status(RunStatus::Running);
        self.sink.refresh();

        match self.supervisor.spawn(&self.target, Arc::clone(&self.sink)) {
            Ok(process) => {
                let (kill_tx, kill_rx) = oneshot::channel();
                let handle = tokio::spawn(drive_run(
                    run_id,
                    process,
                    kill_rx,
                    self.ended_tx.clone(),
                ));
                self.active = Some(ActiveRun {
                    run_id,
                    kill: Some(kill_tx),
                    handle,
                });
            }
            Err(err) => {
                warn!(run_id, error = %format!("{err:#}"), "failed to start interpreter");
                self.sink
                    .write(OutputStream::Stderr, format!("replit: {err:#}\n").as_bytes());
                let _ = self.ended_tx.send((run_id, RunOutcome::SpawnFailed));
            }
        }
    }

    /// Join the task of a run that reported its end.
    async fn reap(&mut self, run_id: RunId) {
        if self.active.as_ref().map(|a| a.run_id) != Some(run_id) {
            return;
        }
        if let Some(active) = self.active.take() {
            if let Err(err) = active.handle.await {
                warn!(run_id, error = %err, "run task panicked");
            }
        }
    }
}

/// Owns one interpreter process until it exits or a kill arrives.
///
/// Dropping the kill sender without sending also kills the process.
async fn drive_run(
    run_id: RunId,
    mut process: SupervisedProcess,
    mut kill_rx: oneshot::Receiver<()>,
    ended: mpsc::UnboundedSender<(RunId, RunOutcome)>,
) {
    let outcome = tokio::select! {
        res = process.wait() => match res {
            Ok(report) => RunOutcome::Exited {
                duration: report.duration,
                exit_code: report.exit_code,
            },
            Err(err) => {
                warn!(run_id, error = %format!("{err:#}"), "lost track of interpreter process");
                process.kill().await;
                RunOutcome::Killed
            }
        },
        _ = &mut kill_rx => {
            process.kill().await;
            RunOutcome::Killed
        }
    };

    if ended.send((run_id, outcome)).is_err() {
        debug!(run_id, "scheduler gone before run end was reported");
    }
}
