// src/shutdown.rs

//! Session teardown.
//!
//! [`ShutdownCoordinator::shutdown`] consumes the coordinator, so it can run
//! at most once per session. It cancels the shared token and then, in
//! parallel, winds down the four resources a session owns:
//!
//! - the watch loop (its watch-utility child is killed on drop),
//! - the run scheduler (which kills and reaps any in-flight run),
//! - the editor process,
//! - the temporary target file.
//!
//! Every step is bounded by `step_timeout` and no step waits on another.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::RunStatistics;
use crate::errors::Result;
use crate::exec::EditorProcess;
use crate::fs::FileSystem;

/// Upper bound for each individual shutdown step.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(3);

/// How a single shutdown step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step completed.
    Done,
    /// Nothing to do (resource was never created or is not ours to remove).
    Skipped,
    /// The step did not finish within the step timeout.
    TimedOut,
    Failed(String),
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Done | StepOutcome::Skipped)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Done => f.write_str("done"),
            StepOutcome::Skipped => f.write_str("skipped"),
            StepOutcome::TimedOut => f.write_str("timed out"),
            StepOutcome::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// What happened to each resource during shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub watcher: StepOutcome,
    pub scheduler: StepOutcome,
    pub editor: StepOutcome,
    pub target: StepOutcome,
    /// Final statistics, when the scheduler stopped cleanly.
    pub stats: Option<RunStatistics>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.watcher.is_ok() && self.scheduler.is_ok() && self.editor.is_ok() && self.target.is_ok()
    }
}

/// Owns everything that must be torn down when the session ends.
pub struct ShutdownCoordinator {
    cancel: CancellationToken,
    fs: Arc<dyn FileSystem>,
    watcher: Option<JoinHandle<anyhow::Result<()>>>,
    scheduler: Option<JoinHandle<Result<RunStatistics>>>,
    editor: Option<EditorProcess>,
    target: Option<(PathBuf, bool)>,
    step_timeout: Duration,
    kill_grace: Duration,
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("has_watcher", &self.watcher.is_some())
            .field("has_scheduler", &self.scheduler.is_some())
            .field("editor", &self.editor)
            .field("target", &self.target)
            .field("step_timeout", &self.step_timeout)
            .finish_non_exhaustive()
    }
}

impl ShutdownCoordinator {
    pub fn new(cancel: CancellationToken, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            cancel,
            fs,
            watcher: None,
            scheduler: None,
            editor: None,
            target: None,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            kill_grace: Duration::from_millis(500),
        }
    }

    pub fn with_watcher(mut self, handle: JoinHandle<anyhow::Result<()>>) -> Self {
        self.watcher = Some(handle);
        self
    }

    pub fn with_scheduler(mut self, handle: JoinHandle<Result<RunStatistics>>) -> Self {
        self.scheduler = Some(handle);
        self
    }

    pub fn with_editor(mut self, editor: EditorProcess) -> Self {
        self.editor = Some(editor);
        self
    }

    /// Register the target file. Only a temporary target is ever removed.
    pub fn with_target(mut self, path: impl Into<PathBuf>, is_temporary: bool) -> Self {
        self.target = Some((path.into(), is_temporary));
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Tear the session down and report what happened to each resource.
    pub async fn shutdown(self) -> ShutdownReport {
        info!("shutting down");
        self.cancel.cancel();

        let step_timeout = self.step_timeout;
        let kill_grace = self.kill_grace;
        let fs = self.fs;
        let target = self.target;

        let (watcher, (scheduler, stats), editor, target) = tokio::join!(
            join_watcher(self.watcher, step_timeout),
            join_scheduler(self.scheduler, step_timeout),
            stop_editor(self.editor, kill_grace, step_timeout),
            async move { remove_target(fs.as_ref(), target) },
        );

        let report = ShutdownReport {
            watcher,
            scheduler,
            editor,
            target,
            stats,
        };

        if report.is_clean() {
            info!(?report, "shutdown complete");
        } else {
            warn!(?report, "shutdown finished with problems");
        }
        report
    }
}

async fn join_watcher(
    handle: Option<JoinHandle<anyhow::Result<()>>>,
    step_timeout: Duration,
) -> StepOutcome {
    let Some(mut handle) = handle else {
        return StepOutcome::Skipped;
    };

    match tokio::time::timeout(step_timeout, &mut handle).await {
        Ok(Ok(Ok(()))) => StepOutcome::Done,
        // Already reported by whoever noticed the failure first.
        Ok(Ok(Err(err))) => {
            debug!(error = %format!("{err:#}"), "watch loop had failed");
            StepOutcome::Done
        }
        Ok(Err(join_err)) => StepOutcome::Failed(format!("watch loop task: {join_err}")),
        Err(_) => {
            warn!("watch loop did not stop in time; aborting it");
            handle.abort();
            StepOutcome::TimedOut
        }
    }
}

async fn join_scheduler(
    handle: Option<JoinHandle<Result<RunStatistics>>>,
    step_timeout: Duration,
) -> (StepOutcome, Option<RunStatistics>) {
    let Some(mut handle) = handle else {
        return (StepOutcome::Skipped, None);
    };

    match tokio::time::timeout(step_timeout, &mut handle).await {
        Ok(Ok(Ok(stats))) => (StepOutcome::Done, Some(stats)),
        Ok(Ok(Err(err))) => (StepOutcome::Failed(err.to_string()), None),
        Ok(Err(join_err)) => (
            StepOutcome::Failed(format!("scheduler task: {join_err}")),
            None,
        ),
        Err(_) => {
            // Aborting drops the in-flight process, which kills it.
            warn!("scheduler did not stop in time; aborting it");
            handle.abort();
            (StepOutcome::TimedOut, None)
        }
    }
}

async fn stop_editor(
    editor: Option<EditorProcess>,
    kill_grace: Duration,
    step_timeout: Duration,
) -> StepOutcome {
    let Some(mut editor) = editor else {
        return StepOutcome::Skipped;
    };

    match tokio::time::timeout(step_timeout, editor.terminate(kill_grace)).await {
        Ok(()) => StepOutcome::Done,
        Err(_) => {
            warn!(pid = editor.id(), "editor did not stop in time");
            StepOutcome::TimedOut
        }
    }
}

fn remove_target(fs: &dyn FileSystem, target: Option<(PathBuf, bool)>) -> StepOutcome {
    let Some((path, is_temporary)) = target else {
        return StepOutcome::Skipped;
    };
    if !is_temporary {
        debug!(path = %path.display(), "target is user-owned; leaving it in place");
        return StepOutcome::Skipped;
    }

    match fs.remove_file(&path) {
        Ok(()) => {
            info!(path = %path.display(), "temporary target removed");
            StepOutcome::Done
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "temporary target already gone");
            StepOutcome::Done
        }
        Err(e) => StepOutcome::Failed(format!("removing {}: {e}", path.display())),
    }
}
