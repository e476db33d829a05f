// src/lib.rs

pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod input;
pub mod logging;
pub mod shutdown;
pub mod signals;
pub mod target;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{load_or_default, resolve_session, SessionConfig, SessionEnv};
use crate::display::{DisplaySink, TerminalDisplay};
use crate::engine::{RunScheduler, SchedulerCore};
use crate::exec::{launch_editor, EditorProcess, ProcessSupervisor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::shutdown::ShutdownCoordinator;
use crate::signals::TerminationSignals;
use crate::target::{resolve_target, TargetFile};
use crate::watch::{
    change_channel, spawn_watch_loop, CommandChangeSource, ContentDigest, WatchPolicy, WatchSet,
};

/// Exit status after a graceful shutdown.
pub const EXIT_OK: i32 = 0;
/// Exit status when the session ended because of a fatal error.
pub const EXIT_FAILURE: i32 = 1;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - target file resolution
/// - editor launch
/// - display, run scheduler and watch loop
/// - keyboard commands and termination signals
/// - shutdown
///
/// Configuration errors are returned before anything is spawned. Otherwise
/// the returned value is the process exit status.
pub async fn run(args: CliArgs) -> Result<i32> {
    let file_cfg = load_or_default(args.config.as_deref())?;
    let env = SessionEnv::from_process()?;
    let session = resolve_session(&args, file_cfg, &env)?;

    // Before anything is created on disk or spawned, so an early SIGINT
    // still goes through cleanup instead of killing the process outright.
    let mut signals = match TerminationSignals::install() {
        Ok(signals) => Some(signals),
        Err(e) => {
            warn!(error = %e, "cannot listen for termination signals");
            None
        }
    };

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let target = resolve_target(session.file.as_deref(), &session.language)?;

    let watch_set = match build_watch_set(fs.as_ref(), &session, &target) {
        Ok(set) => set,
        Err(err) => {
            // Nothing else exists yet; only the temporary file needs undoing.
            let (path, is_temporary) = target.into_parts();
            if is_temporary {
                if let Err(e) = fs.remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to remove temporary file");
                }
            }
            return Err(err);
        }
    };

    let editor = start_editor(&session, &target);

    let display = Arc::new(TerminalDisplay::new(target.path(), &session.language));
    display.start();
    let sink: Arc<dyn DisplaySink> = display;

    let cancel = CancellationToken::new();
    let (notifier, changes) = change_channel();

    let supervisor = ProcessSupervisor::new(&session.interpreter, session.run.kill_grace);
    let core = SchedulerCore::new(session.run.stale_after);
    let (scheduler, handle) = RunScheduler::new(
        core,
        supervisor,
        target.path().to_path_buf(),
        sink,
        changes,
        cancel.clone(),
    );
    let scheduler_task = tokio::spawn(scheduler.run());

    let digest = session
        .run
        .use_hash
        .then(|| ContentDigest::new(Arc::clone(&fs), watch_set.clone()));
    let source = CommandChangeSource::new(
        &session.watch.program,
        session.watch.args.clone(),
        watch_set,
        Arc::clone(&fs),
    );
    let policy = WatchPolicy {
        max_failures: session.watch.max_failures,
        retry_backoff: session.watch.retry_backoff,
    };
    let mut watcher_task = spawn_watch_loop(source, notifier, digest, policy, cancel.clone());

    let keyboard = input::spawn_keyboard_listener(handle, cancel.clone());

    info!(
        target = %target.path().display(),
        interpreter = %session.interpreter.display(),
        "session started"
    );

    let (target_path, is_temporary) = target.into_parts();
    let mut coordinator = ShutdownCoordinator::new(cancel.clone(), Arc::clone(&fs))
        .with_scheduler(scheduler_task)
        .with_target(target_path, is_temporary)
        .with_kill_grace(session.run.kill_grace);
    if let Some(editor) = editor {
        coordinator = coordinator.with_editor(editor);
    }

    let mut exit_code = EXIT_OK;
    let mut fatal = None;

    tokio::select! {
        _ = wait_for_signal(signals.as_mut()) => {
            coordinator = coordinator.with_watcher(watcher_task);
        }
        _ = cancel.cancelled() => {
            info!("quit requested");
            coordinator = coordinator.with_watcher(watcher_task);
        }
        res = &mut watcher_task => match res {
            Ok(Ok(())) => info!("watch loop stopped"),
            Ok(Err(err)) => {
                exit_code = EXIT_FAILURE;
                fatal = Some(err);
            }
            Err(join_err) => {
                exit_code = EXIT_FAILURE;
                fatal = Some(anyhow::anyhow!("watch loop task failed: {join_err}"));
            }
        },
    }

    let report = coordinator.shutdown().await;
    if let Some(keyboard) = keyboard {
        keyboard.stop().await;
    }
    if let Some(stats) = report.stats {
        info!(runs = stats.count, "session finished");
    }

    if let Some(err) = fatal {
        eprintln!("replit error: {err:#}");
    }

    Ok(exit_code)
}

fn build_watch_set(
    fs: &dyn FileSystem,
    session: &SessionConfig,
    target: &TargetFile,
) -> Result<WatchSet> {
    if target.is_temporary() {
        return Ok(WatchSet::file(target.path()));
    }

    WatchSet::directory(
        fs,
        &session.directory,
        target.path(),
        &session.watch.exclude,
        session.watch.scan,
    )
}

/// Launch the editor if one is configured. A launch failure is logged and
/// the session continues without it.
fn start_editor(session: &SessionConfig, target: &TargetFile) -> Option<EditorProcess> {
    let command = session.editor.as_ref()?;
    match launch_editor(command, target.path()) {
        Ok(editor) => Some(editor),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "failed to launch editor");
            None
        }
    }
}

/// Resolve on the first termination signal; never resolves without handlers.
async fn wait_for_signal(signals: Option<&mut TerminationSignals>) {
    match signals {
        Some(signals) => {
            signals.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}
