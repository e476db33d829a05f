// src/watch/change_source.rs

//! Restartable "block until something changed" operation.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::exec::kill::{isolate_process_group, kill_group};
use crate::fs::FileSystem;
use crate::watch::listing::WatchSet;
use crate::watch::path_utils::join_paths_for_stdin;

/// How long the stderr of an exited watch utility may keep draining. A
/// background process it started can hold the pipe open indefinitely.
pub const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// A non-zero exit sooner than this after launch is a failure of the watch
/// utility (bad flags, missing file, ...) rather than an observed change.
pub const QUICK_FAILURE_WINDOW: Duration = Duration::from_millis(500);

/// Trait abstracting how file changes are detected.
///
/// Each call suspends until the watched set changes once, then resolves.
/// Callers re-invoke it to re-arm. Dropping the returned future cancels the
/// wait (and whatever external process backs it).
///
/// Production code uses [`CommandChangeSource`]; tests can provide their own
/// implementation that is driven by a channel.
pub trait ChangeSource: Send {
    fn wait_for_change(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Change source backed by an external blocking watch utility (`entr` by
/// default), spawned once per cycle with the watched paths on stdin.
#[derive(Debug)]
pub struct CommandChangeSource {
    program: PathBuf,
    args: Vec<String>,
    set: WatchSet,
    fs: Arc<dyn FileSystem>,
    cycles: u64,
}

impl CommandChangeSource {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, set: WatchSet, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            program: program.into(),
            args,
            set,
            fs,
            cycles: 0,
        }
    }

    async fn run_cycle(&mut self) -> Result<()> {
        self.cycles += 1;
        let cycle = self.cycles;

        let paths = self.set.paths(self.fs.as_ref())?;
        let input = join_paths_for_stdin(&paths);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let started = Instant::now();
        let mut child = cmd
            .spawn()
            .with_context(|| format!("launching watch utility {}", self.program.display()))?;
        // Dropped on every exit path, including cancellation of this future.
        let _group = GroupKillGuard { pid: child.id() };

        debug!(
            cycle,
            pid = child.id(),
            watched = paths.len(),
            "watch utility armed"
        );

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .context("writing watched paths to watch utility")?;
            // Closing stdin marks the end of the path list.
            drop(stdin);
        }

        let stderr = child.stderr.take();
        let mut reader = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(mut err) = stderr {
                let _ = err.read_to_string(&mut text).await;
            }
            text
        });

        let status = child.wait().await.context("waiting for watch utility")?;
        let elapsed = started.elapsed();
        let stderr_text = match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, &mut reader).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                debug!(cycle, error = %e, "stderr reader task failed");
                String::new()
            }
            Err(_) => {
                warn!(cycle, "watch utility stderr still open after exit; detaching");
                reader.abort();
                String::new()
            }
        };

        match status.code() {
            Some(0) => {
                info!(cycle, elapsed_ms = elapsed.as_millis() as u64, "change detected");
                Ok(())
            }
            None => bail!("watch utility terminated by a signal"),
            Some(code) if elapsed < QUICK_FAILURE_WINDOW => bail!(
                "watch utility exited with status {code} after {}ms: {}",
                elapsed.as_millis(),
                stderr_text.trim()
            ),
            Some(code) => {
                // e.g. entr giving up on a file replaced by an atomic save.
                debug!(cycle, code, "watch utility exited non-zero after watching; treating as change");
                Ok(())
            }
        }
    }
}

/// Kills the whole process group of one watch cycle when dropped, so
/// nothing the utility started outlives the cycle. The leader itself is
/// killed and reaped through `kill_on_drop`.
struct GroupKillGuard {
    pid: Option<u32>,
}

impl Drop for GroupKillGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.pid {
            kill_group(pid);
        }
    }
}

impl ChangeSource for CommandChangeSource {
    fn wait_for_change(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.run_cycle())
    }
}
