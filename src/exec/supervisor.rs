// src/exec/supervisor.rs

//! Interpreter process supervision.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::display::DisplaySink;
use crate::exec::kill::{isolate_process_group, terminate};
use crate::types::OutputStream;

/// How long output pumps may keep draining after the interpreter exited
/// (a forked grandchild can hold the pipes open indefinitely).
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

const PUMP_BUFFER_SIZE: usize = 8192;

/// Result of an interpreter run that exited on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Spawns the interpreter against a target file.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    interpreter: PathBuf,
    kill_grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(interpreter: impl Into<PathBuf>, kill_grace: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            kill_grace,
        }
    }

    /// Start `<interpreter> <target>` with both output streams pumped into
    /// `sink` as raw byte chunks.
    ///
    /// The pumps run as separate Tokio tasks; the sink is responsible for
    /// synchronizing its own writes.
    pub fn spawn(&self, target: &Path, sink: Arc<dyn DisplaySink>) -> Result<SupervisedProcess> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut cmd);

        let started_at = Instant::now();
        let mut child = cmd.spawn().with_context(|| {
            format!(
                "spawning {} {}",
                self.interpreter.display(),
                target.display()
            )
        })?;

        let pid = child.id();
        info!(
            pid,
            interpreter = %self.interpreter.display(),
            target = %target.display(),
            "interpreter process started"
        );

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(spawn_pump(stdout, OutputStream::Stdout, Arc::clone(&sink)));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(spawn_pump(stderr, OutputStream::Stderr, sink));
        }

        Ok(SupervisedProcess {
            child,
            pid,
            started_at,
            pumps,
            kill_grace: self.kill_grace,
            finished: None,
        })
    }
}

/// A running (or finished) interpreter process.
///
/// Owned by exactly one run; dropping it kills the process.
#[derive(Debug)]
pub struct SupervisedProcess {
    child: Child,
    pid: Option<u32>,
    started_at: Instant,
    pumps: Vec<JoinHandle<()>>,
    kill_grace: Duration,
    finished: Option<RunReport>,
}

impl SupervisedProcess {
    /// Block until the process exits and its output has been drained.
    ///
    /// Cancel-safe: dropping the future before completion leaves the process
    /// running and `wait`/`kill` usable.
    pub async fn wait(&mut self) -> Result<RunReport> {
        if let Some(report) = self.finished {
            return Ok(report);
        }

        let status = self
            .child
            .wait()
            .await
            .with_context(|| format!("waiting for interpreter process {:?}", self.pid))?;
        let duration = self.started_at.elapsed();

        self.drain_output().await;

        let report = RunReport {
            duration,
            exit_code: status.code(),
        };
        self.finished = Some(report);

        info!(
            pid = self.pid,
            exit_code = ?report.exit_code,
            elapsed_ms = duration.as_millis() as u64,
            "interpreter process exited"
        );
        Ok(report)
    }

    /// Terminate the process. Idempotent: a no-op once it has exited.
    pub async fn kill(&mut self) {
        if self.finished.is_some() {
            debug!(pid = self.pid, "kill requested for finished process; ignoring");
            return;
        }

        info!(pid = self.pid, "killing interpreter process");
        terminate(&mut self.child, self.kill_grace).await;

        for pump in self.pumps.drain(..) {
            pump.abort();
        }
    }

    async fn drain_output(&mut self) {
        for mut pump in self.pumps.drain(..) {
            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut pump).await.is_err() {
                warn!(pid = self.pid, "output still open after exit; detaching pump");
                pump.abort();
            }
        }
    }
}

fn spawn_pump<R>(mut reader: R, stream: OutputStream, sink: Arc<dyn DisplaySink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; PUMP_BUFFER_SIZE];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => sink.write(stream, &buf[..n]),
                Err(e) => {
                    debug!(%stream, error = %e, "output pump read failed");
                    break;
                }
            }
        }
    })
}
