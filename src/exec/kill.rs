// src/exec/kill.rs

//! Advisory-then-forceful termination of child processes.
//!
//! Every child replit spawns (interpreter, watch utility, editor) is placed
//! in its own process group, so signals reach whatever the child forked too
//! (e.g. a `sleep` started by a shell script).

use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Put the command's child into a fresh process group (unix only).
pub fn isolate_process_group(cmd: &mut Command) {
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }
    #[cfg(not(unix))]
    {
        let _ = cmd;
    }
}

/// Terminate `child`: SIGTERM its process group, wait up to `grace`, then
/// SIGKILL. Returns once the child has been reaped.
///
/// Calling this on a child that already exited is a no-op and never errors.
pub async fn terminate(child: &mut Child, grace: Duration) {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(?status, "process already exited; nothing to kill");
            return;
        }
        Ok(None) => {}
        Err(e) => {
            debug!(error = %e, "try_wait failed before kill; killing anyway");
        }
    }

    let pid = child.id();

    #[cfg(unix)]
    {
        if let (Some(pid), false) = (pid, grace.is_zero()) {
            signal_group(pid, nix::sys::signal::Signal::SIGTERM);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(pid, ?status, "process exited after SIGTERM");
                    signal_group(pid, nix::sys::signal::Signal::SIGKILL);
                    return;
                }
                Ok(Err(e)) => {
                    debug!(pid, error = %e, "waiting after SIGTERM failed");
                }
                Err(_) => {
                    debug!(pid, grace_ms = grace.as_millis() as u64, "grace period elapsed; sending SIGKILL");
                }
            }
        }
    }

    if let Err(e) = child.kill().await {
        // Raced with a natural exit; the child is reaped either way.
        debug!(pid, error = %e, "kill failed; process likely already exited");
    }

    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            signal_group(pid, nix::sys::signal::Signal::SIGKILL);
        }
    }
}

/// SIGKILL every member of the process group led by `pid` without waiting.
///
/// Synchronous so it can run from `Drop`; the group leader itself is reaped
/// by whoever owns its `Child`.
pub fn kill_group(pid: u32) {
    #[cfg(unix)]
    signal_group(pid, nix::sys::signal::Signal::SIGKILL);
    #[cfg(not(unix))]
    let _ = pid;
}

/// Signal every member of the process group led by `pid`.
///
/// `ESRCH` (group already gone) is expected and ignored.
#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid, "pid out of range; cannot signal process group");
        return;
    };

    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!(pid, ?signal, error = %e, "failed to signal process group"),
    }
}
