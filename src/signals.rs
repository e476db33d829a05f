// src/signals.rs

//! Termination signal listener.
//!
//! On unix SIGINT, SIGTERM and SIGQUIT all end the session; on windows only
//! Ctrl-C is available. Handlers are registered by [`TerminationSignals::install`],
//! and a signal delivered between installation and the first `recv` is not lost.

use std::io;

use tracing::info;

#[derive(Debug)]
pub struct TerminationSignals {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigquit: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl TerminationSignals {
    /// Replace the default (process-killing) dispositions with handlers.
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    #[cfg(windows)]
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait for the next termination signal and return its name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        let name = tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigquit.recv() => "SIGQUIT",
        };
        info!(signal = name, "termination signal received");
        name
    }

    #[cfg(windows)]
    pub async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        info!(signal = "ctrl-c", "termination signal received");
        "ctrl-c"
    }
}
