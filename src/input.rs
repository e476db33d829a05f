// src/input.rs

//! Single-key commands read from the terminal in raw mode.
//!
//! | key             | action                     |
//! |-----------------|----------------------------|
//! | `k`             | kill the active run        |
//! | `r`             | rerun now                  |
//! | `q`, Esc, `^C`  | quit (same as SIGTERM)     |
//!
//! Raw mode swallows the terminal's own `^C` handling, so Ctrl-C is mapped
//! to quit here.

use std::io::{self, IsTerminal};
use std::sync::OnceLock;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::SchedulerHandle;

/// How often the blocking key reader checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand {
    Kill,
    Rerun,
    Quit,
}

/// Map one key event to a command. Key releases and unknown keys yield `None`.
pub fn parse_key(key: &KeyEvent) -> Option<InputCommand> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl => Some(InputCommand::Quit),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'k' => Some(InputCommand::Kill),
            'r' => Some(InputCommand::Rerun),
            'q' => Some(InputCommand::Quit),
            _ => None,
        },
        KeyCode::Esc => Some(InputCommand::Quit),
        _ => None,
    }
}

/// Keeps the terminal in raw mode until dropped.
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        install_panic_hook();
        terminal::enable_raw_mode()?;
        debug!("terminal raw mode enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        match terminal::disable_raw_mode() {
            Ok(()) => debug!("terminal raw mode disabled"),
            Err(e) => warn!(error = %e, "failed to restore terminal mode"),
        }
    }
}

/// Restore cooked mode before the panic message is printed.
fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = terminal::disable_raw_mode();
            previous(info);
        }));
    });
}

/// Live keyboard listener. Dropping it restores the terminal.
#[derive(Debug)]
pub struct KeyboardInput {
    dispatcher: JoinHandle<()>,
    _raw: RawModeGuard,
}

impl KeyboardInput {
    /// Wait for the dispatcher to notice cancellation, then leave raw mode.
    pub async fn stop(self) {
        if let Err(e) = self.dispatcher.await {
            warn!(error = %e, "keyboard dispatcher task failed");
        }
    }
}

/// Start reading keys if stdin is an interactive terminal.
///
/// Returns `None` (commands disabled) when stdin is not a terminal or raw
/// mode cannot be entered. The listener ends once `quit` is cancelled.
pub fn spawn_keyboard_listener(
    handle: SchedulerHandle,
    quit: CancellationToken,
) -> Option<KeyboardInput> {
    if !io::stdin().is_terminal() {
        debug!("stdin is not a terminal; keyboard commands disabled");
        return None;
    }

    let raw = match RawModeGuard::enable() {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "cannot enter raw mode; keyboard commands disabled");
            return None;
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let stop = quit.clone();
    tokio::task::spawn_blocking(move || read_keys(tx, stop));
    let dispatcher = tokio::spawn(run_input_loop(rx, handle, quit));

    Some(KeyboardInput {
        dispatcher,
        _raw: raw,
    })
}

/// Blocking key reader; polls so it can observe `stop`.
fn read_keys(tx: mpsc::UnboundedSender<InputCommand>, stop: CancellationToken) {
    while !stop.is_cancelled() {
        match event::poll(POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(error = %e, "polling terminal events failed; keyboard commands disabled");
                return;
            }
        }

        match event::read() {
            Ok(Event::Key(key)) => match parse_key(&key) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        return;
                    }
                }
                None => debug!(?key, "ignoring key"),
            },
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "reading terminal events failed; keyboard commands disabled");
                return;
            }
        }
    }
}

/// Dispatch commands until quit, end of input or cancellation.
///
/// `Quit` cancels `quit`, which the session treats like a termination signal.
pub async fn run_input_loop(
    mut commands: mpsc::UnboundedReceiver<InputCommand>,
    handle: SchedulerHandle,
    quit: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            _ = quit.cancelled() => return,
            command = commands.recv() => command,
        };

        match command {
            Some(InputCommand::Kill) => {
                info!("kill requested from keyboard");
                handle.kill();
            }
            Some(InputCommand::Rerun) => {
                info!("rerun requested from keyboard");
                handle.rerun();
            }
            Some(InputCommand::Quit) => {
                info!("quit requested from keyboard");
                quit.cancel();
                return;
            }
            None => {
                debug!("keyboard reader stopped");
                return;
            }
        }
    }
}
