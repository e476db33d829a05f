// src/watch/notifier.rs

//! Single-slot change channel between the watch loop and the scheduler.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::types::ChangeOrigin;

/// "The watched set changed since the last signal." No payload beyond origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub origin: ChangeOrigin,
}

/// Producer side of the change channel.
///
/// At most one event is ever buffered; further events while one is pending
/// are coalesced into it.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<ChangeEvent>,
}

/// Create the size-1 change channel.
pub fn change_channel() -> (ChangeNotifier, mpsc::Receiver<ChangeEvent>) {
    let (tx, rx) = mpsc::channel(1);
    (ChangeNotifier { tx }, rx)
}

impl ChangeNotifier {
    /// Signal a change without blocking.
    ///
    /// Returns `false` once the receiving side is gone.
    pub fn notify(&self, origin: ChangeOrigin) -> bool {
        match self.tx.try_send(ChangeEvent { origin }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(?origin, "change already pending; coalesced");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
