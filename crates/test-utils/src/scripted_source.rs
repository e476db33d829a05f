use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use replit::watch::ChangeSource;

/// What the next `wait_for_change` call should report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedStep {
    Change,
    Fail(String),
}

/// A change source driven by the test through a channel.
///
/// Each `wait_for_change` waits for the next scripted step. Once the script
/// sender is dropped the source blocks forever, like an idle watcher.
#[derive(Debug)]
pub struct ScriptedChangeSource {
    steps: mpsc::UnboundedReceiver<ScriptedStep>,
    armed: Arc<AtomicUsize>,
}

impl ScriptedChangeSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<ScriptedStep>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                steps: rx,
                armed: Arc::new(AtomicUsize::new(0)),
            },
            tx,
        )
    }

    /// Counter of how many times the source has been (re-)armed.
    pub fn armed_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.armed)
    }
}

impl ChangeSource for ScriptedChangeSource {
    fn wait_for_change(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.armed.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            match self.steps.recv().await {
                Some(ScriptedStep::Change) => Ok(()),
                Some(ScriptedStep::Fail(msg)) => Err(anyhow!(msg)),
                None => std::future::pending().await,
            }
        })
    }
}
