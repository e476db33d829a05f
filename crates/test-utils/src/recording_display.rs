use std::sync::{Arc, Mutex, MutexGuard};

use replit::display::{DisplaySink, RunStatus};
use replit::types::OutputStream;

/// One call made against a [`RecordingDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    Clear,
    Write(OutputStream, Vec<u8>),
    RunCount(u64),
    RunDuration(u64),
    Status(RunStatus),
    Refresh,
}

/// A display sink that records every call, for assertions in tests.
///
/// Cloning shares the underlying log.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    calls: Arc<Mutex<Vec<DisplayCall>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<DisplayCall>> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn calls(&self) -> Vec<DisplayCall> {
        self.log().clone()
    }

    /// Everything written to `stream` since the last `clear`.
    pub fn output_since_clear(&self, stream: OutputStream) -> String {
        let calls = self.log();
        let start = calls
            .iter()
            .rposition(|c| *c == DisplayCall::Clear)
            .map(|i| i + 1)
            .unwrap_or(0);
        let bytes: Vec<u8> = calls[start..]
            .iter()
            .filter_map(|c| match c {
                DisplayCall::Write(s, b) if *s == stream => Some(b.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear_count(&self) -> usize {
        self.log().iter().filter(|c| **c == DisplayCall::Clear).count()
    }

    pub fn statuses(&self) -> Vec<RunStatus> {
        self.log()
            .iter()
            .filter_map(|c| match c {
                DisplayCall::Status(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<RunStatus> {
        self.statuses().last().copied()
    }

    pub fn last_run_count(&self) -> Option<u64> {
        self.log().iter().rev().find_map(|c| match c {
            DisplayCall::RunCount(n) => Some(*n),
            _ => None,
        })
    }

    pub fn last_run_duration(&self) -> Option<u64> {
        self.log().iter().rev().find_map(|c| match c {
            DisplayCall::RunDuration(n) => Some(*n),
            _ => None,
        })
    }
}

impl DisplaySink for RecordingDisplay {
    fn clear(&self) {
        self.log().push(DisplayCall::Clear);
    }

    fn write(&self, stream: OutputStream, bytes: &[u8]) {
        self.log().push(DisplayCall::Write(stream, bytes.to_vec()));
    }

    fn set_run_count(&self, count: u64) {
        self.log().push(DisplayCall::RunCount(count));
    }

    fn set_run_duration(&self, millis: u64) {
        self.log().push(DisplayCall::RunDuration(millis));
    }

    fn set_status(&self, status: RunStatus) {
        self.log().push(DisplayCall::Status(status));
    }

    fn refresh(&self) {
        self.log().push(DisplayCall::Refresh);
    }
}
