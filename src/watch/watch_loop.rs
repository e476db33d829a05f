// src/watch/watch_loop.rs

use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::types::ChangeOrigin;
use crate::watch::change_source::ChangeSource;
use crate::watch::hash::ContentDigest;
use crate::watch::notifier::ChangeNotifier;

/// Retry behaviour when the watch utility fails.
#[derive(Debug, Clone, Copy)]
pub struct WatchPolicy {
    /// Consecutive failures tolerated; reaching it ends the loop with an error.
    pub max_failures: u32,
    pub retry_backoff: Duration,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Spawn the watch loop on the Tokio runtime. See [`run_watch_loop`].
pub fn spawn_watch_loop<C>(
    source: C,
    notifier: ChangeNotifier,
    digest: Option<ContentDigest>,
    policy: WatchPolicy,
    cancel: CancellationToken,
) -> JoinHandle<Result<()>>
where
    C: ChangeSource + 'static,
{
    tokio::spawn(run_watch_loop(source, notifier, digest, policy, cancel))
}

/// Wait for a change, signal it, re-arm; until cancelled.
///
/// - With a `digest`, changes that leave the watched contents identical are
///   swallowed.
/// - Watch failures are retried after `retry_backoff`; `max_failures` in a
///   row end the loop with `Err`, which callers treat as fatal.
/// - Returns `Ok(())` when cancelled or when the scheduler hung up.
pub async fn run_watch_loop<C>(
    mut source: C,
    notifier: ChangeNotifier,
    mut digest: Option<ContentDigest>,
    policy: WatchPolicy,
    cancel: CancellationToken,
) -> Result<()>
where
    C: ChangeSource,
{
    info!("watch loop started");
    let mut failures: u32 = 0;

    loop {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                info!("watch loop cancelled");
                return Ok(());
            }
            res = source.wait_for_change() => res,
        };

        match outcome {
            Ok(()) => {
                failures = 0;

                if let Some(digest) = digest.as_mut() {
                    if !digest.changed() {
                        debug!("watched contents unchanged; re-arming without a run");
                        continue;
                    }
                }

                if !notifier.notify(ChangeOrigin::Watcher) {
                    info!("scheduler is gone; stopping watch loop");
                    return Ok(());
                }
            }
            Err(err) => {
                failures += 1;
                warn!(
                    failures,
                    max_failures = policy.max_failures,
                    error = %format!("{err:#}"),
                    "watch cycle failed"
                );

                if failures >= policy.max_failures {
                    error!(failures, "watch utility keeps failing; giving up");
                    return Err(err.context(format!(
                        "watch utility failed {failures} times in a row"
                    )));
                }

                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("watch loop cancelled during backoff");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(policy.retry_backoff) => {}
                }
            }
        }
    }
}
