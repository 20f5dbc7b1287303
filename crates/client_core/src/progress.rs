use std::{sync::Arc, time::Duration};

use shared::{
    domain::{ProgressSnapshot, RankSnapshot},
    error::ClientError,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{info, warn};

use crate::TaskBackend;

/// Completion counts settle server-side shortly after an upgrade, so the
/// follow-up fetch waits this long before reading back.
pub const DELAYED_REFRESH_AFTER_UPGRADE: Duration = Duration::from_millis(1000);

struct TrackerState {
    rank: Option<RankSnapshot>,
    progress: Option<ProgressSnapshot>,
    epoch: u64,
    delayed: Option<JoinHandle<()>>,
}

/// Read-through cache for the rank and progress pair. The two snapshots are
/// only ever replaced together from a single backend response; a refresh that
/// raced past a `clear` finds a bumped epoch and discards its result.
pub struct ProgressTracker {
    backend: Arc<dyn TaskBackend>,
    inner: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new(backend: Arc<dyn TaskBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            inner: Mutex::new(TrackerState {
                rank: None,
                progress: None,
                epoch: 0,
                delayed: None,
            }),
        })
    }

    pub async fn snapshots(&self) -> (Option<RankSnapshot>, Option<ProgressSnapshot>) {
        let state = self.inner.lock().await;
        (state.rank.clone(), state.progress.clone())
    }

    /// Fetches the current rank and progress and swaps both in atomically.
    /// Stale on-failure state is left as-is; the caller decides whether a
    /// fetch error is worth surfacing.
    pub async fn refresh(&self, token: &str) -> Result<(), ClientError> {
        let epoch = self.inner.lock().await.epoch;
        let outcome = self.backend.rank_info(token).await?;
        let mut state = self.inner.lock().await;
        if state.epoch != epoch {
            return Ok(());
        }
        state.rank = Some(outcome.rank);
        state.progress = Some(outcome.progress);
        Ok(())
    }

    /// Schedules one refresh after [`DELAYED_REFRESH_AFTER_UPGRADE`]. Repeat
    /// calls while a fetch is pending coalesce into that single fetch.
    pub async fn schedule_delayed_refresh(self: &Arc<Self>, token: String) {
        let mut state = self.inner.lock().await;
        if let Some(handle) = &state.delayed {
            if !handle.is_finished() {
                return;
            }
        }
        let epoch = state.epoch;
        let tracker = Arc::clone(self);
        // Capture the deadline now, not at the spawned task's first poll.
        let delay = tokio::time::sleep(DELAYED_REFRESH_AFTER_UPGRADE);
        state.delayed = Some(tokio::spawn(async move {
            delay.await;
            if tracker.inner.lock().await.epoch != epoch {
                return;
            }
            info!("running delayed rank refresh");
            if let Err(err) = tracker.refresh(&token).await {
                warn!(error = %err, "delayed rank refresh failed");
            }
        }));
    }

    /// Drops both snapshots and invalidates any in-flight or scheduled
    /// refresh so a late response cannot repopulate the cache.
    pub async fn clear(&self) {
        let mut state = self.inner.lock().await;
        state.epoch += 1;
        if let Some(handle) = state.delayed.take() {
            handle.abort();
        }
        state.rank = None;
        state.progress = None;
    }
}

#[cfg(test)]
#[path = "tests/progress_tests.rs"]
mod tests;
