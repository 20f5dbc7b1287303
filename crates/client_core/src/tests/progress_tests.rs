use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{ProgressSnapshot, RankSnapshot, RankTier, Task, TodoId},
    error::ClientError,
    protocol::TaskPatch,
};
use tokio::sync::Notify;

use super::*;
use crate::{RankInfoOutcome, TaskBackend, TaskUpdateOutcome};

struct CountingBackend {
    rank_info_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl CountingBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            rank_info_calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            rank_info_calls: AtomicUsize::new(0),
            gate: Some(gate),
        })
    }

    fn calls(&self) -> usize {
        self.rank_info_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskBackend for CountingBackend {
    async fn list(&self, _token: &str) -> Result<Vec<Task>, ClientError> {
        Ok(Vec::new())
    }

    async fn create(&self, _token: &str, _text: &str) -> Result<Task, ClientError> {
        Err(ClientError::server("not used"))
    }

    async fn update(
        &self,
        _token: &str,
        _id: TodoId,
        _patch: TaskPatch,
    ) -> Result<TaskUpdateOutcome, ClientError> {
        Err(ClientError::server("not used"))
    }

    async fn delete(&self, _token: &str, _id: TodoId) -> Result<(), ClientError> {
        Err(ClientError::server("not used"))
    }

    async fn rank_info(&self, _token: &str) -> Result<RankInfoOutcome, ClientError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let call = self.rank_info_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RankInfoOutcome {
            rank: RankSnapshot {
                current: RankTier::Silver,
                display_name: "Silver".to_string(),
                total_completed: call as u64,
            },
            progress: ProgressSnapshot {
                current: 40,
                next_rank: Some(RankTier::Gold),
                tasks_to_next: 15,
                is_max_rank: false,
            },
        })
    }
}

async fn drain() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn refresh_replaces_both_snapshots_together() {
    let backend = CountingBackend::new();
    let tracker = ProgressTracker::new(backend.clone());
    assert_eq!(tracker.snapshots().await, (None, None));

    tracker.refresh("token").await.expect("refresh");
    let (rank, progress) = tracker.snapshots().await;
    assert_eq!(rank.expect("rank").current, RankTier::Silver);
    assert_eq!(progress.expect("progress").tasks_to_next, 15);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn delayed_refresh_fires_once_after_the_delay() {
    let backend = CountingBackend::new();
    let tracker = ProgressTracker::new(backend.clone());

    tracker.schedule_delayed_refresh("token".to_string()).await;
    tokio::time::advance(Duration::from_millis(999)).await;
    drain().await;
    assert_eq!(backend.calls(), 0);

    tokio::time::advance(Duration::from_millis(1)).await;
    drain().await;
    assert_eq!(backend.calls(), 1);
    assert!(tracker.snapshots().await.0.is_some());

    tokio::time::advance(Duration::from_secs(10)).await;
    drain().await;
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn repeat_scheduling_coalesces_into_one_fetch() {
    let backend = CountingBackend::new();
    let tracker = ProgressTracker::new(backend.clone());

    tracker.schedule_delayed_refresh("token".to_string()).await;
    tokio::time::advance(Duration::from_millis(400)).await;
    drain().await;
    tracker.schedule_delayed_refresh("token".to_string()).await;

    // One fetch at the original deadline, none at the would-be second one.
    tokio::time::advance(Duration::from_millis(600)).await;
    drain().await;
    assert_eq!(backend.calls(), 1);
    tokio::time::advance(Duration::from_millis(1000)).await;
    drain().await;
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn clear_cancels_a_pending_delayed_refresh() {
    let backend = CountingBackend::new();
    let tracker = ProgressTracker::new(backend.clone());

    tracker.schedule_delayed_refresh("token".to_string()).await;
    tokio::time::advance(Duration::from_millis(500)).await;
    drain().await;
    tracker.clear().await;

    tokio::time::advance(Duration::from_secs(5)).await;
    drain().await;
    assert_eq!(backend.calls(), 0);
    assert_eq!(tracker.snapshots().await, (None, None));
}

#[tokio::test]
async fn late_refresh_response_cannot_repopulate_after_clear() {
    let gate = Arc::new(Notify::new());
    let backend = CountingBackend::gated(gate.clone());
    let tracker = ProgressTracker::new(backend.clone());

    let pending = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.refresh("token").await })
    };
    drain().await;
    tracker.clear().await;

    gate.notify_one();
    pending.await.expect("join").expect("refresh");
    assert_eq!(backend.calls(), 1);
    assert_eq!(tracker.snapshots().await, (None, None));
}
