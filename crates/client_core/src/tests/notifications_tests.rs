use std::time::Duration;

use shared::domain::{RankSnapshot, RankTier, RankUpgrade};

use super::*;

fn upgrade(from: RankTier, to: RankTier) -> RankUpgrade {
    RankUpgrade {
        upgraded: true,
        from_rank: from,
        to_rank: to,
        rank_info: RankSnapshot {
            current: to,
            display_name: format!("{to:?}"),
            total_completed: 10,
        },
    }
}

/// Let spawned timer tasks observe the paused-clock advance.
async fn drain() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    drain().await;
}

#[tokio::test(start_paused = true)]
async fn toast_auto_clears_after_window() {
    let seq = NotificationSequencer::new();
    seq.show_toast("Task added!").await;
    assert_eq!(seq.toast().await.as_deref(), Some("Task added!"));

    advance(1999).await;
    assert_eq!(seq.toast().await.as_deref(), Some("Task added!"));
    advance(1).await;
    assert_eq!(seq.toast().await, None);
}

#[tokio::test(start_paused = true)]
async fn newer_toast_replaces_and_restarts_the_window() {
    let seq = NotificationSequencer::new();
    seq.show_toast("first").await;
    advance(1000).await;
    seq.show_toast("second").await;

    // The first toast's timer would have fired here; it must not clear the
    // replacement.
    advance(1500).await;
    assert_eq!(seq.toast().await.as_deref(), Some("second"));

    advance(500).await;
    assert_eq!(seq.toast().await, None);
}

#[tokio::test(start_paused = true)]
async fn upgrade_walks_entrance_celebrate_and_timed_exit() {
    let seq = NotificationSequencer::new();
    seq.show_upgrade(upgrade(RankTier::Iron, RankTier::Silver))
        .await;
    let display = seq.upgrade().await.expect("displayed");
    assert_eq!(display.phase, UpgradePhase::Entering);

    advance(500).await;
    let display = seq.upgrade().await.expect("displayed");
    assert_eq!(display.phase, UpgradePhase::Celebrating);

    advance(4500).await;
    let display = seq.upgrade().await.expect("displayed");
    assert_eq!(display.phase, UpgradePhase::Exiting);

    advance(300).await;
    assert_eq!(seq.upgrade().await, None);
}

#[tokio::test(start_paused = true)]
async fn user_dismissal_still_runs_the_exit_transition() {
    let seq = NotificationSequencer::new();
    seq.show_upgrade(upgrade(RankTier::Iron, RankTier::Silver))
        .await;
    advance(700).await;

    seq.dismiss_upgrade().await;
    let display = seq.upgrade().await.expect("displayed");
    assert_eq!(display.phase, UpgradePhase::Exiting);

    advance(299).await;
    assert!(seq.upgrade().await.is_some());
    advance(1).await;
    assert_eq!(seq.upgrade().await, None);

    // The aborted auto-dismiss timer must not resurface anything later.
    advance(10_000).await;
    assert_eq!(seq.upgrade().await, None);
}

#[tokio::test(start_paused = true)]
async fn second_upgrade_waits_for_the_first_exit_to_finish() {
    let seq = NotificationSequencer::new();
    seq.show_upgrade(upgrade(RankTier::Iron, RankTier::Silver))
        .await;
    advance(600).await;
    seq.show_upgrade(upgrade(RankTier::Silver, RankTier::Gold))
        .await;

    // Still the first event, mid-celebration.
    let display = seq.upgrade().await.expect("displayed");
    assert_eq!(display.event.to_rank, RankTier::Silver);

    seq.dismiss_upgrade().await;
    advance(300).await;

    let display = seq.upgrade().await.expect("queued event started");
    assert_eq!(display.event.to_rank, RankTier::Gold);
    assert_eq!(display.phase, UpgradePhase::Entering);

    advance(500).await;
    let display = seq.upgrade().await.expect("displayed");
    assert_eq!(display.phase, UpgradePhase::Celebrating);
}

#[tokio::test(start_paused = true)]
async fn dismiss_without_a_display_is_a_noop() {
    let seq = NotificationSequencer::new();
    seq.dismiss_upgrade().await;
    assert_eq!(seq.upgrade().await, None);

    advance(10_000).await;
    assert_eq!(seq.upgrade().await, None);
}
