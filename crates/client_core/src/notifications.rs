use std::{sync::Arc, time::Duration};

use shared::domain::RankUpgrade;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};

/// How long a toast stays visible. A newer toast restarts the window.
pub const TOAST_WINDOW: Duration = Duration::from_millis(2000);
/// Delay between the upgrade entrance and the celebratory phase.
pub const UPGRADE_CELEBRATE_DELAY: Duration = Duration::from_millis(500);
/// Upgrade auto-dismiss deadline, measured from entrance.
pub const UPGRADE_AUTO_DISMISS: Duration = Duration::from_millis(5000);
/// Exit transition run by every dismissal, timed or user-initiated.
pub const UPGRADE_EXIT_TRANSITION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradePhase {
    Entering,
    Celebrating,
    Exiting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeDisplay {
    pub event: RankUpgrade,
    pub phase: UpgradePhase,
}

#[derive(Debug, Clone)]
pub enum NotificationEvent {
    ToastShown(String),
    ToastCleared,
    UpgradeShown(RankUpgrade),
    UpgradePhaseChanged(UpgradePhase),
    UpgradeCleared,
}

struct SequencerState {
    toast: Option<String>,
    toast_epoch: u64,
    toast_timer: Option<JoinHandle<()>>,
    upgrade: Option<UpgradeDisplay>,
    upgrade_epoch: u64,
    celebrate_timer: Option<JoinHandle<()>>,
    auto_dismiss_timer: Option<JoinHandle<()>>,
    exit_timer: Option<JoinHandle<()>>,
    pending_upgrade: Option<RankUpgrade>,
}

/// Two independent transient-feedback channels: a last-write-wins toast and a
/// phased upgrade celebration. All timers are single-shot and cancellable;
/// every timer callback re-checks its channel epoch under the state lock, so a
/// superseded timer can never clear state it no longer owns.
pub struct NotificationSequencer {
    inner: Mutex<SequencerState>,
    events: broadcast::Sender<NotificationEvent>,
}

impl NotificationSequencer {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            inner: Mutex::new(SequencerState {
                toast: None,
                toast_epoch: 0,
                toast_timer: None,
                upgrade: None,
                upgrade_epoch: 0,
                celebrate_timer: None,
                auto_dismiss_timer: None,
                exit_timer: None,
                pending_upgrade: None,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    pub async fn toast(&self) -> Option<String> {
        self.inner.lock().await.toast.clone()
    }

    pub async fn upgrade(&self) -> Option<UpgradeDisplay> {
        self.inner.lock().await.upgrade.clone()
    }

    /// Displays `message`, replacing any toast already visible and restarting
    /// the auto-clear window from now.
    pub async fn show_toast(self: &Arc<Self>, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.inner.lock().await;
        state.toast_epoch += 1;
        let epoch = state.toast_epoch;
        if let Some(timer) = state.toast_timer.take() {
            timer.abort();
        }
        state.toast = Some(message.clone());
        let _ = self.events.send(NotificationEvent::ToastShown(message));

        let sequencer = Arc::clone(self);
        // Capture the deadline now, not at the spawned task's first poll.
        let window = tokio::time::sleep(TOAST_WINDOW);
        state.toast_timer = Some(tokio::spawn(async move {
            window.await;
            let mut state = sequencer.inner.lock().await;
            if state.toast_epoch != epoch {
                return;
            }
            state.toast = None;
            state.toast_timer = None;
            let _ = sequencer.events.send(NotificationEvent::ToastCleared);
        }));
    }

    /// Accepts one upgrade event. If another event is mid-display the newest
    /// arrival is parked in a single pending slot and starts its own full
    /// sequence once the current one finishes its exit transition.
    pub async fn show_upgrade(self: &Arc<Self>, event: RankUpgrade) {
        let mut state = self.inner.lock().await;
        if state.upgrade.is_some() {
            state.pending_upgrade = Some(event);
            return;
        }
        Self::begin_upgrade(self, &mut state, event);
    }

    /// User-initiated dismissal. Runs the same exit transition as the timed
    /// path; a no-op when nothing is displayed or an exit is already running.
    pub async fn dismiss_upgrade(self: &Arc<Self>) {
        let mut state = self.inner.lock().await;
        let epoch = state.upgrade_epoch;
        Self::begin_exit(self, &mut state, epoch);
    }

    fn begin_upgrade(sequencer: &Arc<Self>, state: &mut SequencerState, event: RankUpgrade) {
        state.upgrade_epoch += 1;
        let epoch = state.upgrade_epoch;
        state.upgrade = Some(UpgradeDisplay {
            event: event.clone(),
            phase: UpgradePhase::Entering,
        });
        let _ = sequencer.events.send(NotificationEvent::UpgradeShown(event));

        let this = Arc::clone(sequencer);
        let delay = tokio::time::sleep(UPGRADE_CELEBRATE_DELAY);
        state.celebrate_timer = Some(tokio::spawn(async move {
            delay.await;
            let mut state = this.inner.lock().await;
            if state.upgrade_epoch != epoch {
                return;
            }
            if let Some(display) = state.upgrade.as_mut() {
                if display.phase == UpgradePhase::Entering {
                    display.phase = UpgradePhase::Celebrating;
                    let _ = this
                        .events
                        .send(NotificationEvent::UpgradePhaseChanged(UpgradePhase::Celebrating));
                }
            }
        }));

        let this = Arc::clone(sequencer);
        let deadline = tokio::time::sleep(UPGRADE_AUTO_DISMISS);
        state.auto_dismiss_timer = Some(tokio::spawn(async move {
            deadline.await;
            let mut state = this.inner.lock().await;
            if state.upgrade_epoch != epoch {
                return;
            }
            Self::begin_exit(&this, &mut state, epoch);
        }));
    }

    fn begin_exit(sequencer: &Arc<Self>, state: &mut SequencerState, epoch: u64) {
        if state.upgrade_epoch != epoch {
            return;
        }
        let Some(display) = state.upgrade.as_mut() else {
            return;
        };
        if display.phase == UpgradePhase::Exiting {
            return;
        }
        display.phase = UpgradePhase::Exiting;
        if let Some(timer) = state.celebrate_timer.take() {
            timer.abort();
        }
        if let Some(timer) = state.auto_dismiss_timer.take() {
            timer.abort();
        }
        let _ = sequencer
            .events
            .send(NotificationEvent::UpgradePhaseChanged(UpgradePhase::Exiting));

        let this = Arc::clone(sequencer);
        let transition = tokio::time::sleep(UPGRADE_EXIT_TRANSITION);
        state.exit_timer = Some(tokio::spawn(async move {
            transition.await;
            let mut state = this.inner.lock().await;
            if state.upgrade_epoch != epoch {
                return;
            }
            state.upgrade = None;
            state.exit_timer = None;
            let _ = this.events.send(NotificationEvent::UpgradeCleared);
            if let Some(next) = state.pending_upgrade.take() {
                Self::begin_upgrade(&this, &mut state, next);
            }
        }));
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;
