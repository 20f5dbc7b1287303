pub mod http;
pub mod notifications;
pub mod progress;
pub mod task_store;

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{ProgressSnapshot, RankSnapshot, RankUpgrade, Task, TodoId, UserId},
    error::ClientError,
    protocol::TaskPatch,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub use crate::{
    notifications::{NotificationEvent, NotificationSequencer, UpgradeDisplay, UpgradePhase},
    progress::ProgressTracker,
    task_store::{TaskListStore, TaskStats},
};

/// Which top-level screen the client is presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMode {
    Welcome,
    Login,
    Create,
    Dashboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub user_id: UserId,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub rank: Option<RankSnapshot>,
}

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct TaskUpdateOutcome {
    pub todo: Task,
    pub rank_upgrade: Option<RankUpgrade>,
}

#[derive(Debug, Clone)]
pub struct RankInfoOutcome {
    pub rank: RankSnapshot,
    pub progress: ProgressSnapshot,
}

/// Credential and session operations of the auth service.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ClientError>;
    async fn register(&self, username: &str, password: &str)
        -> Result<RegisterOutcome, ClientError>;
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, ClientError>;
}

/// Task CRUD plus the rank read of the todo service. All calls carry the
/// session token.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn list(&self, token: &str) -> Result<Vec<Task>, ClientError>;
    async fn create(&self, token: &str, text: &str) -> Result<Task, ClientError>;
    async fn update(
        &self,
        token: &str,
        id: TodoId,
        patch: TaskPatch,
    ) -> Result<TaskUpdateOutcome, ClientError>;
    async fn delete(&self, token: &str, id: TodoId) -> Result<(), ClientError>;
    async fn rank_info(&self, token: &str) -> Result<RankInfoOutcome, ClientError>;
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    ScreenChanged(ScreenMode),
    SessionEstablished(Session),
    SessionCleared,
    TasksChanged,
    RankChanged,
    Error(String),
}

/// In-progress edit of one task's text. Kept across a failed save so the user
/// does not lose their typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub todo_id: TodoId,
    pub text: String,
}

struct ClientState {
    screen: ScreenMode,
    session: Option<Session>,
    last_error: Option<ClientError>,
    editing: Option<EditDraft>,
}

/// Top-level client facade. Owns the screen state machine, the session, and
/// the three collaborating stores; everything user-visible flows through here.
pub struct TaskFlowClient {
    auth: Arc<dyn AuthBackend>,
    tasks: TaskListStore,
    progress: Arc<ProgressTracker>,
    notifications: Arc<NotificationSequencer>,
    inner: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl TaskFlowClient {
    pub fn new(auth: Arc<dyn AuthBackend>, task_backend: Arc<dyn TaskBackend>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            auth,
            tasks: TaskListStore::new(Arc::clone(&task_backend)),
            progress: ProgressTracker::new(task_backend),
            notifications: NotificationSequencer::new(),
            inner: Mutex::new(ClientState {
                screen: ScreenMode::Welcome,
                session: None,
                last_error: None,
                editing: None,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn notifications(&self) -> &Arc<NotificationSequencer> {
        &self.notifications
    }

    pub async fn screen(&self) -> ScreenMode {
        self.inner.lock().await.screen
    }

    pub async fn session(&self) -> Option<Session> {
        self.inner.lock().await.session.clone()
    }

    pub async fn last_error(&self) -> Option<ClientError> {
        self.inner.lock().await.last_error.clone()
    }

    pub async fn editing(&self) -> Option<EditDraft> {
        self.inner.lock().await.editing.clone()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.tasks.snapshot().await
    }

    pub async fn stats(&self) -> TaskStats {
        self.tasks.stats().await
    }

    pub async fn rank(&self) -> Option<RankSnapshot> {
        self.progress.snapshots().await.0
    }

    pub async fn progress_snapshot(&self) -> Option<ProgressSnapshot> {
        self.progress.snapshots().await.1
    }

    pub async fn clear_error(&self) {
        self.inner.lock().await.last_error = None;
    }

    // ---- navigation ----------------------------------------------------

    pub async fn show_login(&self) {
        self.transition(ScreenMode::Login).await;
    }

    pub async fn show_create(&self) {
        self.transition(ScreenMode::Create).await;
    }

    pub async fn back_to_welcome(&self) {
        self.transition(ScreenMode::Welcome).await;
    }

    /// Moves to `target` if the edge is part of the screen graph; anything
    /// else is logged and ignored rather than corrupting the state machine.
    async fn transition(&self, target: ScreenMode) {
        let mut state = self.inner.lock().await;
        let allowed = matches!(
            (state.screen, target),
            (ScreenMode::Welcome, ScreenMode::Login)
                | (ScreenMode::Welcome, ScreenMode::Create)
                | (ScreenMode::Login, ScreenMode::Welcome)
                | (ScreenMode::Login, ScreenMode::Dashboard)
                | (ScreenMode::Create, ScreenMode::Login)
                | (ScreenMode::Create, ScreenMode::Welcome)
                | (ScreenMode::Dashboard, ScreenMode::Welcome)
        );
        if !allowed {
            warn!(from = ?state.screen, to = ?target, "ignoring screen transition");
            return;
        }
        state.screen = target;
        let _ = self.events.send(ClientEvent::ScreenChanged(target));
    }

    // ---- session lifecycle ---------------------------------------------

    /// Authenticates and, on success, lands on the dashboard with the task
    /// list and rank already loaded. On failure the login screen and any
    /// previous session state are left untouched.
    pub async fn login(self: &Arc<Self>, username: &str, password: &str) -> Result<(), ClientError> {
        {
            let state = self.inner.lock().await;
            if state.screen != ScreenMode::Login {
                return Err(ClientError::validation("not on the login screen"));
            }
        }
        if username.trim().is_empty() || password.is_empty() {
            return self
                .fail(ClientError::validation("Please fill in all fields"))
                .await;
        }
        let outcome = match self.auth.login(username, password).await {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(err).await,
        };

        let session = Session {
            username: outcome.username,
            user_id: outcome.user_id,
            token: outcome.token,
        };
        let token = session.token.clone();
        {
            let mut state = self.inner.lock().await;
            state.session = Some(session.clone());
            state.last_error = None;
        }
        info!(user = %session.username, "signed in");
        let _ = self.events.send(ClientEvent::SessionEstablished(session));
        self.transition(ScreenMode::Dashboard).await;
        self.enter_dashboard(&token).await;
        self.notifications.show_toast("Welcome back!").await;
        Ok(())
    }

    /// Registers a new account and returns to the login screen. No session is
    /// created; the user signs in with the credentials they just chose.
    pub async fn create_account(
        self: &Arc<Self>,
        username: &str,
        password: &str,
    ) -> Result<(), ClientError> {
        {
            let state = self.inner.lock().await;
            if state.screen != ScreenMode::Create {
                return Err(ClientError::validation("not on the account creation screen"));
            }
        }
        if username.trim().is_empty() || password.is_empty() {
            return self
                .fail(ClientError::validation("Please fill in all fields"))
                .await;
        }
        let outcome = match self.auth.register(username, password).await {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(err).await,
        };
        info!(user = username, user_id = outcome.user_id.0, "account created");
        self.inner.lock().await.last_error = None;
        self.notifications
            .show_toast("Account created successfully!")
            .await;
        self.transition(ScreenMode::Login).await;
        Ok(())
    }

    /// Re-validates the stored token against the auth service.
    pub async fn verify_session(&self) -> Result<VerifyOutcome, ClientError> {
        let token = self.session_token().await?;
        self.auth.verify(&token).await
    }

    /// Tears everything down and returns to the welcome screen. Always
    /// succeeds, whatever state the client was in.
    pub async fn logout(&self) {
        {
            let mut state = self.inner.lock().await;
            state.session = None;
            state.editing = None;
            state.last_error = None;
        }
        self.tasks.clear().await;
        self.progress.clear().await;
        info!("signed out");
        let _ = self.events.send(ClientEvent::SessionCleared);
        self.transition(ScreenMode::Welcome).await;
    }

    /// Initial dashboard population. Fetch errors here are reported but do
    /// not undo the login; the dashboard simply starts empty.
    async fn enter_dashboard(&self, token: &str) {
        if let Err(err) = self.tasks.load(token).await {
            warn!(error = %err, "initial task load failed");
            let _ = self.events.send(ClientEvent::Error(err.message.clone()));
        } else {
            let _ = self.events.send(ClientEvent::TasksChanged);
        }
        if let Err(err) = self.progress.refresh(token).await {
            warn!(error = %err, "initial rank fetch failed");
            let _ = self.events.send(ClientEvent::Error(err.message.clone()));
        } else {
            let _ = self.events.send(ClientEvent::RankChanged);
        }
    }

    // ---- task operations -----------------------------------------------

    pub async fn add_task(self: &Arc<Self>, text: &str) -> Result<Task, ClientError> {
        let token = self.session_token().await?;
        match self.tasks.create(&token, text).await {
            Ok(task) => {
                self.inner.lock().await.last_error = None;
                let _ = self.events.send(ClientEvent::TasksChanged);
                self.notifications.show_toast("Task added!").await;
                Ok(task)
            }
            Err(err) => self.fail_with(err).await,
        }
    }

    /// Flips one task's completion. A completion may carry a rank upgrade,
    /// which starts the celebration sequence and schedules the delayed rank
    /// re-read on top of the immediate one.
    pub async fn toggle_task(self: &Arc<Self>, id: TodoId) -> Result<(), ClientError> {
        let token = self.session_token().await?;
        let current = match self.tasks.get(id).await {
            Some(task) => task,
            None => {
                return self
                    .fail(ClientError::not_found(format!("Task {} not found", id.0)))
                    .await
            }
        };
        let patch = TaskPatch::Completed {
            completed: !current.completed,
        };
        let outcome = match self.tasks.update(&token, id, patch).await {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(err).await,
        };
        self.inner.lock().await.last_error = None;
        let _ = self.events.send(ClientEvent::TasksChanged);

        match self.progress.refresh(&token).await {
            Ok(()) => {
                let _ = self.events.send(ClientEvent::RankChanged);
            }
            Err(err) => warn!(error = %err, "rank refresh failed"),
        }
        if let Some(upgrade) = outcome.rank_upgrade.filter(|u| u.upgraded) {
            info!(from = ?upgrade.from_rank, to = ?upgrade.to_rank, "rank upgrade");
            self.notifications.show_upgrade(upgrade).await;
            self.progress.schedule_delayed_refresh(token).await;
        }
        if outcome.todo.completed {
            self.notifications
                .show_toast("Great job! Task completed!")
                .await;
        }
        Ok(())
    }

    pub async fn start_edit(&self, id: TodoId) -> Result<(), ClientError> {
        let task = self
            .tasks
            .get(id)
            .await
            .ok_or_else(|| ClientError::not_found(format!("Task {} not found", id.0)))?;
        self.inner.lock().await.editing = Some(EditDraft {
            todo_id: id,
            text: task.task,
        });
        Ok(())
    }

    pub async fn set_edit_text(&self, text: &str) {
        if let Some(draft) = self.inner.lock().await.editing.as_mut() {
            draft.text = text.to_string();
        }
    }

    pub async fn cancel_edit(&self) {
        self.inner.lock().await.editing = None;
    }

    /// Commits the current draft. The draft survives a failed save so the
    /// user can correct and retry; completion status never gets a refresh
    /// here because text edits cannot change it.
    pub async fn save_edit(self: &Arc<Self>) -> Result<(), ClientError> {
        let token = self.session_token().await?;
        let draft = match self.inner.lock().await.editing.clone() {
            Some(draft) => draft,
            None => return Err(ClientError::validation("no edit in progress")),
        };
        let text = draft.text.trim().to_string();
        if text.is_empty() {
            return self
                .fail(ClientError::validation("Task text must not be empty"))
                .await;
        }
        let patch = TaskPatch::Text { task: text };
        match self.tasks.update(&token, draft.todo_id, patch).await {
            Ok(_) => {
                let mut state = self.inner.lock().await;
                state.editing = None;
                state.last_error = None;
                drop(state);
                let _ = self.events.send(ClientEvent::TasksChanged);
                self.notifications.show_toast("Task updated!").await;
                Ok(())
            }
            Err(err) => self.fail(err).await,
        }
    }

    pub async fn delete_task(self: &Arc<Self>, id: TodoId) -> Result<(), ClientError> {
        let token = self.session_token().await?;
        match self.tasks.delete(&token, id).await {
            Ok(()) => {
                self.inner.lock().await.last_error = None;
                let _ = self.events.send(ClientEvent::TasksChanged);
                self.notifications.show_toast("Task deleted!").await;
                match self.progress.refresh(&token).await {
                    Ok(()) => {
                        let _ = self.events.send(ClientEvent::RankChanged);
                    }
                    Err(err) => warn!(error = %err, "rank refresh failed"),
                }
                Ok(())
            }
            Err(err) => self.fail(err).await,
        }
    }

    // ---- helpers --------------------------------------------------------

    async fn session_token(&self) -> Result<String, ClientError> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|session| session.token.clone())
            .ok_or_else(|| ClientError::auth("not signed in"))
    }

    async fn fail(&self, err: ClientError) -> Result<(), ClientError> {
        self.fail_with(err).await
    }

    async fn fail_with<T>(&self, err: ClientError) -> Result<T, ClientError> {
        self.inner.lock().await.last_error = Some(err.clone());
        let _ = self.events.send(ClientEvent::Error(err.message.clone()));
        Err(err)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
