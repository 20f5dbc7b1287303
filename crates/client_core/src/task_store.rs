use std::{collections::HashSet, sync::Arc};

use shared::{
    domain::{Task, TodoId},
    error::ClientError,
    protocol::TaskPatch,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::{TaskBackend, TaskUpdateOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

struct StoreState {
    tasks: Vec<Task>,
    inflight: HashSet<TodoId>,
}

/// Ordered task collection, newest first, mirroring backend order. Every
/// mutation is confirm-then-apply: nothing changes locally until the backend
/// returns the canonical result, so a failure never needs rollback.
pub struct TaskListStore {
    backend: Arc<dyn TaskBackend>,
    inner: Mutex<StoreState>,
}

impl TaskListStore {
    pub fn new(backend: Arc<dyn TaskBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(StoreState {
                tasks: Vec::new(),
                inflight: HashSet::new(),
            }),
        }
    }

    pub async fn snapshot(&self) -> Vec<Task> {
        self.inner.lock().await.tasks.clone()
    }

    pub async fn get(&self, id: TodoId) -> Option<Task> {
        self.inner
            .lock()
            .await
            .tasks
            .iter()
            .find(|task| task.todo_id == id)
            .cloned()
    }

    pub async fn stats(&self) -> TaskStats {
        let state = self.inner.lock().await;
        let completed = state.tasks.iter().filter(|task| task.completed).count();
        TaskStats {
            total: state.tasks.len(),
            completed,
            pending: state.tasks.len() - completed,
        }
    }

    /// Replaces the whole collection with the backend's current list,
    /// discarding anything not yet confirmed.
    pub async fn load(&self, token: &str) -> Result<(), ClientError> {
        let tasks = self.backend.list(token).await?;
        let mut state = self.inner.lock().await;
        info!(count = tasks.len(), "task list loaded");
        state.tasks = tasks;
        state.inflight.clear();
        Ok(())
    }

    /// Creates a task from trimmed `text`. Blank text is rejected locally
    /// without a backend call. The backend mints the id; its canonical task
    /// is prepended to the front of the collection.
    pub async fn create(&self, token: &str, text: &str) -> Result<Task, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::validation("Task text must not be empty"));
        }
        let task = self.backend.create(token, text).await?;
        let mut state = self.inner.lock().await;
        state.tasks.insert(0, task.clone());
        Ok(task)
    }

    /// Applies `patch` to the task with `id`, preserving its position. The
    /// entry is only replaced once the backend confirms; any rank upgrade in
    /// the response is forwarded uninterpreted.
    pub async fn update(
        &self,
        token: &str,
        id: TodoId,
        patch: TaskPatch,
    ) -> Result<TaskUpdateOutcome, ClientError> {
        self.begin_mutation(id).await?;
        let result = self.backend.update(token, id, patch).await;
        let mut state = self.inner.lock().await;
        state.inflight.remove(&id);
        let outcome = result?;
        if let Some(slot) = state.tasks.iter_mut().find(|task| task.todo_id == id) {
            *slot = outcome.todo.clone();
        }
        Ok(outcome)
    }

    /// Removes the task with `id` once the backend confirms. An unknown id is
    /// an error, not a silent no-op; the collection is untouched either way.
    pub async fn delete(&self, token: &str, id: TodoId) -> Result<(), ClientError> {
        self.begin_mutation(id).await?;
        let result = self.backend.delete(token, id).await;
        let mut state = self.inner.lock().await;
        state.inflight.remove(&id);
        result?;
        state.tasks.retain(|task| task.todo_id != id);
        Ok(())
    }

    pub async fn clear(&self) {
        let mut state = self.inner.lock().await;
        state.tasks.clear();
        state.inflight.clear();
    }

    /// Local preconditions for a mutation: the id must exist and must not
    /// already have a response outstanding. Overlapping mutations against the
    /// same id are rejected rather than queued.
    async fn begin_mutation(&self, id: TodoId) -> Result<(), ClientError> {
        let mut state = self.inner.lock().await;
        if !state.tasks.iter().any(|task| task.todo_id == id) {
            return Err(ClientError::not_found(format!("Task {} not found", id.0)));
        }
        if !state.inflight.insert(id) {
            return Err(ClientError::validation(format!(
                "A change for task {} is still pending",
                id.0
            )));
        }
        Ok(())
    }
}
