//! Task manager — custodian of the task state machine.
//!
//! All task mutations flow through here. The manager enforces the allowed
//! transition edges, stamps every status, appends to the (append-only)
//! history, and serializes concurrent mutations per task id.
//!
//! Allowed transitions:
//!
//! ```text
//! submitted → working | canceled | failed | rejected | auth-required | input-required
//! working   → completed | failed | canceled | input-required | auth-required
//! input-required / auth-required → working | canceled | failed
//! completed / failed / canceled / rejected → ∅
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Artifact, Message, Task, TaskState, TaskStatus};

use super::task_store::TaskStore;

/// Parameters for [`TaskManager::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    /// Context the task belongs to.
    pub context_id: Option<String>,

    /// The message that initiated the task, recorded in metadata.
    pub initial_message: Option<Message>,

    /// Free-form metadata.
    pub metadata: Option<serde_json::Value>,
}

/// Parameters for [`TaskManager::update_status`].
#[derive(Debug, Clone)]
pub struct UpdateStatus {
    /// The state to transition into.
    pub state: TaskState,

    /// Optional human-readable note for the new status.
    pub message: Option<String>,

    /// Artifacts to append along with the transition.
    pub artifacts: Vec<Artifact>,
}

impl UpdateStatus {
    /// A bare state transition.
    pub fn to(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            artifacts: Vec::new(),
        }
    }

    /// Attach a status note.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach artifacts to append.
    pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.artifacts = artifacts;
        self
    }
}

/// Authoritative task state machine on top of an interchangeable store.
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
    /// Per-task mutation locks; mutations on the same task serialize,
    /// different tasks proceed concurrently.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TaskManager {
    /// Create a manager over the given store.
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a fresh task in `submitted` state and persist it.
    pub async fn create(&self, params: CreateTask) -> Result<Task> {
        let status = TaskStatus::now(TaskState::Submitted, None);
        let metadata = match (params.metadata, &params.initial_message) {
            (Some(mut meta), Some(msg)) => {
                if let Some(obj) = meta.as_object_mut() {
                    obj.insert(
                        "initialMessageId".to_string(),
                        serde_json::Value::String(msg.message_id.clone()),
                    );
                }
                Some(meta)
            }
            (None, Some(msg)) => Some(serde_json::json!({ "initialMessageId": msg.message_id })),
            (meta, None) => meta,
        };

        let task = Task {
            id: Uuid::new_v4().to_string(),
            context_id: params.context_id,
            status: status.clone(),
            history: vec![status],
            artifacts: Vec::new(),
            metadata,
        };

        self.store.save(task.clone()).await?;
        info!(task_id = %task.id, context_id = ?task.context_id, "task created");
        Ok(task)
    }

    /// Retrieve a task, failing with `TaskNotFound` for unknown ids.
    pub async fn get(&self, task_id: &str) -> Result<Task> {
        self.store
            .get(task_id)
            .await?
            .ok_or_else(|| Error::task_not_found(task_id))
    }

    /// Transition a task to a new state, appending to history.
    ///
    /// Rejects with `TaskNotCancelable` when the current state is terminal
    /// and `InvalidParams` for edges outside the transition table.
    pub async fn update_status(&self, task_id: &str, update: UpdateStatus) -> Result<Task> {
        let lock = self.task_lock(task_id).await;
        let _guard = lock.lock().await;

        let mut task = self.get(task_id).await?;
        let from = task.status.state;

        if from.is_terminal() {
            warn!(task_id = %task_id, from = %from, to = %update.state, "update on terminal task");
            return Err(Error::task_not_cancelable(format!(
                "task {} is in terminal state {}",
                task_id, from
            )));
        }

        if !allowed_transition(from, update.state) {
            return Err(Error::invalid_params(format!(
                "invalid task transition {} -> {}",
                from, update.state
            )));
        }

        let status = TaskStatus::now(update.state, update.message);
        task.status = status.clone();
        task.history.push(status);
        task.artifacts.extend(update.artifacts);

        self.store.save(task.clone()).await?;
        debug!(task_id = %task_id, from = %from, to = %task.status.state, "task transitioned");
        Ok(task)
    }

    /// Append an artifact without changing state.
    pub async fn add_artifact(&self, task_id: &str, artifact: Artifact) -> Result<Task> {
        let lock = self.task_lock(task_id).await;
        let _guard = lock.lock().await;

        let mut task = self.get(task_id).await?;
        task.artifacts.push(artifact);
        self.store.save(task.clone()).await?;
        Ok(task)
    }

    /// Cancel a task.
    ///
    /// Idempotence contract: a second cancel yields `TaskAlreadyCanceled`;
    /// cancel on any other terminal state yields `TaskNotCancelable`.
    pub async fn cancel(&self, task_id: &str, reason: Option<String>) -> Result<Task> {
        let lock = self.task_lock(task_id).await;
        let _guard = lock.lock().await;

        let mut task = self.get(task_id).await?;
        let from = task.status.state;

        if from == TaskState::Canceled {
            return Err(Error::TaskAlreadyCanceled {
                task_id: task_id.to_string(),
            });
        }
        if from.is_terminal() {
            return Err(Error::task_not_cancelable(format!(
                "task {} is in terminal state {}",
                task_id, from
            )));
        }

        let status = TaskStatus::now(TaskState::Canceled, reason);
        task.status = status.clone();
        task.history.push(status);
        self.store.save(task.clone()).await?;
        info!(task_id = %task_id, from = %from, "task canceled");
        Ok(task)
    }

    /// Transition to `working`.
    pub async fn start(&self, task_id: &str, message: Option<String>) -> Result<Task> {
        self.update_status(
            task_id,
            UpdateStatus {
                state: TaskState::Working,
                message,
                artifacts: Vec::new(),
            },
        )
        .await
    }

    /// Transition to `completed`, attaching final artifacts.
    pub async fn complete(
        &self,
        task_id: &str,
        message: Option<String>,
        artifacts: Vec<Artifact>,
    ) -> Result<Task> {
        self.update_status(
            task_id,
            UpdateStatus {
                state: TaskState::Completed,
                message,
                artifacts,
            },
        )
        .await
    }

    /// Transition to `failed`, recording the error message.
    pub async fn fail(&self, task_id: &str, message: impl Into<String>) -> Result<Task> {
        self.update_status(
            task_id,
            UpdateStatus {
                state: TaskState::Failed,
                message: Some(message.into()),
                artifacts: Vec::new(),
            },
        )
        .await
    }

    /// List tasks belonging to a context.
    pub async fn list_by_context(&self, context_id: &str) -> Result<Vec<Task>> {
        self.store.list_by_context(context_id).await
    }

    /// Delete a task.
    pub async fn delete(&self, task_id: &str) -> Result<()> {
        self.store.delete(task_id).await?;
        let mut locks = self.locks.lock().await;
        locks.remove(task_id);
        Ok(())
    }

    async fn task_lock(&self, task_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// The transition table. Terminal states admit nothing.
fn allowed_transition(from: TaskState, to: TaskState) -> bool {
    use TaskState::*;
    match from {
        Submitted => matches!(
            to,
            Working | Canceled | Failed | Rejected | AuthRequired | InputRequired
        ),
        Working => matches!(
            to,
            Completed | Failed | Canceled | InputRequired | AuthRequired
        ),
        InputRequired | AuthRequired => matches!(to, Working | Canceled | Failed),
        Completed | Failed | Canceled | Rejected => false,
        Unknown => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::task_store::InMemoryTaskStore;
    use crate::utils::new_data_artifact;

    fn manager() -> TaskManager {
        TaskManager::new(Arc::new(InMemoryTaskStore::new()))
    }

    #[tokio::test]
    async fn create_starts_submitted_with_one_history_entry() {
        let mgr = manager();
        let task = mgr.create(CreateTask::default()).await.unwrap();
        assert_eq!(task.status.state, TaskState::Submitted);
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.history[0].state, task.status.state);
    }

    #[tokio::test]
    async fn get_unknown_task_fails() {
        let mgr = manager();
        let err = mgr.get("non-existent-task-id-12345").await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound { .. }));
    }

    #[tokio::test]
    async fn history_tracks_status_and_timestamps_are_monotonic() {
        let mgr = manager();
        let task = mgr.create(CreateTask::default()).await.unwrap();
        mgr.start(&task.id, Some("starting".into())).await.unwrap();
        let done = mgr.complete(&task.id, None, Vec::new()).await.unwrap();

        assert_eq!(done.history.len(), 3);
        assert_eq!(done.history.last().unwrap().state, done.status.state);
        for pair in done.history.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn terminal_states_admit_no_transitions() {
        let mgr = manager();
        let task = mgr.create(CreateTask::default()).await.unwrap();
        mgr.start(&task.id, None).await.unwrap();
        mgr.complete(&task.id, None, Vec::new()).await.unwrap();

        let err = mgr.start(&task.id, None).await.unwrap_err();
        assert!(matches!(err, Error::TaskNotCancelable { .. }));
    }

    #[tokio::test]
    async fn submitted_cannot_jump_to_completed() {
        let mgr = manager();
        let task = mgr.create(CreateTask::default()).await.unwrap();
        let err = mgr
            .update_status(&task.id, UpdateStatus::to(TaskState::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn input_required_can_resume_working() {
        let mgr = manager();
        let task = mgr.create(CreateTask::default()).await.unwrap();
        mgr.start(&task.id, None).await.unwrap();
        let waiting = mgr
            .update_status(
                &task.id,
                UpdateStatus::to(TaskState::InputRequired).with_message("need a branch name"),
            )
            .await
            .unwrap();
        assert_eq!(
            waiting.status.message.as_deref(),
            Some("need a branch name")
        );
        let resumed = mgr.start(&task.id, None).await.unwrap();
        assert_eq!(resumed.status.state, TaskState::Working);
    }

    #[tokio::test]
    async fn update_status_can_carry_artifacts() {
        let mgr = manager();
        let task = mgr.create(CreateTask::default()).await.unwrap();
        mgr.start(&task.id, None).await.unwrap();
        let done = mgr
            .update_status(
                &task.id,
                UpdateStatus::to(TaskState::Completed)
                    .with_artifacts(vec![new_data_artifact("out", serde_json::json!({"ok": true}))]),
            )
            .await
            .unwrap();
        assert_eq!(done.artifacts.len(), 1);
    }

    #[tokio::test]
    async fn cancel_is_terminal_and_second_cancel_is_distinguishable() {
        let mgr = manager();
        let task = mgr.create(CreateTask::default()).await.unwrap();
        mgr.start(&task.id, None).await.unwrap();

        let canceled = mgr
            .cancel(&task.id, Some("Test cancellation".into()))
            .await
            .unwrap();
        assert_eq!(canceled.status.state, TaskState::Canceled);
        assert_eq!(
            canceled.status.message.as_deref(),
            Some("Test cancellation")
        );

        let err = mgr.cancel(&task.id, None).await.unwrap_err();
        assert!(matches!(err, Error::TaskAlreadyCanceled { .. }));

        // Completed task: not cancelable, but not "already canceled".
        let other = mgr.create(CreateTask::default()).await.unwrap();
        mgr.start(&other.id, None).await.unwrap();
        mgr.complete(&other.id, None, Vec::new()).await.unwrap();
        let err = mgr.cancel(&other.id, None).await.unwrap_err();
        assert!(matches!(err, Error::TaskNotCancelable { .. }));
    }

    #[tokio::test]
    async fn artifacts_append_with_and_without_transition() {
        let mgr = manager();
        let task = mgr.create(CreateTask::default()).await.unwrap();
        mgr.start(&task.id, None).await.unwrap();

        mgr.add_artifact(&task.id, new_data_artifact("partial", serde_json::json!({"n": 1})))
            .await
            .unwrap();
        let done = mgr
            .complete(
                &task.id,
                None,
                vec![new_data_artifact("final", serde_json::json!({"n": 2}))],
            )
            .await
            .unwrap();
        assert_eq!(done.artifacts.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_updates_on_one_task_serialize() {
        let mgr = Arc::new(manager());
        let task = mgr.create(CreateTask::default()).await.unwrap();
        mgr.start(&task.id, None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let mgr = Arc::clone(&mgr);
            let id = task.id.clone();
            handles.push(tokio::spawn(async move {
                mgr.add_artifact(&id, new_data_artifact(format!("a{}", i), serde_json::json!(i)))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let task = mgr.get(&task.id).await.unwrap();
        assert_eq!(task.artifacts.len(), 8);
    }

    #[tokio::test]
    async fn list_by_context_and_delete() {
        let mgr = manager();
        let t1 = mgr
            .create(CreateTask {
                context_id: Some("ctx".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        mgr.create(CreateTask {
            context_id: Some("other".into()),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(mgr.list_by_context("ctx").await.unwrap().len(), 1);
        mgr.delete(&t1.id).await.unwrap();
        assert!(mgr.list_by_context("ctx").await.unwrap().is_empty());
    }
}
