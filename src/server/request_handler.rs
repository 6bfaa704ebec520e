//! Request handler — coordinates the executor, the task manager, and
//! cancellation for the three A2A methods.
//!
//! Lifecycle per `message/send`:
//! 1. Validate the message (non-empty, at least one text/data part).
//! 2. Resolve the task: reuse `taskId` if given (unknown id fails), otherwise
//!    create a fresh one in `submitted`.
//! 3. Transition to `working` and spawn the executor under a registered
//!    cancel handle.
//! 4. On executor success attach artifacts and complete; on error fail; when
//!    the cancel handle fires first the cancel RPC has already transitioned
//!    the task and the driver just exits.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::types::{
    CancelTaskParams, GetTaskParams, Part, SendMessageParams, SendMessageResult, Task, TaskState,
    TaskResult,
};

use super::agent_executor::{AgentExecutor, CancelRegistry, RequestContext};
use super::task_manager::{CreateTask, TaskManager};

/// RPC methods served by every agent.
pub const SUPPORTED_METHODS: [&str; 3] = ["message/send", "tasks/get", "tasks/cancel"];

/// Wires an [`AgentExecutor`] onto the task lifecycle.
pub struct A2aRequestHandler {
    executor: Arc<dyn AgentExecutor>,
    tasks: Arc<TaskManager>,
    cancels: Arc<CancelRegistry>,
}

impl A2aRequestHandler {
    /// Create a handler around the given executor and task manager.
    pub fn new(executor: Arc<dyn AgentExecutor>, tasks: Arc<TaskManager>) -> Self {
        Self {
            executor,
            tasks,
            cancels: Arc::new(CancelRegistry::new()),
        }
    }

    /// The task manager backing this handler.
    pub fn tasks(&self) -> Arc<TaskManager> {
        Arc::clone(&self.tasks)
    }

    /// Handle `message/send`.
    pub async fn on_message_send(&self, params: SendMessageParams) -> Result<SendMessageResult> {
        validate_message_parts(&params.message)?;

        let task = self.resolve_task(&params).await?;
        let message_id = params.message.message_id.clone();

        let context = RequestContext {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            message: params.message,
        };
        self.spawn_executor(context).await;

        // Return the freshest snapshot; the executor may already have moved
        // the task to `working`.
        let task = self.tasks.get(&task.id).await?;
        Ok(SendMessageResult { task, message_id })
    }

    /// Handle `tasks/get`.
    pub async fn on_get_task(&self, params: GetTaskParams) -> Result<TaskResult> {
        let task = self.tasks.get(&params.task_id).await?;
        Ok(TaskResult { task })
    }

    /// Handle `tasks/cancel`.
    ///
    /// Transitions the task to `canceled` first (validating cancelability),
    /// then aborts the in-flight execution if one exists.
    pub async fn on_cancel_task(&self, params: CancelTaskParams) -> Result<TaskResult> {
        let task = self.tasks.cancel(&params.task_id, params.reason).await?;
        self.cancels.cancel(&params.task_id).await;
        info!(task_id = %params.task_id, "task canceled via RPC");
        Ok(TaskResult { task })
    }

    /// Cancel all in-flight tasks and release resources (shutdown path).
    pub async fn destroy(&self) {
        for task_id in self.cancels.task_ids().await {
            if let Err(e) = self
                .tasks
                .cancel(&task_id, Some("worker shutting down".to_string()))
                .await
            {
                debug!(task_id = %task_id, error = %e, "shutdown cancel skipped");
            }
        }
        self.cancels.cancel_all().await;
    }

    /// Resolve the task for a send: reuse `taskId` or create a new one.
    async fn resolve_task(&self, params: &SendMessageParams) -> Result<Task> {
        let task_id = params
            .message
            .task_id
            .clone()
            .or_else(|| params.task_id.clone());

        if let Some(task_id) = task_id {
            let task = self.tasks.get(&task_id).await?;
            if task.status.state.is_terminal() {
                return Err(Error::invalid_params(format!(
                    "task {} is in terminal state {}",
                    task_id, task.status.state
                )));
            }
            debug!(task_id = %task_id, "continuing existing task");
            return Ok(task);
        }

        let context_id = params
            .context_id
            .clone()
            .or_else(|| params.message.context_id.clone());
        self.tasks
            .create(CreateTask {
                context_id,
                initial_message: Some(params.message.clone()),
                metadata: params.metadata.clone(),
            })
            .await
    }

    /// Transition to `working` and run the executor in the background.
    async fn spawn_executor(&self, context: RequestContext) {
        let task_id = context.task_id.clone();
        let cancel = self.cancels.register(&task_id).await;

        // Working is published before the domain function runs. A task being
        // resumed while already `working` skips the redundant transition.
        let current = self.tasks.get(&task_id).await.map(|t| t.status.state);
        if !matches!(current, Ok(TaskState::Working)) {
            if let Err(e) = self
                .tasks
                .start(&task_id, Some("Processing message".to_string()))
                .await
            {
                error!(task_id = %task_id, error = %e, "failed to start task");
                self.cancels.remove(&task_id).await;
                return;
            }
        }

        let executor = Arc::clone(&self.executor);
        let tasks = Arc::clone(&self.tasks);
        let cancels = Arc::clone(&self.cancels);

        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = executor.execute(context, cancel.clone()) => Some(result),
                _ = cancel.cancelled() => None,
            };

            match outcome {
                Some(Ok(artifacts)) => {
                    // A concurrent cancel may have won the race; the failed
                    // transition is logged and the canceled state stands.
                    if let Err(e) = tasks.complete(&task_id, None, artifacts).await {
                        debug!(task_id = %task_id, error = %e, "completion superseded");
                    }
                }
                Some(Err(e)) => {
                    error!(task_id = %task_id, error = %e, "executor failed");
                    if let Err(e) = tasks.fail(&task_id, e.to_string()).await {
                        debug!(task_id = %task_id, error = %e, "failure transition superseded");
                    }
                }
                None => {
                    // The cancel RPC already transitioned the task.
                    debug!(task_id = %task_id, "execution aborted by cancel");
                }
            }

            cancels.remove(&task_id).await;
        });
    }
}

/// Message invariant: non-empty parts, at least one addressable part.
fn validate_message_parts(message: &crate::types::Message) -> Result<()> {
    if message.parts.is_empty() {
        return Err(Error::UnsupportedMessageFormat {
            message: "message has no parts".to_string(),
        });
    }
    let addressable = message
        .parts
        .iter()
        .any(|p| matches!(p, Part::Text { .. } | Part::Data { .. }));
    if !addressable {
        return Err(Error::UnsupportedMessageFormat {
            message: "message has no text or data part".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::agent_executor::CancelHandle;
    use crate::server::task_store::InMemoryTaskStore;
    use crate::types::{Artifact, Message};
    use crate::utils::new_data_artifact;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Echoes the command back as a data artifact after an optional delay.
    struct EchoExecutor {
        delay: Duration,
    }

    #[async_trait]
    impl AgentExecutor for EchoExecutor {
        async fn execute(
            &self,
            context: RequestContext,
            cancel: CancelHandle,
        ) -> Result<Vec<Artifact>> {
            tokio::time::sleep(self.delay).await;
            if cancel.is_canceled() {
                return Err(Error::internal("canceled"));
            }
            Ok(vec![new_data_artifact(
                "echo",
                serde_json::json!({ "input": context.user_input() }),
            )])
        }
    }

    fn handler(delay: Duration) -> A2aRequestHandler {
        let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
        A2aRequestHandler::new(Arc::new(EchoExecutor { delay }), tasks)
    }

    async fn wait_for_state(
        handler: &A2aRequestHandler,
        task_id: &str,
        state: TaskState,
    ) -> Task {
        for _ in 0..100 {
            let task = handler.tasks().get(task_id).await.unwrap();
            if task.status.state == state {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} never reached {:?}", task_id, state);
    }

    fn send_params(text: &str) -> SendMessageParams {
        SendMessageParams {
            message: Message::user_text(text),
            task_id: None,
            context_id: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn send_creates_task_and_completes_with_artifact() {
        let handler = handler(Duration::from_millis(10));
        let result = handler.on_message_send(send_params("hello")).await.unwrap();
        assert!(!result.task.id.is_empty());

        let done = wait_for_state(&handler, &result.task.id, TaskState::Completed).await;
        assert_eq!(done.artifacts.len(), 1);
    }

    #[tokio::test]
    async fn send_then_get_returns_same_task_id() {
        let handler = handler(Duration::from_millis(5));
        let sent = handler.on_message_send(send_params("hi")).await.unwrap();
        let got = handler
            .on_get_task(GetTaskParams {
                task_id: sent.task.id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(got.task.id, sent.task.id);
    }

    #[tokio::test]
    async fn send_with_unknown_task_id_fails() {
        let handler = handler(Duration::from_millis(5));
        let mut params = send_params("hi");
        params.task_id = Some("non-existent-task-id-12345".into());
        let err = handler.on_message_send(params).await.unwrap_err();
        assert!(matches!(err, Error::TaskNotFound { .. }));
    }

    #[tokio::test]
    async fn empty_parts_rejected() {
        let handler = handler(Duration::from_millis(5));
        let mut params = send_params("x");
        params.message.parts.clear();
        let err = handler.on_message_send(params).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedMessageFormat { .. }));
    }

    #[tokio::test]
    async fn cancel_aborts_running_execution() {
        let handler = handler(Duration::from_secs(30));
        let sent = handler
            .on_message_send(send_params("analyze repository: cancel/test"))
            .await
            .unwrap();

        let canceled = handler
            .on_cancel_task(CancelTaskParams {
                task_id: sent.task.id.clone(),
                reason: Some("Test cancellation".into()),
            })
            .await
            .unwrap();
        assert_eq!(canceled.task.status.state, TaskState::Canceled);

        // Still canceled on re-read, and a second cancel is distinguishable.
        let got = handler
            .on_get_task(GetTaskParams {
                task_id: sent.task.id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(got.task.status.state, TaskState::Canceled);

        let err = handler
            .on_cancel_task(CancelTaskParams {
                task_id: sent.task.id,
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskAlreadyCanceled { .. }));
    }

    #[tokio::test]
    async fn destroy_cancels_in_flight_work() {
        let handler = handler(Duration::from_secs(30));
        let sent = handler.on_message_send(send_params("slow")).await.unwrap();
        handler.destroy().await;

        let got = wait_for_state(&handler, &sent.task.id, TaskState::Canceled).await;
        assert_eq!(
            got.status.message.as_deref(),
            Some("worker shutting down")
        );
    }
}
