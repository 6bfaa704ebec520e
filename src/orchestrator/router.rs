//! Legacy in-process coordination path for single-process deployments.
//!
//! Instead of HTTP, agents share a typed broadcast channel. The orchestrator
//! publishes a `Request`, agents answer with `Notification`s, and the monitor
//! resolves once every expected agent type has reported `completed`. A
//! deadline (5 minutes in production) broadcasts a cancel `Command` and
//! resolves with whatever arrived.
//!
//! From the caller's perspective this path is interface-equivalent to the
//! HTTP one: work in, per-agent results out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::server::{AgentExecutor, CancelRegistry, RequestContext};
use crate::types::{Message, TaskState};

const CHANNEL_CAPACITY: usize = 256;

/// The typed message union carried by the router.
#[derive(Debug, Clone)]
pub enum RouterMessage {
    /// Work dispatched to agents.
    Request {
        /// Task id correlating responses.
        task_id: String,
        /// Which agent type should handle it.
        agent_type: String,
        /// Request payload.
        payload: Value,
    },
    /// An agent's status report.
    Notification {
        /// Task id the report belongs to.
        task_id: String,
        /// Reporting agent type.
        agent_type: String,
        /// The agent's task state.
        state: TaskState,
        /// Result payload, when the state carries one.
        payload: Option<Value>,
    },
    /// A broadcast control command (e.g. `cancel`).
    Command {
        /// The action, e.g. "cancel".
        action: String,
        /// Task id the command applies to, if scoped.
        task_id: Option<String>,
    },
}

/// In-process pub/sub router over a broadcast channel.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    tx: broadcast::Sender<RouterMessage>,
}

impl MessageRouter {
    /// Create a router.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all router traffic.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterMessage> {
        self.tx.subscribe()
    }

    /// Publish a message to all subscribers. Messages with no subscribers
    /// are dropped — delivery is best-effort, like the rest of the bus work.
    pub fn publish(&self, message: RouterMessage) {
        if self.tx.send(message).is_err() {
            warn!("router message dropped: no subscribers");
        }
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Run an executor as an in-process agent on the router.
///
/// The agent handles `Request`s addressed to its agent type (payloads carry
/// the command under `"text"`), reports `working`, runs the executor under a
/// cancel handle, and answers with a terminal `Notification`. `Command
/// { action: "cancel" }` aborts the matching in-flight execution (all of
/// them when unscoped). Requests run concurrently, like their HTTP
/// counterparts.
pub fn spawn_router_agent(
    router: MessageRouter,
    agent_type: String,
    executor: Arc<dyn AgentExecutor>,
) -> JoinHandle<()> {
    let mut rx = router.subscribe();
    tokio::spawn(async move {
        let cancels = Arc::new(CancelRegistry::new());
        loop {
            match rx.recv().await {
                Ok(RouterMessage::Request {
                    task_id,
                    agent_type: target,
                    payload,
                }) if target == agent_type => {
                    let text = payload
                        .get("text")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let cancel = cancels.register(&task_id).await;

                    router.publish(RouterMessage::Notification {
                        task_id: task_id.clone(),
                        agent_type: agent_type.clone(),
                        state: TaskState::Working,
                        payload: None,
                    });

                    let executor = Arc::clone(&executor);
                    let router = router.clone();
                    let cancels = Arc::clone(&cancels);
                    let agent_type = agent_type.clone();
                    tokio::spawn(async move {
                        let context = RequestContext {
                            task_id: task_id.clone(),
                            context_id: None,
                            message: Message::user_text(text),
                        };

                        let outcome = tokio::select! {
                            result = executor.execute(context, cancel.clone()) => Some(result),
                            _ = cancel.cancelled() => None,
                        };

                        let (state, payload) = match outcome {
                            Some(Ok(artifacts)) => (
                                TaskState::Completed,
                                serde_json::to_value(&artifacts).ok(),
                            ),
                            Some(Err(e)) => (
                                TaskState::Failed,
                                Some(serde_json::json!({ "error": e.to_string() })),
                            ),
                            None => (TaskState::Canceled, None),
                        };

                        cancels.remove(&task_id).await;
                        router.publish(RouterMessage::Notification {
                            task_id,
                            agent_type,
                            state,
                            payload,
                        });
                    });
                }
                Ok(RouterMessage::Command { action, task_id }) if action == "cancel" => {
                    match task_id {
                        Some(ref id) => {
                            cancels.cancel(id).await;
                        }
                        None => cancels.cancel_all().await,
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(agent_type = %agent_type, missed = missed, "router agent lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// What the completion monitor resolved with.
#[derive(Debug)]
pub struct CompletionOutcome {
    /// Per-agent result payloads for agents that completed in time.
    pub completed: HashMap<String, Option<Value>>,

    /// Whether the deadline fired before the expected set completed.
    pub timed_out: bool,
}

/// Wait until every expected agent type reports `completed` for `task_id`.
///
/// On deadline, broadcasts `Command { action: "cancel" }` to all agents and
/// resolves with the partial completion set.
pub async fn await_agent_completions(
    router: &MessageRouter,
    task_id: &str,
    expected: &HashSet<String>,
    deadline: Duration,
) -> CompletionOutcome {
    let mut rx = router.subscribe();
    let mut completed: HashMap<String, Option<Value>> = HashMap::new();
    let timeout = tokio::time::sleep(deadline);
    tokio::pin!(timeout);

    loop {
        if expected.iter().all(|agent| completed.contains_key(agent)) {
            return CompletionOutcome {
                completed,
                timed_out: false,
            };
        }

        tokio::select! {
            message = rx.recv() => match message {
                Ok(RouterMessage::Notification { task_id: t, agent_type, state, payload })
                    if t == task_id && state == TaskState::Completed =>
                {
                    if expected.contains(&agent_type) {
                        debug!(agent_type = %agent_type, task_id = %task_id, "agent completed");
                        completed.insert(agent_type, payload);
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed = missed, "completion monitor lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return CompletionOutcome { completed, timed_out: false };
                }
            },
            _ = &mut timeout => {
                warn!(task_id = %task_id, "coordination deadline reached, broadcasting cancel");
                router.publish(RouterMessage::Command {
                    action: "cancel".to_string(),
                    task_id: Some(task_id.to_string()),
                });
                return CompletionOutcome { completed, timed_out: true };
            }
        }
    }
}
