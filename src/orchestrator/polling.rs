//! The polling loop that drives a remote task to completion.
//!
//! A slow agent is tolerated indefinitely as long as it keeps answering
//! `tasks/get`; only the absence of *any* successful response for the stale
//! window (default 120 s) is fatal. RPC failures in between are logged and
//! ridden out.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::client::A2aClient;
use crate::error::{Error, Result};
use crate::progress::{ProgressBus, ProgressEvent, ProgressEventType};
use crate::types::{Artifact, TaskState};
use crate::utils::new_data_artifact;

/// Timing knobs for the polling loop.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Fixed inter-poll interval.
    pub interval: Duration,

    /// How long to ride out consecutive failures before declaring the agent
    /// unresponsive.
    pub stale_after: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            stale_after: Duration::from_secs(120),
        }
    }
}

/// Progress emission scoped to one query.
///
/// Progress values are clamped monotonically non-decreasing across the whole
/// query, so a second tool call's ramp never runs the number backwards.
pub struct ProgressContext {
    bus: Arc<ProgressBus>,
    conversation_id: String,
    query_id: String,
    last_progress: AtomicU32,
}

impl ProgressContext {
    /// Create a context for one query.
    pub fn new(bus: Arc<ProgressBus>, conversation_id: impl Into<String>, query_id: impl Into<String>) -> Self {
        Self {
            bus,
            conversation_id: conversation_id.into(),
            query_id: query_id.into(),
            last_progress: AtomicU32::new(0),
        }
    }

    /// The query id this context reports for.
    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// The conversation this context reports into.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Emit a `query:progress` event; the value only ever moves forward.
    pub async fn query_progress(&self, progress: u32, message: &str) -> u32 {
        let clamped = self.last_progress.fetch_max(progress, Ordering::AcqRel).max(progress);
        self.emit(
            ProgressEventType::QueryProgress,
            serde_json::json!({ "progress": clamped.min(100), "message": message }),
        )
        .await;
        clamped.min(100)
    }

    /// Emit an arbitrary event on the query's conversation.
    pub async fn emit(&self, event_type: ProgressEventType, data: serde_json::Value) {
        self.bus
            .publish(ProgressEvent::new(
                event_type,
                self.conversation_id.clone(),
                Some(self.query_id.clone()),
                data,
            ))
            .await;
    }
}

/// Poll `tasks/get` until the remote task reaches a terminal state.
///
/// Returns the task's artifacts on completion (a stub artifact when the
/// worker produced none), raises on `failed`/`canceled`, and raises
/// [`Error::AgentNotResponding`] once no successful response has been seen
/// for `options.stale_after`.
pub async fn poll_until_terminal(
    client: &A2aClient,
    base_url: &str,
    task_id: &str,
    agent_type: &str,
    progress: &ProgressContext,
    options: &PollOptions,
) -> Result<Vec<Artifact>> {
    let mut attempt: u32 = 0;
    let mut last_response = Instant::now();

    loop {
        match client.get_task(base_url, task_id).await {
            Ok(task) => {
                last_response = Instant::now();

                let ramp = (30 + attempt.saturating_mul(2)).min(90);
                progress
                    .query_progress(ramp, &format!("{} {}", agent_type, task.status.state))
                    .await;

                let availability = if task.status.state == TaskState::Working {
                    "busy"
                } else {
                    "idle"
                };
                progress
                    .emit(
                        ProgressEventType::AgentStatus,
                        serde_json::json!({
                            "agent": agent_type,
                            "status": availability,
                            "taskId": task_id,
                            "state": task.status.state.to_string(),
                        }),
                    )
                    .await;

                match task.status.state {
                    TaskState::Completed => {
                        debug!(task_id = %task_id, polls = attempt, "remote task completed");
                        if task.artifacts.is_empty() {
                            return Ok(vec![new_data_artifact(
                                "completion",
                                serde_json::json!({ "taskId": task_id, "completed": true }),
                            )]);
                        }
                        return Ok(task.artifacts);
                    }
                    TaskState::Failed => {
                        let reason = task
                            .status
                            .message
                            .unwrap_or_else(|| "worker task failed".to_string());
                        return Err(Error::Orchestration(format!(
                            "{} task {} failed: {}",
                            agent_type, task_id, reason
                        )));
                    }
                    TaskState::Canceled => {
                        return Err(Error::Orchestration(format!(
                            "{} task {} was canceled",
                            agent_type, task_id
                        )));
                    }
                    _ => {}
                }
            }
            Err(e) => {
                // Liveness is only ever reset by a successful response.
                if last_response.elapsed() > options.stale_after {
                    warn!(
                        task_id = %task_id,
                        stale_secs = options.stale_after.as_secs(),
                        "no response within the liveness window"
                    );
                    return Err(Error::AgentNotResponding);
                }
                warn!(task_id = %task_id, error = %e, "poll failed, will retry");
            }
        }

        attempt += 1;
        tokio::time::sleep(options.interval).await;
    }
}
