//! The supervision loop: plan with the model, dispatch tool calls to
//! workers, drive them to completion, synthesize the final answer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::client::{A2aClient, ClientOptions};
use crate::error::{Error, Result};
use crate::progress::{ProgressBus, ProgressEventType};
use crate::types::{Artifact, ArtifactContent, Message, Part, SendMessageParams};
use crate::utils::artifact::{decode_json_data_uri, new_json_uri_artifact};

use super::llm::{ChatMessage, ChatModel, ToolCall};
use super::polling::{poll_until_terminal, PollOptions, ProgressContext};
use super::stores::{CheckpointStore, ConversationStore, StoredMessage};
use super::tools::{command_for_call, tool_specs, WorkerEndpoints};

/// The polling client rides a longer envelope than control RPCs: a poll
/// round-trip may legitimately take minutes on a loaded worker.
const POLLING_ENVELOPE: Duration = Duration::from_secs(300);

/// System prompt for the planning turns. Generic repository questions must
/// reach the discovery worker rather than the model's priors.
const SYSTEM_PROMPT: &str = "You are the orchestrator of a repository intelligence platform. \
You answer questions about repositories by calling the available tools. \
Whenever the user asks what repositories exist or are known, even vaguely, \
always call list_repositories, with empty parameters unless the user named \
an organization or topic. Use get_repository_details when a specific \
repository is discussed. Base answers only on tool results.";

/// Lifecycle of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// Accepted, not yet picked up.
    Pending,
    /// The supervision loop is running.
    Processing,
    /// Finished with an answer.
    Completed,
    /// Aborted with an error.
    Failed,
}

/// The orchestrator's own unit of work, persisted for client inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Query id.
    pub query_id: String,

    /// Conversation the query belongs to.
    pub conversation_id: String,

    /// Opaque user identity.
    pub user: String,

    /// The original question.
    pub text: String,

    /// Lifecycle status.
    pub status: QueryStatus,

    /// Progress, 0..=100.
    pub progress: u32,

    /// Final answer, on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Terminal error, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What `process_query` hands back to the façade.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// The query id.
    pub query_id: String,

    /// The synthesized answer.
    pub answer: String,

    /// The result summary artifact (base64 `data:` URI body).
    pub artifact: Artifact,
}

/// The supervising agent.
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    client: A2aClient,
    polling_client: A2aClient,
    endpoints: WorkerEndpoints,
    bus: Arc<ProgressBus>,
    checkpoints: Arc<dyn CheckpointStore>,
    conversations: Arc<dyn ConversationStore>,
    queries: RwLock<HashMap<String, Query>>,
    poll_options: PollOptions,
}

impl Orchestrator {
    /// Assemble an orchestrator from its collaborators.
    pub fn new(
        model: Arc<dyn ChatModel>,
        endpoints: WorkerEndpoints,
        bus: Arc<ProgressBus>,
        checkpoints: Arc<dyn CheckpointStore>,
        conversations: Arc<dyn ConversationStore>,
        options: ClientOptions,
    ) -> Self {
        let polling_options = options.clone().with_timeout(POLLING_ENVELOPE);
        Self {
            model,
            client: A2aClient::with_options(options),
            polling_client: A2aClient::with_options(polling_options),
            endpoints,
            bus,
            checkpoints,
            conversations,
            queries: RwLock::new(HashMap::new()),
            poll_options: PollOptions::default(),
        }
    }

    /// Override polling timings (tests shrink them).
    pub fn with_poll_options(mut self, poll_options: PollOptions) -> Self {
        self.poll_options = poll_options;
        self
    }

    /// Inspect a query by id.
    pub async fn get_query(&self, query_id: &str) -> Option<Query> {
        self.queries.read().await.get(query_id).cloned()
    }

    /// Run one query to completion under a fresh query id.
    ///
    /// Failures transition the query to `failed`, persist the error for
    /// inspection, emit an `error` event and a failed `query:completed`,
    /// and surface to the caller.
    pub async fn process_query(
        &self,
        text: &str,
        user: &str,
        conversation_id: &str,
    ) -> Result<QueryOutcome> {
        self.process_query_as(&uuid::Uuid::new_v4().to_string(), text, user, conversation_id)
            .await
    }

    /// Run one query to completion under a caller-assigned id (the façade
    /// hands the id to the client before processing starts).
    pub async fn process_query_as(
        &self,
        query_id: &str,
        text: &str,
        user: &str,
        conversation_id: &str,
    ) -> Result<QueryOutcome> {
        let query_id = query_id.to_string();
        {
            let mut queries = self.queries.write().await;
            queries.insert(
                query_id.clone(),
                Query {
                    query_id: query_id.clone(),
                    conversation_id: conversation_id.to_string(),
                    user: user.to_string(),
                    text: text.to_string(),
                    status: QueryStatus::Processing,
                    progress: 0,
                    answer: None,
                    error: None,
                },
            );
        }

        let ctx = ProgressContext::new(Arc::clone(&self.bus), conversation_id, query_id.clone());
        info!(query_id = %query_id, conversation_id = %conversation_id, "processing query");

        match self.run_query(text, user, conversation_id, &ctx).await {
            Ok(outcome) => {
                self.update_query(&query_id, |q| {
                    q.status = QueryStatus::Completed;
                    q.progress = 100;
                    q.answer = Some(outcome.answer.clone());
                })
                .await;
                Ok(outcome)
            }
            Err(e) => {
                let error_text = e.to_string();
                warn!(query_id = %query_id, error = %error_text, "query failed");
                self.update_query(&query_id, |q| {
                    q.status = QueryStatus::Failed;
                    q.error = Some(error_text.clone());
                })
                .await;

                ctx.emit(
                    ProgressEventType::Error,
                    serde_json::json!({ "error": error_text }),
                )
                .await;
                ctx.emit(
                    ProgressEventType::QueryCompleted,
                    serde_json::json!({ "status": "failed", "error": error_text }),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn run_query(
        &self,
        text: &str,
        user: &str,
        conversation_id: &str,
        ctx: &ProgressContext,
    ) -> Result<QueryOutcome> {
        let query_id = ctx.query_id().to_string();

        // Checkpointing is best-effort: a dead store must not kill the run.
        if let Err(e) = self
            .checkpoints
            .save(
                &query_id,
                serde_json::json!({
                    "queryId": query_id,
                    "conversationId": conversation_id,
                    "user": user,
                    "text": text,
                    "startedAt": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
        {
            warn!(query_id = %query_id, error = %e, "checkpoint save failed, continuing");
        }

        // The relationship worker is optional: a missing card degrades the
        // result instead of failing the query.
        let mut relationship_available = false;
        if let Some(ref url) = self.endpoints.relationship_url {
            match self.client.get_agent_card(url, false).await {
                Ok(_) => relationship_available = true,
                Err(e) => {
                    warn!(url = %url, error = %e, "relationship worker unavailable, degrading");
                }
            }
        }

        ctx.query_progress(5, "planning").await;

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(text)];
        let first_turn = self.model.chat(&messages, &tool_specs()).await?;

        let mut tool_call_names: Vec<String> = Vec::new();
        let answer = if first_turn.tool_calls.is_empty() {
            first_turn
                .content
                .unwrap_or_else(|| "No answer was produced.".to_string())
        } else {
            let calls = first_turn.tool_calls.clone();
            let mut results: Vec<(String, Value)> = Vec::new();

            for call in &calls {
                tool_call_names.push(call.name.clone());
                let value = self.execute_tool_call(call, conversation_id, ctx).await?;
                results.push((call.id.clone(), value));
            }

            messages.push(ChatMessage::assistant_with_calls(
                first_turn.content.unwrap_or_default(),
                calls,
            ));
            for (call_id, value) in &results {
                messages.push(ChatMessage::tool_result(call_id.clone(), value.to_string()));
            }

            let second_turn = self.model.chat(&messages, &tool_specs()).await?;
            second_turn
                .content
                .unwrap_or_else(|| "No answer was produced.".to_string())
        };

        ctx.query_progress(95, "synthesizing answer").await;

        let mut summary = serde_json::json!({
            "sessionId": query_id,
            "status": "completed",
            "answer": answer,
            "results": [{
                "agentType": "llm",
                "data": { "answer": answer, "toolCalls": tool_call_names },
            }],
        });
        if self.endpoints.relationship_url.is_some() && !relationship_available {
            summary["relationshipWorker"] = Value::String("unavailable".to_string());
        }
        let artifact = new_json_uri_artifact("query-result", &summary)?;

        // Persist the assistant turn before the terminal event so late
        // joiners can recover the answer from conversation storage.
        self.conversations
            .append(
                conversation_id,
                StoredMessage::assistant(answer.clone(), query_id.clone()),
            )
            .await?;

        ctx.query_progress(100, "completed").await;
        ctx.emit(
            ProgressEventType::QueryCompleted,
            serde_json::json!({
                "status": "completed",
                "artifact": serde_json::to_value(&artifact)?,
            }),
        )
        .await;

        info!(query_id = %query_id, "query completed");
        Ok(QueryOutcome {
            query_id,
            answer,
            artifact,
        })
    }

    /// Dispatch one tool call to its worker and drive the task to the end.
    async fn execute_tool_call(
        &self,
        call: &ToolCall,
        conversation_id: &str,
        ctx: &ProgressContext,
    ) -> Result<Value> {
        let (target, command) = command_for_call(call)?;
        let base_url = target.base_url(&self.endpoints).to_string();
        let agent_type = target.agent_type();

        ctx.emit(
            ProgressEventType::AgentSpawned,
            serde_json::json!({ "agent": agent_type, "tool": call.name }),
        )
        .await;

        let mut message = Message::user_text(&command);
        message.context_id = Some(conversation_id.to_string());
        let sent = self
            .client
            .send_message(
                &base_url,
                SendMessageParams {
                    message,
                    task_id: None,
                    context_id: Some(conversation_id.to_string()),
                    metadata: None,
                },
            )
            .await?;

        ctx.emit(
            ProgressEventType::TaskCreated,
            serde_json::json!({ "taskId": sent.task.id, "agent": agent_type }),
        )
        .await;

        let artifacts = poll_until_terminal(
            &self.polling_client,
            &base_url,
            &sent.task.id,
            agent_type,
            ctx,
            &self.poll_options,
        )
        .await?;

        ctx.emit(
            ProgressEventType::TaskUpdated,
            serde_json::json!({ "taskId": sent.task.id, "state": "completed" }),
        )
        .await;

        artifacts_to_value(&artifacts)
    }

    async fn update_query(&self, query_id: &str, mutate: impl FnOnce(&mut Query)) {
        let mut queries = self.queries.write().await;
        if let Some(query) = queries.get_mut(query_id) {
            mutate(query);
        }
    }
}

/// Collapse a task's artifacts into one JSON value for the tool result turn.
fn artifacts_to_value(artifacts: &[Artifact]) -> Result<Value> {
    let mut values = Vec::new();
    for artifact in artifacts {
        match &artifact.content {
            ArtifactContent::Parts { parts } => {
                for part in parts {
                    match part {
                        Part::Data { data } => values.push(data.clone()),
                        Part::Text { text } => values.push(Value::String(text.clone())),
                        Part::File { uri, .. } if uri.starts_with("data:") => {
                            values.push(decode_json_data_uri(uri)?);
                        }
                        _ => {}
                    }
                }
            }
            ArtifactContent::Uri { uri } if uri.starts_with("data:") => {
                values.push(decode_json_data_uri(uri)?);
            }
            ArtifactContent::Uri { uri } => {
                values.push(serde_json::json!({ "uri": uri }));
            }
        }
    }

    Ok(match values.len() {
        0 => Value::Null,
        1 => values.into_iter().next().unwrap_or(Value::Null),
        _ => Value::Array(values),
    })
}
