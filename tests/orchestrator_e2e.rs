//! End-to-end supervision: orchestrator + live workers + scripted model.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use devmesh::client::ClientOptions;
use devmesh::orchestrator::{
    ChatMessage, ChatModel, ChatRole, ChatTurn, InMemoryCheckpointStore,
    InMemoryConversationStore, Orchestrator, PollOptions, ToolCall, ToolSpec, WorkerEndpoints,
};
use devmesh::progress::{ProgressBus, ProgressEventType};
use devmesh::types::ArtifactContent;
use devmesh::utils::artifact::decode_json_data_uri;
use devmesh::workers::{DiscoveryExecutor, SampleCatalog};
use devmesh::{Error, Result};

use common::{spawn_app, spawn_worker};

/// Plans one `list_repositories` call, then answers from the tool result.
struct ScriptedModel;

#[async_trait::async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, messages: &[ChatMessage], _: &[ToolSpec]) -> Result<ChatTurn> {
        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        if let Some(tool_turn) = messages.iter().find(|m| m.role == ChatRole::Tool) {
            // Second turn: ground the answer in the tool result.
            let result: Value = serde_json::from_str(&tool_turn.content)
                .map_err(|e| Error::Orchestration(format!("bad tool result: {}", e)))?;
            let names: Vec<String> = result["repositories"]
                .as_array()
                .map(|repos| {
                    repos
                        .iter()
                        .filter_map(|r| r["name"].as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            return Ok(ChatTurn {
                content: Some(format!(
                    "The platform is aware of {} repositories: {}.",
                    names.len(),
                    names.join(", ")
                )),
                tool_calls: Vec::new(),
            });
        }

        // First turn: always reach for discovery; qualify by organization
        // when the question names one.
        let organization = ["cortside", "thehivegroup-ai"]
            .iter()
            .find(|org| question.contains(*org))
            .map(|org| org.to_string());
        let arguments = match organization {
            Some(org) => json!({ "organization": org }),
            None => json!({}),
        };
        Ok(ChatTurn {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                name: "list_repositories".into(),
                arguments,
            }],
        })
    }
}

fn fast_poll() -> PollOptions {
    PollOptions {
        interval: Duration::from_millis(50),
        stale_after: Duration::from_secs(5),
    }
}

async fn build_orchestrator(
    discovery_url: String,
    relationship_url: Option<String>,
    model: Arc<dyn ChatModel>,
    bus: Arc<ProgressBus>,
) -> Orchestrator {
    Orchestrator::new(
        model,
        WorkerEndpoints {
            discovery_url,
            analysis_url: "http://127.0.0.1:1".to_string(),
            relationship_url,
        },
        bus,
        Arc::new(InMemoryCheckpointStore::new()),
        Arc::new(InMemoryConversationStore::new()),
        ClientOptions {
            timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(20),
            ..Default::default()
        },
    )
    .with_poll_options(fast_poll())
}

fn decoded_summary(outcome: &devmesh::orchestrator::QueryOutcome) -> Value {
    let ArtifactContent::Uri { ref uri } = outcome.artifact.content else {
        panic!("expected data: URI artifact");
    };
    decode_json_data_uri(uri).unwrap()
}

#[tokio::test]
async fn discovery_round_trip_with_progress_events() {
    let (discovery_url, _, _worker) = spawn_worker(
        "discovery-worker",
        Arc::new(DiscoveryExecutor::new(Arc::new(SampleCatalog::new()))),
    )
    .await;

    let bus = ProgressBus::shared();
    let mut rx = bus.join("conv-1").await;
    let orch =
        build_orchestrator(discovery_url, None, Arc::new(ScriptedModel), Arc::clone(&bus)).await;

    let outcome = orch
        .process_query("what repositories are you aware of?", "u", "conv-1")
        .await
        .unwrap();

    // The answer is grounded, non-empty, and not a no-information stub.
    assert!(!outcome.answer.is_empty());
    let lowered = outcome.answer.to_lowercase();
    assert!(!lowered.starts_with("i don't have information"));
    assert!(!lowered.starts_with("no information"));
    assert!(outcome.answer.contains("developer-agent"));

    // Decoded artifact carries the session summary.
    let summary = decoded_summary(&outcome);
    assert_eq!(summary["sessionId"], json!(outcome.query_id));
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["results"][0]["agentType"], "llm");
    let tool_calls = summary["results"][0]["data"]["toolCalls"]
        .as_array()
        .unwrap();
    assert!(tool_calls.contains(&json!("list_repositories")));

    // ≥1 progress event before exactly one completion; progress monotone.
    let mut progress_values = Vec::new();
    let mut completions = 0;
    while let Ok(event) = rx.try_recv() {
        match event.event_type {
            ProgressEventType::QueryProgress => {
                assert_eq!(completions, 0, "progress after completion");
                progress_values.push(event.data["progress"].as_u64().unwrap());
            }
            ProgressEventType::QueryCompleted => {
                completions += 1;
                assert_eq!(event.data["status"], "completed");
            }
            _ => {}
        }
    }
    assert!(!progress_values.is_empty());
    assert_eq!(completions, 1);
    assert!(progress_values.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn two_questions_two_distinct_answers() {
    let (discovery_url, _, _worker) = spawn_worker(
        "discovery-worker",
        Arc::new(DiscoveryExecutor::new(Arc::new(SampleCatalog::new()))),
    )
    .await;

    let bus = ProgressBus::shared();
    let orch =
        build_orchestrator(discovery_url, None, Arc::new(ScriptedModel), Arc::clone(&bus)).await;

    let first = orch
        .process_query(
            "what repositories does the cortside organization have?",
            "u",
            "conv-2",
        )
        .await
        .unwrap();
    let second = orch
        .process_query(
            "what repositories does the thehivegroup-ai organization have?",
            "u",
            "conv-2",
        )
        .await
        .unwrap();

    assert_ne!(first.query_id, second.query_id);
    assert!(!first.answer.is_empty() && !second.answer.is_empty());

    let first_summary = decoded_summary(&first);
    let second_summary = decoded_summary(&second);
    assert_ne!(first_summary, second_summary);
    assert!(first.answer.contains("coeus"));
    assert!(second.answer.contains("developer-agent"));
}

#[tokio::test]
async fn unresponsive_worker_trips_the_liveness_timeout() {
    use axum::response::IntoResponse;

    // A worker that accepts the message but never answers a poll: tasks/get
    // always returns HTTP 500, so liveness is never reset.
    let app = Router::new().route(
        "/",
        post(|Json(body): Json<Value>| async move {
            let id = body["id"].clone();
            if body["method"] == "message/send" {
                let status = json!({
                    "state": "submitted",
                    "timestamp": "2026-01-01T00:00:00Z",
                });
                axum::response::Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "task": {
                            "id": "stuck-task",
                            "status": status.clone(),
                            "history": [status],
                        },
                        "messageId": "m1",
                    },
                }))
                .into_response()
            } else {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }),
    );
    let (stale_url, _server) = spawn_app(app).await;

    let bus = ProgressBus::shared();
    let mut rx = bus.join("conv-stale").await;
    let mut orch =
        build_orchestrator(stale_url, None, Arc::new(ScriptedModel), Arc::clone(&bus)).await;
    orch = orch.with_poll_options(PollOptions {
        interval: Duration::from_millis(50),
        stale_after: Duration::from_millis(400),
    });

    let err = orch
        .process_query("what repositories are you aware of?", "u", "conv-stale")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("agent not responding"));

    let mut saw_failed_completion = false;
    while let Ok(event) = rx.try_recv() {
        if event.event_type == ProgressEventType::QueryCompleted {
            assert_eq!(event.data["status"], "failed");
            assert!(event.data["error"]
                .as_str()
                .unwrap()
                .contains("agent not responding"));
            saw_failed_completion = true;
        }
    }
    assert!(saw_failed_completion);
}

#[tokio::test]
async fn missing_relationship_worker_degrades_instead_of_failing() {
    /// Answers directly; no tools involved.
    struct DirectModel;

    #[async_trait::async_trait]
    impl ChatModel for DirectModel {
        async fn chat(&self, _: &[ChatMessage], _: &[ToolSpec]) -> Result<ChatTurn> {
            Ok(ChatTurn {
                content: Some("Nothing to report.".to_string()),
                tool_calls: Vec::new(),
            })
        }
    }

    let bus = ProgressBus::shared();
    let orch = build_orchestrator(
        "http://127.0.0.1:1".to_string(),
        Some("http://127.0.0.1:1".to_string()),
        Arc::new(DirectModel),
        Arc::clone(&bus),
    )
    .await;

    let outcome = orch
        .process_query("status?", "u", "conv-degraded")
        .await
        .unwrap();
    let summary = decoded_summary(&outcome);
    assert_eq!(summary["relationshipWorker"], "unavailable");
}
