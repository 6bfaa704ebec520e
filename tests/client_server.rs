//! The high-level client against a live worker agent.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};

use devmesh::client::{A2aClient, ClientOptions};
use devmesh::server::{AgentExecutor, CancelHandle, RequestContext};
use devmesh::types::{Artifact, TaskState};
use devmesh::utils::new_data_artifact;
use devmesh::{Error, Result};

use common::{spawn_app, spawn_worker};

struct QuickEcho;

#[async_trait::async_trait]
impl AgentExecutor for QuickEcho {
    async fn execute(&self, context: RequestContext, _: CancelHandle) -> Result<Vec<Artifact>> {
        Ok(vec![new_data_artifact(
            "echo",
            serde_json::json!({ "input": context.user_input() }),
        )])
    }
}

async fn wait_for_state(
    client: &A2aClient,
    base_url: &str,
    task_id: &str,
    state: TaskState,
) -> devmesh::types::Task {
    for _ in 0..100 {
        let task = client.get_task(base_url, task_id).await.unwrap();
        if task.status.state == state {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task never reached {:?}", state);
}

#[tokio::test]
async fn send_message_then_get_task_round_trip() {
    let (base_url, _, _server) = spawn_worker("echo", Arc::new(QuickEcho)).await;
    let client = A2aClient::new();

    let sent = client
        .send_text(&base_url, "list repositories", Some("conv-1".into()))
        .await
        .unwrap();
    assert_eq!(sent.task.context_id.as_deref(), Some("conv-1"));

    let task = wait_for_state(&client, &base_url, &sent.task.id, TaskState::Completed).await;
    assert_eq!(task.id, sent.task.id);
    assert_eq!(task.artifacts.len(), 1);
    // History walked submitted → working → completed, last entry == status.
    assert_eq!(task.history.first().unwrap().state, TaskState::Submitted);
    assert_eq!(task.history.last().unwrap().state, task.status.state);
}

#[tokio::test]
async fn cancel_task_via_client() {
    struct Sleeper;

    #[async_trait::async_trait]
    impl AgentExecutor for Sleeper {
        async fn execute(&self, _: RequestContext, cancel: CancelHandle) -> Result<Vec<Artifact>> {
            cancel.cancelled().await;
            Err(Error::internal("canceled"))
        }
    }

    let (base_url, _, _server) = spawn_worker("sleeper", Arc::new(Sleeper)).await;
    let client = A2aClient::new();

    let sent = client.send_text(&base_url, "anything", None).await.unwrap();
    let canceled = client
        .cancel_task(&base_url, &sent.task.id, Some("tired of waiting".into()))
        .await
        .unwrap();
    assert_eq!(canceled.status.state, TaskState::Canceled);

    let err = client
        .cancel_task(&base_url, &sent.task.id, None)
        .await
        .unwrap_err();
    match err {
        Error::JsonRpc { code, data, .. } => {
            assert_eq!(code, -32002);
            assert_eq!(data.unwrap()["code"], "TASK_ALREADY_CANCELED");
        }
        other => panic!("expected JSON-RPC error, got {:?}", other),
    }
}

#[tokio::test]
async fn unknown_task_error_is_not_retried_and_keeps_code() {
    let (base_url, _, _server) = spawn_worker("echo", Arc::new(QuickEcho)).await;
    let client = A2aClient::new();

    let err = client
        .get_task(&base_url, "non-existent-task-id-12345")
        .await
        .unwrap_err();
    match err {
        Error::JsonRpc { code, .. } => assert_eq!(code, -32602),
        other => panic!("expected JSON-RPC error, got {:?}", other),
    }
}

#[tokio::test]
async fn agent_card_is_cached_until_ttl() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fetches);

    // Card endpoint that counts fetches.
    let app = Router::new().route(
        "/.well-known/agent-card.json",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({
                    "protocolVersion": "0.3.0",
                    "name": "counted",
                    "description": "",
                    "url": "http://localhost:0",
                    "transports": [],
                    "capabilities": {},
                    "defaultInputModes": ["text/plain"],
                    "defaultOutputModes": ["application/json"],
                    "skills": [],
                }))
            }
        }),
    );
    let (base_url, _server) = spawn_app(app).await;

    let client = A2aClient::with_options(ClientOptions {
        agent_card_cache_ttl: Duration::from_millis(150),
        ..Default::default()
    });

    let first = client.get_agent_card(&base_url, false).await.unwrap();
    let second = client.get_agent_card(&base_url, false).await.unwrap();
    assert_eq!(first.name, second.name);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    client.get_agent_card(&base_url, false).await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 2);

    // force_refresh bypasses a fresh entry.
    client.get_agent_card(&base_url, true).await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn destroyed_client_fails_fast_without_touching_the_network() {
    let (base_url, _, _server) = spawn_worker("doomed", Arc::new(QuickEcho)).await;
    let client = A2aClient::new();

    // Live first, dark after destroy.
    assert!(client.health_check(&base_url).await);
    client.destroy().await;

    let err = client.get_task(&base_url, "any").await.unwrap_err();
    match err {
        Error::Transport(message) => assert!(message.contains("shut down")),
        other => panic!("expected transport error, got {:?}", other),
    }
    assert!(!client.health_check(&base_url).await);
}

#[tokio::test]
async fn health_check_true_for_live_agent_false_for_dead() {
    let (base_url, _, _server) = spawn_worker("healthy", Arc::new(QuickEcho)).await;
    let client = A2aClient::with_options(ClientOptions {
        timeout: Duration::from_millis(500),
        max_retries: 0,
        ..Default::default()
    });

    assert!(client.health_check(&base_url).await);
    assert!(!client.health_check("http://127.0.0.1:1").await);
}

#[tokio::test]
async fn mismatched_response_id_is_rejected() {
    use axum::routing::post;

    // A broken agent that answers every request under the wrong id.
    let app = Router::new().route(
        "/",
        post(|| async {
            Json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": 999_999,
                "result": { "task": { "id": "t", "status": { "state": "completed", "timestamp": "2026-01-01T00:00:00Z" }, "history": [] } },
            }))
        }),
    );
    let (base_url, _server) = spawn_app(app).await;

    let client = A2aClient::new();
    let err = client.get_task(&base_url, "t").await.unwrap_err();
    match err {
        Error::InvalidJson(message) => assert!(message.contains("does not match")),
        other => panic!("expected id-mismatch error, got {:?}", other),
    }
}

#[tokio::test]
async fn transport_failures_retry_then_surface() {
    // Connect refused on every attempt; with max_retries=1 the call makes
    // two attempts and then surfaces the transport error.
    let client = A2aClient::with_options(ClientOptions {
        timeout: Duration::from_millis(300),
        max_retries: 1,
        retry_delay: Duration::from_millis(10),
        ..Default::default()
    });

    let start = std::time::Instant::now();
    let err = client
        .get_task("http://127.0.0.1:1", "task")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_) | Error::Timeout(_)));
    // At least one backoff sleep happened.
    assert!(start.elapsed() >= Duration::from_millis(10));
}
