//! Orchestrator process (default port 3001).
//!
//! Serves the progress WebSocket at `/ws` and a thin query-submission
//! endpoint at `POST /queries` standing in for the external chat façade:
//! the request is accepted with HTTP 202 and processed asynchronously while
//! progress streams to the conversation's subscribers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use devmesh::client::ClientOptions;
use devmesh::config::{AgentKind, Config};
use devmesh::orchestrator::{
    HttpChatModel, InMemoryCheckpointStore, InMemoryConversationStore, Orchestrator,
    WorkerEndpoints,
};
use devmesh::progress::ws::progress_ws_router;
use devmesh::progress::ProgressBus;

#[derive(Debug, Deserialize)]
struct QueryRequest {
    username: String,
    message: String,
    #[serde(rename = "conversationId")]
    conversation_id: Option<String>,
}

struct AppState {
    orchestrator: Arc<Orchestrator>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env(AgentKind::Orchestrator);
    if config.enable_logging {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let endpoints = WorkerEndpoints {
        discovery_url: std::env::var("DISCOVERY_URL")
            .unwrap_or_else(|_| "http://localhost:3002".to_string()),
        analysis_url: std::env::var("ANALYSIS_URL")
            .unwrap_or_else(|_| "http://localhost:3003".to_string()),
        relationship_url: std::env::var("RELATIONSHIP_URL")
            .ok()
            .or_else(|| Some("http://localhost:3004".to_string())),
    };

    let bus = ProgressBus::shared();
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(HttpChatModel::from_env()?),
        endpoints,
        Arc::clone(&bus),
        Arc::new(InMemoryCheckpointStore::new()),
        Arc::new(InMemoryConversationStore::new()),
        ClientOptions::from_config(&config),
    ));

    let state = Arc::new(AppState { orchestrator });
    let app = Router::new()
        .route("/queries", post(submit_query))
        .route("/queries/{query_id}", get(get_query))
        .with_state(state)
        .merge(progress_ws_router(bus));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "orchestrator listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Accept a query and process it asynchronously.
async fn submit_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    let conversation_id = request
        .conversation_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let query_id = uuid::Uuid::new_v4().to_string();

    let orchestrator = Arc::clone(&state.orchestrator);
    let message = request.message;
    let username = request.username;
    let conversation = conversation_id.clone();
    let id = query_id.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator
            .process_query_as(&id, &message, &username, &conversation)
            .await
        {
            error!(conversation_id = %conversation, error = %e, "query processing failed");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "queryId": query_id,
            "conversationId": conversation_id,
            "status": "processing",
        })),
    )
}

/// Inspect a query by id.
async fn get_query(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(query_id): axum::extract::Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.get_query(&query_id).await {
        Some(query) => (StatusCode::OK, Json(serde_json::json!(query))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "unknown query" })),
        ),
    }
}
