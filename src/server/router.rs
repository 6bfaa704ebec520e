//! Axum integration — the HTTP surface of an agent.
//!
//! Routes:
//! - `POST /` — JSON-RPC 2.0 dispatch (`message/send`, `tasks/get`,
//!   `tasks/cancel`)
//! - `GET /.well-known/agent-card.json` — agent card discovery
//! - `GET /health` — liveness probe
//!
//! Framing: missing/incorrect `jsonrpc` is -32600, unknown methods are
//! -32601, undecodable params are -32602, and the response id always mirrors
//! the request id. Malformed JSON bodies are rejected before dispatch with
//! HTTP 400. CORS is wide open — infrastructure, not security.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

use crate::error::{self, Error};
use crate::types::{
    AgentCard, CancelTaskParams, GetTaskParams, HealthStatus, JsonRpcError, JsonRpcId,
    JsonRpcResponse, SendMessageParams,
};

use super::request_handler::{A2aRequestHandler, SUPPORTED_METHODS};

struct AppState {
    handler: Arc<A2aRequestHandler>,
    agent_card: AgentCard,
}

/// Build the agent's router.
pub fn a2a_router(handler: Arc<A2aRequestHandler>, agent_card: AgentCard) -> Router {
    let state = Arc::new(AppState {
        handler,
        agent_card,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(handle_jsonrpc))
        .route("/.well-known/agent-card.json", get(handle_agent_card))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

async fn handle_agent_card(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.agent_card.clone())
}

async fn handle_health() -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        transport: "json-rpc-2.0".to_string(),
        methods: SUPPORTED_METHODS.iter().map(|m| m.to_string()).collect(),
    })
}

/// Main JSON-RPC dispatch.
///
/// The body is taken as a raw JSON value so the envelope can be validated
/// field by field; a body that is not JSON at all never reaches this handler
/// (axum's `Json` rejection answers HTTP 400).
async fn handle_jsonrpc(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    let id = parse_id(&body);

    if body.get("jsonrpc").and_then(|v| v.as_str()) != Some("2.0") {
        return rpc_error(
            id,
            error::INVALID_REQUEST,
            "Invalid JSON-RPC version — must be \"2.0\"",
        );
    }

    let Some(method) = body.get("method").and_then(|v| v.as_str()) else {
        return rpc_error(id, error::INVALID_REQUEST, "Missing 'method'");
    };

    let params = body.get("params").cloned().unwrap_or(Value::Null);
    debug!(method = %method, "JSON-RPC request");

    match method {
        "message/send" => {
            let params: SendMessageParams = match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => return invalid_params(id, e),
            };
            respond(id, state.handler.on_message_send(params).await)
        }
        "tasks/get" => {
            let params: GetTaskParams = match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => return invalid_params(id, e),
            };
            respond(id, state.handler.on_get_task(params).await)
        }
        "tasks/cancel" => {
            let params: CancelTaskParams = match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => return invalid_params(id, e),
            };
            respond(id, state.handler.on_cancel_task(params).await)
        }
        other => {
            warn!(method = %other, "unknown JSON-RPC method");
            rpc_error(
                id,
                error::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )
        }
    }
}

/// Extract the request id, preserving its JSON type.
fn parse_id(body: &Value) -> Option<JsonRpcId> {
    match body.get("id") {
        Some(Value::String(s)) => Some(JsonRpcId::String(s.clone())),
        Some(Value::Number(n)) => n.as_i64().map(JsonRpcId::Number),
        Some(Value::Null) => Some(JsonRpcId::Null),
        _ => None,
    }
}

fn respond<T: serde::Serialize>(
    id: Option<JsonRpcId>,
    result: crate::error::Result<T>,
) -> Response {
    match result {
        Ok(value) => match serde_json::to_value(&value) {
            Ok(v) => Json(JsonRpcResponse::success(id, v)).into_response(),
            Err(e) => Json(JsonRpcResponse::from_error(
                id,
                Error::internal(format!("failed to serialize result: {}", e)),
            ))
            .into_response(),
        },
        Err(e) => Json(JsonRpcResponse::from_error(id, e)).into_response(),
    }
}

fn invalid_params(id: Option<JsonRpcId>, err: serde_json::Error) -> Response {
    rpc_error(
        id,
        error::INVALID_PARAMS,
        format!("Invalid params: {}", err),
    )
}

fn rpc_error(id: Option<JsonRpcId>, code: i64, message: impl Into<String>) -> Response {
    Json(JsonRpcResponse::error(
        id,
        JsonRpcError {
            code,
            message: message.into(),
            data: None,
        },
    ))
    .into_response()
}
