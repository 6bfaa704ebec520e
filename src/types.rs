//! A2A wire schema — tasks, messages, parts, artifacts, agent cards, and the
//! JSON-RPC 2.0 envelopes that carry them.
//!
//! Everything that crosses the wire is defined once here and encoded/decoded
//! through serde. `Part` is a tagged union whose discriminator may be spelled
//! `kind` or `type` on input; output always uses `kind`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Task lifecycle
// ============================================================================

/// The lifecycle state of a task, kebab-case on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Task has been received but not yet started.
    Submitted,
    /// Task is actively being processed.
    Working,
    /// Task requires additional input before it can continue.
    InputRequired,
    /// Task completed successfully.
    Completed,
    /// Task failed.
    Failed,
    /// Task was canceled.
    Canceled,
    /// Task was rejected by the agent.
    Rejected,
    /// Task requires authentication before it can continue.
    AuthRequired,
    /// Unknown state (forward compatibility).
    Unknown,
}

impl TaskState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled | TaskState::Rejected
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
            TaskState::Rejected => "rejected",
            TaskState::AuthRequired => "auth-required",
            TaskState::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One entry in a task's status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// The state at this point in the lifecycle.
    pub state: TaskState,

    /// Optional human-readable note for this transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// ISO-8601 timestamp of when this status was recorded.
    pub timestamp: String,
}

impl TaskStatus {
    /// Build a status stamped with the current UTC time.
    pub fn now(state: TaskState, message: Option<String>) -> Self {
        Self {
            state,
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A task — the unit of work offered across the agent boundary.
///
/// Invariants maintained by the task manager: created in `submitted`,
/// `history` is append-only with `history.last() == status`, and no
/// transition ever leaves a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque task identifier.
    pub id: String,

    /// Groups related tasks (typically a conversation thread).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Current status; always equal to the last history entry.
    pub status: TaskStatus,

    /// Ordered, append-only status history.
    pub history: Vec<TaskStatus>,

    /// Artifacts produced so far.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    /// Free-form metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ============================================================================
// Messages & parts
// ============================================================================

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user / client side.
    User,
    /// Message from an agent.
    Agent,
    /// System-injected message.
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A content part within a message or artifact.
///
/// Wire format (output):
/// - `{"kind": "text", "text": "hello"}`
/// - `{"kind": "data", "data": {...}}`
/// - `{"kind": "file", "uri": "data:application/json;base64,...", "mimeType": "application/json"}`
/// - `{"kind": "error", "error": "what went wrong"}`
///
/// On input the discriminator may be `kind` or `type`; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// Plain text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Structured JSON payload.
    Data {
        /// Arbitrary structured data.
        data: serde_json::Value,
    },
    /// Content referenced (or inlined) by URI.
    File {
        /// The file URI; `data:` URIs carry inline bodies.
        uri: String,
        /// MIME type of the referenced content.
        #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
        mime_type: Option<String>,
    },
    /// Error information forwarded as content.
    Error {
        /// Description of the error.
        error: String,
    },
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Create a data part.
    pub fn data(data: serde_json::Value) -> Self {
        Part::Data { data }
    }

    /// Create a file part from a URI.
    pub fn file(uri: impl Into<String>, mime_type: Option<String>) -> Self {
        Part::File {
            uri: uri.into(),
            mime_type,
        }
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let value = serde_json::Value::deserialize(deserializer)?;
        let discriminator = value
            .get("kind")
            .or_else(|| value.get("type"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| D::Error::custom("part is missing a 'kind' or 'type' discriminator"))?;

        match discriminator {
            "text" => {
                let text = value
                    .get("text")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| D::Error::custom("text part is missing 'text'"))?;
                Ok(Part::Text {
                    text: text.to_string(),
                })
            }
            "data" => {
                let data = value
                    .get("data")
                    .cloned()
                    .ok_or_else(|| D::Error::custom("data part is missing 'data'"))?;
                Ok(Part::Data { data })
            }
            "file" => {
                // Inline image parts from older clients spell the URI as
                // `imageUrl`; accept both.
                let uri = value
                    .get("uri")
                    .or_else(|| value.get("imageUrl"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| D::Error::custom("file part is missing 'uri'"))?;
                let mime_type = value
                    .get("mimeType")
                    .and_then(|v| v.as_str())
                    .map(String::from);
                Ok(Part::File {
                    uri: uri.to_string(),
                    mime_type,
                })
            }
            "error" => {
                let error = value
                    .get("error")
                    .map(|v| match v.as_str() {
                        Some(s) => s.to_string(),
                        None => v.to_string(),
                    })
                    .ok_or_else(|| D::Error::custom("error part is missing 'error'"))?;
                Ok(Part::Error { error })
            }
            other => Err(D::Error::custom(format!(
                "unknown part discriminator '{}' — expected one of: text, data, file, error",
                other
            ))),
        }
    }
}

/// One turn of A2A conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    pub message_id: String,

    /// Who sent this message.
    pub role: Role,

    /// Content parts; never empty for a valid message.
    pub parts: Vec<Part>,

    /// Task this message continues, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Context this message belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Free-form metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    /// Create a user message containing a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            parts: vec![Part::text(text)],
            task_id: None,
            context_id: None,
            metadata: None,
        }
    }

    /// Create an agent message containing a single text part.
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            role: Role::Agent,
            parts: vec![Part::text(text)],
            task_id: None,
            context_id: None,
            metadata: None,
        }
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// A produced result, referenceable after task completion.
///
/// The content is either inline parts or a URI; inline transport across the
/// wire uses `data:` URIs (see [`crate::utils::artifact`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique artifact identifier.
    pub artifact_id: String,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// MIME type of the artifact body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// The artifact body.
    #[serde(flatten)]
    pub content: ArtifactContent,
}

/// The body of an artifact — inline parts or a URI reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactContent {
    /// Inline content parts.
    Parts {
        /// The content parts.
        parts: Vec<Part>,
    },
    /// Content referenced by URI (`data:` URIs carry the body inline).
    Uri {
        /// The content URI.
        uri: String,
    },
}

// ============================================================================
// Agent card
// ============================================================================

/// Protocol version served in every agent card.
pub const PROTOCOL_VERSION: &str = "0.3.0";

/// A worker's self-description, served at `/.well-known/agent-card.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Protocol version — always "0.3.0".
    pub protocol_version: String,

    /// Human-readable agent name.
    pub name: String,

    /// What the agent does.
    pub description: String,

    /// Base URL of the agent.
    pub url: String,

    /// Declared transport bindings.
    pub transports: Vec<AgentTransport>,

    /// Capability flags.
    pub capabilities: AgentCapabilities,

    /// MIME types accepted as input.
    pub default_input_modes: Vec<String>,

    /// MIME types produced as output.
    pub default_output_modes: Vec<String>,

    /// Skills the agent advertises.
    pub skills: Vec<AgentSkill>,

    /// Provider/organization block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
}

/// A transport binding advertised by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTransport {
    /// Transport type identifier (e.g. "JSONRPC").
    pub transport: String,

    /// Endpoint URL for this transport.
    pub url: String,

    /// Protocol version spoken over this transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
}

/// Capability flags for an agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Whether the agent streams incremental updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,

    /// Whether the agent accepts non-text input modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_modal: Option<bool>,
}

/// A skill advertised in an agent card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Unique skill identifier.
    pub id: String,

    /// Human-readable skill name.
    pub name: String,

    /// What the skill does.
    pub description: String,

    /// Categorization tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Provider/organization information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProvider {
    /// Organization name.
    pub organization: String,

    /// Organization URL.
    pub url: String,
}

/// Payload returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Always "healthy" while the process serves requests.
    pub status: String,

    /// ISO-8601 timestamp of the probe.
    pub timestamp: String,

    /// Transport identifier — "json-rpc-2.0".
    pub transport: String,

    /// RPC methods this agent serves.
    pub methods: Vec<String>,
}

// ============================================================================
// JSON-RPC 2.0 envelopes
// ============================================================================

/// A JSON-RPC 2.0 request/notification id: string, number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// String identifier.
    String(String),
    /// Numeric identifier.
    Number(i64),
    /// Null (notification — no response expected).
    Null,
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::String(s) => write!(f, "{}", s),
            JsonRpcId::Number(n) => write!(f, "{}", n),
            JsonRpcId::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version — must be "2.0".
    pub jsonrpc: String,

    /// Request identifier; absent for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,

    /// Method name.
    pub method: String,

    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// A JSON-RPC 2.0 response. Exactly one of `result` / `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version — always "2.0".
    pub jsonrpc: String,

    /// Mirrors the request id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,

    /// Successful result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Error object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: Option<JsonRpcId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Create an error response from a crate [`Error`](crate::error::Error).
    pub fn from_error(id: Option<JsonRpcId>, err: crate::error::Error) -> Self {
        Self::error(id, err.into())
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,

    /// Human-readable error message.
    pub message: String,

    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ============================================================================
// Method parameter / result shapes
// ============================================================================

/// Parameters for `message/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageParams {
    /// The message to deliver.
    pub message: Message,

    /// Continue an existing task instead of creating one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Context the resulting task should belong to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Free-form metadata attached to the task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Result of `message/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResult {
    /// The task that will carry out the work.
    pub task: Task,

    /// Id of the accepted message.
    pub message_id: String,
}

/// Parameters for `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskParams {
    /// The task to retrieve.
    pub task_id: String,
}

/// Parameters for `tasks/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTaskParams {
    /// The task to cancel.
    pub task_id: String,

    /// Optional reason recorded on the canceled status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result wrapper for `tasks/get` and `tasks/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// The task snapshot.
    pub task: Task,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&TaskState::InputRequired).unwrap(),
            "\"input-required\""
        );
        assert_eq!(
            serde_json::to_string(&TaskState::AuthRequired).unwrap(),
            "\"auth-required\""
        );
        let state: TaskState = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(state, TaskState::Canceled);
    }

    #[test]
    fn terminal_states() {
        for s in [
            TaskState::Completed,
            TaskState::Failed,
            TaskState::Canceled,
            TaskState::Rejected,
        ] {
            assert!(s.is_terminal());
        }
        for s in [
            TaskState::Submitted,
            TaskState::Working,
            TaskState::InputRequired,
            TaskState::AuthRequired,
            TaskState::Unknown,
        ] {
            assert!(!s.is_terminal());
        }
    }

    #[test]
    fn part_round_trips_with_kind() {
        let part = Part::text("hello");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["text"], "hello");

        let back: Part = serde_json::from_value(json).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn part_and_message_constructors() {
        let part = Part::file("https://example.com/x.png", Some("image/png".into()));
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["kind"], "file");
        assert_eq!(json["mimeType"], "image/png");

        let message = Message::agent_text("done");
        assert_eq!(message.role, Role::Agent);
        assert_eq!(message.parts.len(), 1);
    }

    #[test]
    fn part_accepts_type_discriminator() {
        let part: Part =
            serde_json::from_str(r#"{"type": "text", "text": "aliased"}"#).unwrap();
        assert_eq!(part, Part::text("aliased"));

        let part: Part =
            serde_json::from_str(r#"{"type": "data", "data": {"k": 1}}"#).unwrap();
        assert_eq!(part, Part::data(serde_json::json!({"k": 1})));
    }

    #[test]
    fn file_part_accepts_image_url_alias() {
        let part: Part = serde_json::from_str(
            r#"{"kind": "file", "imageUrl": "https://example.com/x.png", "mimeType": "image/png"}"#,
        )
        .unwrap();
        match part {
            Part::File { uri, mime_type } => {
                assert_eq!(uri, "https://example.com/x.png");
                assert_eq!(mime_type.as_deref(), Some("image/png"));
            }
            other => panic!("expected file part, got {:?}", other),
        }
    }

    #[test]
    fn part_rejects_unknown_discriminator() {
        let result: Result<Part, _> = serde_json::from_str(r#"{"kind": "video", "uri": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn artifact_content_inline_or_uri() {
        let inline = Artifact {
            artifact_id: "a1".into(),
            name: None,
            mime_type: None,
            content: ArtifactContent::Parts {
                parts: vec![Part::text("body")],
            },
        };
        let json = serde_json::to_value(&inline).unwrap();
        assert!(json.get("parts").is_some());
        assert!(json.get("uri").is_none());

        let by_uri: Artifact = serde_json::from_value(serde_json::json!({
            "artifactId": "a2",
            "uri": "data:application/json;base64,e30=",
        }))
        .unwrap();
        assert!(matches!(by_uri.content, ArtifactContent::Uri { .. }));
    }

    #[test]
    fn jsonrpc_id_untagged() {
        let s: JsonRpcId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(s, JsonRpcId::String("abc".into()));
        let n: JsonRpcId = serde_json::from_str("42").unwrap();
        assert_eq!(n, JsonRpcId::Number(42));
        let null: JsonRpcId = serde_json::from_str("null").unwrap();
        assert_eq!(null, JsonRpcId::Null);
    }

    #[test]
    fn response_never_carries_both_result_and_error() {
        let ok = JsonRpcResponse::success(Some(JsonRpcId::Number(1)), serde_json::json!({}));
        assert!(ok.result.is_some() && ok.error.is_none());

        let err = JsonRpcResponse::error(
            Some(JsonRpcId::Number(1)),
            JsonRpcError {
                code: -32600,
                message: "bad".into(),
                data: None,
            },
        );
        assert!(err.result.is_none() && err.error.is_some());
    }

    #[test]
    fn send_message_params_wire_shape() {
        let params: SendMessageParams = serde_json::from_value(serde_json::json!({
            "message": {
                "messageId": "m1",
                "role": "user",
                "parts": [{"kind": "text", "text": "analyze repository: octo/site"}],
            },
            "contextId": "conv-1",
        }))
        .unwrap();
        assert_eq!(params.context_id.as_deref(), Some("conv-1"));
        assert_eq!(params.message.role, Role::User);
    }
}
