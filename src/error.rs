//! Error types — JSON-RPC error codes + platform domain errors.
//!
//! Protocol errors carry the standard JSON-RPC 2.0 codes (-32700 through
//! -32603). Task-level domain errors additionally carry a stable string code
//! in the error `data` payload (`TASK_NOT_FOUND`, `TASK_NOT_CANCELABLE`,
//! `TASK_ALREADY_CANCELED`, `UNSUPPORTED_MESSAGE_FORMAT`) so callers can
//! branch without parsing message text.

use crate::types::JsonRpcError;

// ---------------------------------------------------------------------------
// Standard JSON-RPC 2.0 error codes
// ---------------------------------------------------------------------------

/// Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;

/// The JSON sent is not a valid Request object.
pub const INVALID_REQUEST: i64 = -32600;

/// The method does not exist / is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid method parameter(s). Also used for unknown task ids — clients in
/// the field expect -32602 there, so the numeric code is kept and the domain
/// code rides in `error.data.code`.
pub const INVALID_PARAMS: i64 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// Domain error codes
// ---------------------------------------------------------------------------

/// The task cannot be canceled (or otherwise updated) in its current state.
pub const TASK_NOT_CANCELABLE: i64 = -32002;

/// The message contained no part the agent can process.
pub const UNSUPPORTED_MESSAGE_FORMAT: i64 = -32005;

/// Stable string codes carried in `error.data.code`.
pub mod code {
    pub const TASK_NOT_FOUND: &str = "TASK_NOT_FOUND";
    pub const TASK_NOT_CANCELABLE: &str = "TASK_NOT_CANCELABLE";
    pub const TASK_ALREADY_CANCELED: &str = "TASK_ALREADY_CANCELED";
    pub const UNSUPPORTED_MESSAGE_FORMAT: &str = "UNSUPPORTED_MESSAGE_FORMAT";
}

// ---------------------------------------------------------------------------
// Error enum
// ---------------------------------------------------------------------------

/// Unified error type for protocol, task, transport, and orchestration
/// failures.
///
/// Protocol and task variants map onto JSON-RPC error objects via
/// [`Error::code`] and `From<Error> for JsonRpcError`. Transport and
/// orchestration variants are client/driver side and map to -32603 when they
/// must cross the wire.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid JSON payload (code -32700).
    #[error("Parse error: {message}")]
    Parse {
        /// Human-readable error message.
        message: String,
    },

    /// Request envelope validation failed (code -32600).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
    },

    /// Method not found (code -32601).
    #[error("Method not found: {message}")]
    MethodNotFound {
        /// Human-readable error message.
        message: String,
    },

    /// Invalid parameters (code -32602).
    #[error("Invalid params: {message}")]
    InvalidParams {
        /// Human-readable error message.
        message: String,
    },

    /// Internal error (code -32603).
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },

    /// The referenced task does not exist (wire code -32602, domain code
    /// `TASK_NOT_FOUND`).
    #[error("Task not found: {task_id}")]
    TaskNotFound {
        /// The unknown task id.
        task_id: String,
    },

    /// The task is in a terminal state and cannot transition (wire code
    /// -32002, domain code `TASK_NOT_CANCELABLE`).
    #[error("Task not cancelable: {message}")]
    TaskNotCancelable {
        /// Human-readable error message.
        message: String,
    },

    /// The task was already canceled (wire code -32002, domain code
    /// `TASK_ALREADY_CANCELED`).
    #[error("Task already canceled: {task_id}")]
    TaskAlreadyCanceled {
        /// The canceled task id.
        task_id: String,
    },

    /// No part of the message is addressable by the agent (wire code -32005,
    /// domain code `UNSUPPORTED_MESSAGE_FORMAT`).
    #[error("Unsupported message format: {message}")]
    UnsupportedMessageFormat {
        /// Human-readable error message.
        message: String,
    },

    // -- Client/driver-side errors (not wire codes) --
    /// Transport-level failure (connection refused/reset, request failed).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Non-2xx HTTP response.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Malformed JSON received from a remote peer.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// A JSON-RPC error response was received from a remote agent.
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// Orchestration failure (LLM turn failed, malformed tool call, worker
    /// branch failed).
    #[error("Orchestration error: {0}")]
    Orchestration(String),

    /// No successful poll response within the liveness window.
    #[error("Task timed out - agent not responding")]
    AgentNotResponding,
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a `Parse` error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an `InvalidRequest` error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a `MethodNotFound` error.
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::MethodNotFound {
            message: message.into(),
        }
    }

    /// Create an `InvalidParams` error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a `TaskNotFound` error for the given id.
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    /// Create a `TaskNotCancelable` error.
    pub fn task_not_cancelable(message: impl Into<String>) -> Self {
        Self::TaskNotCancelable {
            message: message.into(),
        }
    }

    /// Returns the JSON-RPC error code for this variant.
    ///
    /// Client/driver-side variants map to -32603 (internal error); a relayed
    /// `JsonRpc` error keeps its original code.
    pub fn code(&self) -> i64 {
        match self {
            Error::Parse { .. } => PARSE_ERROR,
            Error::InvalidRequest { .. } => INVALID_REQUEST,
            Error::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Error::InvalidParams { .. } => INVALID_PARAMS,
            Error::Internal { .. } => INTERNAL_ERROR,
            Error::TaskNotFound { .. } => INVALID_PARAMS,
            Error::TaskNotCancelable { .. } | Error::TaskAlreadyCanceled { .. } => {
                TASK_NOT_CANCELABLE
            }
            Error::UnsupportedMessageFormat { .. } => UNSUPPORTED_MESSAGE_FORMAT,
            Error::JsonRpc { code, .. } => *code,
            Error::Transport(_)
            | Error::Timeout(_)
            | Error::Http { .. }
            | Error::InvalidJson(_)
            | Error::Orchestration(_)
            | Error::AgentNotResponding => INTERNAL_ERROR,
        }
    }

    /// Returns the stable domain code string for task-level errors.
    pub fn domain_code(&self) -> Option<&'static str> {
        match self {
            Error::TaskNotFound { .. } => Some(code::TASK_NOT_FOUND),
            Error::TaskNotCancelable { .. } => Some(code::TASK_NOT_CANCELABLE),
            Error::TaskAlreadyCanceled { .. } => Some(code::TASK_ALREADY_CANCELED),
            Error::UnsupportedMessageFormat { .. } => Some(code::UNSUPPORTED_MESSAGE_FORMAT),
            _ => None,
        }
    }

    /// Whether a client should retry the operation that produced this error.
    ///
    /// Only transport-class failures are retryable; JSON-RPC level errors are
    /// authoritative answers from the peer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Timeout(_) | Error::Http { status: 502..=504, .. }
        )
    }
}

impl From<Error> for JsonRpcError {
    fn from(err: Error) -> Self {
        let code = err.code();
        let message = err.to_string();
        let data = err
            .domain_code()
            .map(|c| serde_json::json!({ "code": c }))
            .or_else(|| match &err {
                Error::JsonRpc { data, .. } => data.clone(),
                _ => None,
            });
        JsonRpcError {
            code,
            message,
            data,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse {
            message: err.to_string(),
        }
    }
}
