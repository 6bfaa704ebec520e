//! The LLM contract: an opaque `chat(messages, tools) → {content, tool_calls}`
//! capability.
//!
//! The model itself is an external collaborator. [`ChatModel`] is the seam;
//! [`HttpChatModel`] binds it to an OpenAI-compatible chat-completions
//! endpoint, and tests substitute scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Role of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instruction turn injected by the orchestrator.
    System,
    /// The user's question.
    User,
    /// A model turn (possibly carrying tool calls).
    Assistant,
    /// A tool result turn.
    Tool,
}

/// One turn in the model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Turn role.
    pub role: ChatRole,

    /// Text content. Empty for pure tool-call turns.
    pub content: String,

    /// For `Tool` turns: which call this result answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// For `Assistant` turns: the calls the model made.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    /// A system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    /// An assistant turn echoing the model's tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls,
        }
    }

    /// A tool-result turn answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: Vec::new(),
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Model-assigned call id; tool results echo it back.
    pub id: String,

    /// Tool name.
    pub name: String,

    /// Parsed JSON arguments.
    pub arguments: Value,
}

/// A tool offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,

    /// What the tool does.
    pub description: String,

    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// The model's answer to one turn.
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    /// Text content, when the model answered directly.
    pub content: Option<String>,

    /// Tool calls, when the model wants work done first.
    pub tool_calls: Vec<ToolCall>,
}

/// Opaque chat capability.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one model turn over the conversation so far.
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatTurn>;
}

/// [`ChatModel`] bound to an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpChatModel {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpChatModel {
    /// Create a model handle.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }

    /// Read `LLM_BASE_URL`, `LLM_API_KEY`, and `LLM_MODEL` from the
    /// environment.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("LLM_BASE_URL")
            .map_err(|_| Error::Orchestration("LLM_BASE_URL is not set".to_string()))?;
        let api_key = std::env::var("LLM_API_KEY").ok();
        let model =
            std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Ok(Self::new(base_url, api_key, model))
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ChatTurn> {
        let wire_messages: Vec<Value> = messages.iter().map(wire_message).collect();
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": wire_messages,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(wire_tool).collect());
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut request = self.http.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Orchestration(format!("model request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Orchestration(format!(
                "model returned HTTP {}: {}",
                status, body
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::Orchestration(format!("invalid model response: {}", e)))?;
        parse_completion(&value)
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    let role = match message.role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::Tool => "tool",
    };
    let mut wire = serde_json::json!({ "role": role, "content": message.content });
    if let Some(ref id) = message.tool_call_id {
        wire["tool_call_id"] = Value::String(id.clone());
    }
    if !message.tool_calls.is_empty() {
        wire["tool_calls"] = Value::Array(
            message
                .tool_calls
                .iter()
                .map(|call| {
                    serde_json::json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        },
                    })
                })
                .collect(),
        );
    }
    wire
}

fn wire_tool(tool: &ToolSpec) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        },
    })
}

fn parse_completion(value: &Value) -> Result<ChatTurn> {
    let message = value
        .pointer("/choices/0/message")
        .ok_or_else(|| Error::Orchestration("model response has no choices".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(String::from);

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(|c| c.as_array()) {
        for call in calls {
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let name = call
                .pointer("/function/name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::Orchestration("tool call without a name".to_string()))?
                .to_string();
            // Arguments arrive as a JSON-encoded string.
            let raw = call
                .pointer("/function/arguments")
                .and_then(|v| v.as_str())
                .unwrap_or("{}");
            let arguments: Value = serde_json::from_str(raw)
                .map_err(|e| Error::Orchestration(format!("malformed tool arguments: {}", e)))?;
            tool_calls.push(ToolCall {
                id,
                name,
                arguments,
            });
        }
    }

    Ok(ChatTurn {
        content,
        tool_calls,
    })
}
