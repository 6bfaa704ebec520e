//! The orchestrator's tool registry and its mapping onto worker commands.
//!
//! Each tool invocation becomes an outbound `message/send` to a worker base
//! URL carrying a single text part with the command the worker's parser
//! understands.

use serde_json::Value;

use crate::error::{Error, Result};

use super::llm::{ToolCall, ToolSpec};

/// Tool name for repository discovery.
pub const LIST_REPOSITORIES: &str = "list_repositories";

/// Tool name for repository analysis.
pub const GET_REPOSITORY_DETAILS: &str = "get_repository_details";

/// Base URLs of the worker fleet.
#[derive(Debug, Clone)]
pub struct WorkerEndpoints {
    /// Repository discovery worker.
    pub discovery_url: String,

    /// Code analysis worker.
    pub analysis_url: String,

    /// Dependency/relationship worker. Optional: when its card cannot be
    /// fetched the orchestrator degrades instead of failing.
    pub relationship_url: Option<String>,
}

impl WorkerEndpoints {
    /// Conventional localhost fleet (ports 3002/3003/3004).
    pub fn local_defaults() -> Self {
        Self {
            discovery_url: "http://localhost:3002".to_string(),
            analysis_url: "http://localhost:3003".to_string(),
            relationship_url: Some("http://localhost:3004".to_string()),
        }
    }
}

/// Which worker a tool call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerTarget {
    /// The discovery worker.
    Discovery,
    /// The analysis worker.
    Analysis,
}

impl WorkerTarget {
    /// Agent type label used in progress events and result summaries.
    pub fn agent_type(&self) -> &'static str {
        match self {
            WorkerTarget::Discovery => "discovery",
            WorkerTarget::Analysis => "analysis",
        }
    }

    /// Resolve the worker's base URL.
    pub fn base_url<'a>(&self, endpoints: &'a WorkerEndpoints) -> &'a str {
        match self {
            WorkerTarget::Discovery => &endpoints.discovery_url,
            WorkerTarget::Analysis => &endpoints.analysis_url,
        }
    }
}

/// The tool surface registered with the model.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: LIST_REPOSITORIES.to_string(),
            description:
                "List repositories the platform is aware of, optionally filtered by \
                 organization or topic. Call with empty parameters for a full listing."
                    .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "organization": {
                        "type": "string",
                        "description": "Filter to one organization",
                    },
                    "topic": {
                        "type": "string",
                        "description": "Filter to repositories tagged with this topic",
                    },
                },
            }),
        },
        ToolSpec {
            name: GET_REPOSITORY_DETAILS.to_string(),
            description: "Analyze one repository in depth and return its details."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "owner": { "type": "string", "description": "Repository owner" },
                    "name": { "type": "string", "description": "Repository name" },
                },
                "required": ["owner", "name"],
            }),
        },
    ]
}

/// Translate a model tool call into the target worker and its text command.
pub fn command_for_call(call: &ToolCall) -> Result<(WorkerTarget, String)> {
    match call.name.as_str() {
        LIST_REPOSITORIES => {
            let mut command = String::from("list repositories");
            if let Some(org) = str_arg(&call.arguments, "organization") {
                command.push_str(&format!(", organization: {}", org));
            }
            if let Some(topic) = str_arg(&call.arguments, "topic") {
                command.push_str(&format!(", topic: {}", topic));
            }
            Ok((WorkerTarget::Discovery, command))
        }
        GET_REPOSITORY_DETAILS => {
            let owner = str_arg(&call.arguments, "owner").ok_or_else(|| {
                Error::Orchestration("get_repository_details requires 'owner'".to_string())
            })?;
            let name = str_arg(&call.arguments, "name").ok_or_else(|| {
                Error::Orchestration("get_repository_details requires 'name'".to_string())
            })?;
            Ok((
                WorkerTarget::Analysis,
                format!("analyze repository: {}/{}", owner, name),
            ))
        }
        other => Err(Error::Orchestration(format!("unknown tool: {}", other))),
    }
}

fn str_arg(arguments: &Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}
