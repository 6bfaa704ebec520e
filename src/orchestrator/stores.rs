//! Session checkpoints and conversation persistence.
//!
//! Both stores are external collaborators behind traits; the in-memory
//! implementations serve tests and single-process deployments. Checkpointing
//! is best-effort by contract — callers log failures and keep going.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::Role;

/// Best-effort persistence of opaque orchestration state blobs.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Save (or overwrite) the state blob for a session.
    async fn save(&self, session_id: &str, state: Value) -> Result<()>;

    /// Load a session's state blob, if present.
    async fn load(&self, session_id: &str) -> Result<Option<Value>>;
}

/// In-memory checkpoint store.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    states: RwLock<HashMap<String, Value>>,
}

impl InMemoryCheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, session_id: &str, state: Value) -> Result<()> {
        self.states
            .write()
            .await
            .insert(session_id.to_string(), state);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Value>> {
        Ok(self.states.read().await.get(session_id).cloned())
    }
}

/// One persisted conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Who said it.
    pub role: Role,

    /// The message text.
    pub content: String,

    /// The query that produced it, for assistant turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,

    /// ISO-8601 timestamp.
    pub timestamp: String,
}

impl StoredMessage {
    /// An assistant turn stamped now.
    pub fn assistant(content: impl Into<String>, query_id: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            query_id: Some(query_id.into()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Conversation storage. Clients that join late recover answers from here,
/// so the orchestrator persists the assistant turn *before* emitting the
/// terminal `query:completed` event.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a message to a conversation.
    async fn append(&self, conversation_id: &str, message: StoredMessage) -> Result<()>;

    /// Full history of a conversation, oldest first.
    async fn history(&self, conversation_id: &str) -> Result<Vec<StoredMessage>>;
}

/// In-memory conversation store.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Vec<StoredMessage>>>,
}

impl InMemoryConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, conversation_id: &str, message: StoredMessage) -> Result<()> {
        self.conversations
            .write()
            .await
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn history(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}
