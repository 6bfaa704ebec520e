//! Progress bus — per-conversation real-time fan-out of lifecycle events.
//!
//! Best-effort, at-most-once: late joiners miss earlier events, slow
//! consumers may lag and drop. Within one conversation, subscribers see
//! events in emission order; there is no cross-conversation ordering.

pub mod ws;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Per-subscriber buffer; lagging consumers drop oldest events.
const CHANNEL_CAPACITY: usize = 256;

/// The closed set of progress event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEventType {
    /// A worker agent was engaged for a query.
    #[serde(rename = "agent:spawned")]
    AgentSpawned,
    /// A worker's busy/idle state changed.
    #[serde(rename = "agent:status")]
    AgentStatus,
    /// A worker produced a message.
    #[serde(rename = "agent:message")]
    AgentMessage,
    /// A remote task was created.
    #[serde(rename = "task:created")]
    TaskCreated,
    /// A remote task changed state.
    #[serde(rename = "task:updated")]
    TaskUpdated,
    /// Query progress advanced (0..=100).
    #[serde(rename = "query:progress")]
    QueryProgress,
    /// The query reached a terminal state.
    #[serde(rename = "query:completed")]
    QueryCompleted,
    /// An error surfaced to the conversation.
    #[serde(rename = "error")]
    Error,
}

/// One event on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: ProgressEventType,

    /// Conversation this event belongs to.
    pub conversation_id: String,

    /// Query that produced the event, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,

    /// ISO-8601 emission timestamp.
    pub timestamp: String,

    /// Opaque payload.
    pub data: serde_json::Value,
}

impl ProgressEvent {
    /// Build an event stamped with the current UTC time.
    pub fn new(
        event_type: ProgressEventType,
        conversation_id: impl Into<String>,
        query_id: Option<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            conversation_id: conversation_id.into(),
            query_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            data,
        }
    }
}

/// Per-conversation multiplexer over broadcast channels.
#[derive(Debug, Default)]
pub struct ProgressBus {
    channels: RwLock<HashMap<String, broadcast::Sender<ProgressEvent>>>,
}

impl ProgressBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared-handle constructor, the shape the routers and orchestrator take.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Subscribe to a conversation's events from this point forward.
    pub async fn join(&self, conversation_id: &str) -> broadcast::Receiver<ProgressEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(conversation_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to the conversation's subscribers.
    ///
    /// Events for conversations nobody joined are dropped — delivery is
    /// best-effort and late joiners miss history.
    pub async fn publish(&self, event: ProgressEvent) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&event.conversation_id) {
            let delivered = tx.send(event.clone()).unwrap_or(0);
            debug!(
                conversation_id = %event.conversation_id,
                event_type = ?event.event_type,
                subscribers = delivered,
                "progress event published"
            );
        } else {
            debug!(
                conversation_id = %event.conversation_id,
                event_type = ?event.event_type,
                "no subscribers for conversation, event dropped"
            );
        }
    }

    /// Drop channels whose subscribers are all gone.
    pub async fn prune(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }

    /// Number of conversations with a live channel.
    pub async fn conversation_count(&self) -> usize {
        self.channels.read().await.len()
    }
}
