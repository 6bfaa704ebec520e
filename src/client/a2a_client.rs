//! High-level inter-agent client.
//!
//! Every method takes the target agent's base URL; one client instance talks
//! to the whole fleet over a shared connection pool. Agent cards are fetched
//! from the well-known path and TTL-cached.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{
    AgentCard, CancelTaskParams, GetTaskParams, Message, SendMessageParams, SendMessageResult,
    Task, TaskResult,
};

use super::card_cache::CardCache;
use super::transport::{ClientOptions, JsonRpcTransport};

/// Well-known path for agent card discovery.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// Client for calling remote agents over A2A JSON-RPC.
#[derive(Clone)]
pub struct A2aClient {
    transport: Arc<JsonRpcTransport>,
    cards: Arc<CardCache>,
}

impl A2aClient {
    /// Create a client with default options.
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    /// Create a client with explicit options.
    pub fn with_options(options: ClientOptions) -> Self {
        let cards = Arc::new(CardCache::new(options.agent_card_cache_ttl));
        Self {
            transport: Arc::new(JsonRpcTransport::new(options)),
            cards,
        }
    }

    /// Send a message to an agent (`message/send`).
    pub async fn send_message(
        &self,
        base_url: &str,
        params: SendMessageParams,
    ) -> Result<SendMessageResult> {
        let result = self
            .transport
            .call(base_url, "message/send", serde_json::to_value(&params)?)
            .await?;
        parse_result(result)
    }

    /// Convenience: send a single-text-part user message.
    pub async fn send_text(
        &self,
        base_url: &str,
        text: &str,
        context_id: Option<String>,
    ) -> Result<SendMessageResult> {
        let mut message = Message::user_text(text);
        message.context_id = context_id.clone();
        self.send_message(
            base_url,
            SendMessageParams {
                message,
                task_id: None,
                context_id,
                metadata: None,
            },
        )
        .await
    }

    /// Retrieve a task snapshot (`tasks/get`).
    pub async fn get_task(&self, base_url: &str, task_id: &str) -> Result<Task> {
        let params = GetTaskParams {
            task_id: task_id.to_string(),
        };
        let result = self
            .transport
            .call(base_url, "tasks/get", serde_json::to_value(&params)?)
            .await?;
        let TaskResult { task } = parse_result(result)?;
        Ok(task)
    }

    /// Cancel a task (`tasks/cancel`).
    pub async fn cancel_task(
        &self,
        base_url: &str,
        task_id: &str,
        reason: Option<String>,
    ) -> Result<Task> {
        let params = CancelTaskParams {
            task_id: task_id.to_string(),
            reason,
        };
        let result = self
            .transport
            .call(base_url, "tasks/cancel", serde_json::to_value(&params)?)
            .await?;
        let TaskResult { task } = parse_result(result)?;
        Ok(task)
    }

    /// Fetch an agent's card, honoring the TTL cache unless `force_refresh`.
    pub async fn get_agent_card(&self, base_url: &str, force_refresh: bool) -> Result<AgentCard> {
        if !force_refresh {
            if let Some(card) = self.cards.get(base_url).await {
                debug!(base_url = %base_url, "agent card cache hit");
                return Ok(card);
            }
        }

        let url = format!("{}{}", base_url.trim_end_matches('/'), AGENT_CARD_PATH);
        let value = self.transport.get_json(&url).await?;
        let card: AgentCard = serde_json::from_value(value)
            .map_err(|e| Error::InvalidJson(format!("invalid agent card: {}", e)))?;

        self.cards.put(base_url, card.clone()).await;
        Ok(card)
    }

    /// Probe an agent's health endpoint. Any failure reads as unhealthy.
    pub async fn health_check(&self, base_url: &str) -> bool {
        let url = format!("{}/health", base_url.trim_end_matches('/'));
        match self.transport.get_json(&url).await {
            Ok(value) => value.get("status").and_then(|s| s.as_str()) == Some("healthy"),
            Err(e) => {
                debug!(base_url = %base_url, error = %e, "health check failed");
                false
            }
        }
    }

    /// Drop all cached agent cards.
    pub async fn clear_card_cache(&self) {
        self.cards.clear().await;
    }

    /// Release the client's resources: the card cache is emptied and the
    /// transport is shut down, so every subsequent RPC fails fast. Clones of
    /// this client share the same transport and go dark with it.
    pub async fn destroy(&self) {
        debug!("destroying A2A client");
        self.cards.clear().await;
        self.transport.shutdown();
    }
}

impl Default for A2aClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_result<T: serde::de::DeserializeOwned>(result: serde_json::Value) -> Result<T> {
    serde_json::from_value(result)
        .map_err(|e| Error::InvalidJson(format!("failed to decode response result: {}", e)))
}
