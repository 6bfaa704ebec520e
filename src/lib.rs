//! # devmesh — a multi-agent A2A runtime for repository intelligence
//!
//! A supervising orchestrator decomposes user queries into work for
//! specialized worker agents (repository discovery, code analysis,
//! dependency/relationship mapping), carries the work over JSON-RPC 2.0
//! between agents, drives it to completion, and streams progress back to
//! interactive clients per conversation.
//!
//! ## Architecture
//!
//! - [`types`] — the wire schema: [`types::Task`], [`types::Message`],
//!   [`types::Part`], [`types::Artifact`], [`types::AgentCard`], and the
//!   JSON-RPC envelopes.
//! - [`server`] — the agent side: [`server::TaskManager`] (the authoritative
//!   state machine), [`server::TaskStore`], the [`server::AgentExecutor`]
//!   contract with cooperative cancellation, and [`server::a2a_router`]
//!   exposing `POST /` (JSON-RPC), the agent card, and `/health`.
//! - [`client`] — the outbound side: [`client::A2aClient`] with card
//!   discovery + TTL caching, a bounded keep-alive connection pool,
//!   monotonic request ids, and exponential-backoff retry.
//! - [`orchestrator`] — tool-driven supervision: the
//!   [`orchestrator::ChatModel`] seam, the polling loop with liveness
//!   detection, checkpoint/conversation stores, and the legacy in-process
//!   message router.
//! - [`progress`] — per-conversation fan-out of lifecycle events plus the
//!   WebSocket endpoint clients subscribe through.
//! - [`workers`] — the three worker executors and the
//!   [`workers::RepositoryProvider`] seam hiding real code-hosting logic.
//!
//! ## Quick start: a worker agent
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use devmesh::builders::AgentCardBuilder;
//! use devmesh::server::{a2a_router, A2aRequestHandler, InMemoryTaskStore, TaskManager};
//! use devmesh::workers::{DiscoveryExecutor, SampleCatalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let card = AgentCardBuilder::new("discovery-worker")
//!         .description("Finds repositories across configured organizations")
//!         .url("http://localhost:3002")
//!         .build()?;
//!
//!     let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
//!     let executor = Arc::new(DiscoveryExecutor::new(Arc::new(SampleCatalog::new())));
//!     let handler = Arc::new(A2aRequestHandler::new(executor, tasks));
//!
//!     let app = a2a_router(handler, card);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3002").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Quick start: calling an agent
//!
//! ```rust,ignore
//! use devmesh::client::A2aClient;
//!
//! let client = A2aClient::new();
//! let card = client.get_agent_card("http://localhost:3002", false).await?;
//! let sent = client.send_text("http://localhost:3002", "list repositories", None).await?;
//! let task = client.get_task("http://localhost:3002", &sent.task.id).await?;
//! ```

pub mod builders;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod server;
pub mod types;
pub mod utils;
pub mod workers;

/// Re-exports of the types most call sites need.
pub mod prelude {
    pub use crate::builders::AgentCardBuilder;
    pub use crate::client::{A2aClient, ClientOptions};
    pub use crate::config::{AgentKind, Config};
    pub use crate::error::{Error, Result};
    pub use crate::orchestrator::{ChatModel, Orchestrator, WorkerEndpoints};
    pub use crate::progress::{ProgressBus, ProgressEvent, ProgressEventType};
    pub use crate::server::{
        a2a_router, A2aRequestHandler, AgentExecutor, InMemoryTaskStore, TaskManager,
    };
    pub use crate::types::{
        AgentCard, Artifact, Message, Part, Role, Task, TaskState, TaskStatus,
    };
}

pub use error::{Error, Result};
