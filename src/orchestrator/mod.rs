//! Orchestrator — tool-driven supervision of worker agents.
//!
//! The supervisor plans with an LLM, dispatches tool calls as A2A messages,
//! drives each remote task to completion with a liveness-checked polling
//! loop, and fans progress out per conversation. A legacy in-process
//! message-router path remains for single-process deployments.

pub mod llm;
pub mod polling;
pub mod router;
pub mod stores;
pub mod supervisor;
pub mod tools;

pub use llm::{ChatMessage, ChatModel, ChatRole, ChatTurn, HttpChatModel, ToolCall, ToolSpec};
pub use polling::{poll_until_terminal, PollOptions, ProgressContext};
pub use router::{
    await_agent_completions, spawn_router_agent, CompletionOutcome, MessageRouter, RouterMessage,
};
pub use stores::{
    CheckpointStore, ConversationStore, InMemoryCheckpointStore, InMemoryConversationStore,
    StoredMessage,
};
pub use supervisor::{Orchestrator, Query, QueryOutcome, QueryStatus};
pub use tools::{command_for_call, tool_specs, WorkerEndpoints, WorkerTarget};
