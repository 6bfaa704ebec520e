//! Server half — task persistence, the task state machine, the executor
//! contract, and the axum JSON-RPC endpoint.

pub mod agent_executor;
pub mod request_handler;
pub mod router;
pub mod task_manager;
pub mod task_store;

pub use agent_executor::{AgentExecutor, CancelHandle, CancelRegistry, RequestContext};
pub use request_handler::A2aRequestHandler;
pub use router::a2a_router;
pub use task_manager::{TaskManager, UpdateStatus};
pub use task_store::{InMemoryTaskStore, TaskStore};
