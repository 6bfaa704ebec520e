//! Worker agents — repository discovery, analysis, and relationship mapping.
//!
//! Each worker is an [`AgentExecutor`](crate::server::AgentExecutor) that
//! parses text commands into a [`WorkerCommand`] and calls through the
//! [`RepositoryProvider`] seam. The real code-hosting/analysis logic lives
//! behind that trait; [`SampleCatalog`] is the in-process stand-in.

pub mod analysis;
pub mod command;
pub mod discovery;
pub mod provider;
pub mod relationship;

pub use analysis::AnalysisExecutor;
pub use command::{parse_command, WorkerCommand};
pub use discovery::DiscoveryExecutor;
pub use provider::{RepositoryDetails, RepositoryProvider, RepositorySummary, SampleCatalog};
pub use relationship::RelationshipExecutor;
