//! Dependency/relationship worker process (default port 3004).

use std::sync::Arc;

use devmesh::builders::AgentCardBuilder;
use devmesh::config::{AgentKind, Config};
use devmesh::server::{a2a_router, A2aRequestHandler, InMemoryTaskStore, TaskManager};
use devmesh::workers::{RelationshipExecutor, SampleCatalog};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env(AgentKind::RelationshipWorker);
    if config.enable_logging {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let card = AgentCardBuilder::new(config.agent.name())
        .description("Maps dependency relationships between repositories")
        .url(&config.base_url)
        .skill(
            "map-dependencies",
            "Dependency mapping",
            "Builds the dependency graph for a repository",
            &["relationships", "graph"],
        )
        .build()?;

    let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
    let executor = Arc::new(RelationshipExecutor::new(Arc::new(SampleCatalog::new())));
    let handler = Arc::new(A2aRequestHandler::new(executor, tasks));

    let app = a2a_router(handler, card);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "relationship worker listening");
    axum::serve(listener, app).await?;
    Ok(())
}
