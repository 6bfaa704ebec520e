//! Repository discovery worker process (default port 3002).

use std::sync::Arc;

use devmesh::builders::AgentCardBuilder;
use devmesh::config::{AgentKind, Config};
use devmesh::server::{a2a_router, A2aRequestHandler, InMemoryTaskStore, TaskManager};
use devmesh::workers::{DiscoveryExecutor, SampleCatalog};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env(AgentKind::DiscoveryWorker);
    if config.enable_logging {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let card = AgentCardBuilder::new(config.agent.name())
        .description("Finds repositories across configured organizations")
        .url(&config.base_url)
        .skill(
            "discover",
            "Repository discovery",
            "Lists known repositories, filtered by organization or topic",
            &["discovery", "repositories"],
        )
        .build()?;

    let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
    let executor = Arc::new(DiscoveryExecutor::new(Arc::new(SampleCatalog::new())));
    let handler = Arc::new(A2aRequestHandler::new(executor, tasks));

    let app = a2a_router(handler, card);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "discovery worker listening");
    axum::serve(listener, app).await?;
    Ok(())
}
