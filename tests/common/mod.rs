//! Shared fixtures for the integration suite.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;

use devmesh::builders::AgentCardBuilder;
use devmesh::server::{a2a_router, A2aRequestHandler, AgentExecutor, InMemoryTaskStore, TaskManager};

/// Serve a router on an ephemeral port; returns the base URL.
pub async fn spawn_app(app: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

/// Spin up a full worker agent around the given executor.
pub async fn spawn_worker(
    name: &str,
    executor: Arc<dyn AgentExecutor>,
) -> (String, Arc<A2aRequestHandler>, JoinHandle<()>) {
    let tasks = Arc::new(TaskManager::new(Arc::new(InMemoryTaskStore::new())));
    let handler = Arc::new(A2aRequestHandler::new(executor, tasks));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let card = AgentCardBuilder::new(name)
        .description("integration test worker")
        .url(format!("http://{}", addr))
        .build()
        .unwrap();

    let app = a2a_router(Arc::clone(&handler), card);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), handler, handle)
}
