//! Task store — persistence layer behind the task manager.
//!
//! The [`InMemoryTaskStore`] is the reference implementation; durable stores
//! must preserve the per-task ordering of status history.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::Task;

/// Trait for persisting and retrieving tasks.
///
/// All methods take `&self` and use interior mutability for thread safety.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Save or overwrite a task.
    async fn save(&self, task: Task) -> Result<()>;

    /// Retrieve a task by id; `None` if unknown.
    async fn get(&self, task_id: &str) -> Result<Option<Task>>;

    /// Delete a task by id. Silently succeeds when the task is unknown.
    async fn delete(&self, task_id: &str) -> Result<()>;

    /// List tasks belonging to a context, in creation order.
    async fn list_by_context(&self, context_id: &str) -> Result<Vec<Task>>;
}

/// In-memory task store backed by a `HashMap`.
///
/// Suitable for development, tests, and short-lived agent processes; data is
/// lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<String, Task>>>,
    /// Insertion order for deterministic listing.
    insertion_order: Arc<RwLock<Vec<String>>>,
}

impl InMemoryTaskStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: Task) -> Result<()> {
        let task_id = task.id.clone();
        let mut tasks = self.tasks.write().await;
        let is_new = !tasks.contains_key(&task_id);
        tasks.insert(task_id.clone(), task);

        if is_new {
            let mut order = self.insertion_order.write().await;
            order.push(task_id.clone());
        }

        debug!(task_id = %task_id, is_new = is_new, "task saved");
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(task_id).cloned())
    }

    async fn delete(&self, task_id: &str) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.remove(task_id).is_some() {
            let mut order = self.insertion_order.write().await;
            order.retain(|id| id != task_id);
            debug!(task_id = %task_id, "task deleted");
        } else {
            warn!(task_id = %task_id, "attempted to delete unknown task");
        }
        Ok(())
    }

    async fn list_by_context(&self, context_id: &str) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let order = self.insertion_order.read().await;
        Ok(order
            .iter()
            .filter_map(|id| tasks.get(id))
            .filter(|t| t.context_id.as_deref() == Some(context_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskState, TaskStatus};

    fn make_task(id: &str, ctx: Option<&str>) -> Task {
        let status = TaskStatus::now(TaskState::Submitted, None);
        Task {
            id: id.to_string(),
            context_id: ctx.map(String::from),
            status: status.clone(),
            history: vec![status],
            artifacts: Vec::new(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn save_and_get() {
        let store = InMemoryTaskStore::new();
        store.save(make_task("t1", None)).await.unwrap();
        assert!(store.get("t1").await.unwrap().is_some());
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_by_context_preserves_creation_order() {
        let store = InMemoryTaskStore::new();
        store.save(make_task("t1", Some("c1"))).await.unwrap();
        store.save(make_task("t2", Some("c2"))).await.unwrap();
        store.save(make_task("t3", Some("c1"))).await.unwrap();

        let listed = store.list_by_context("c1").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryTaskStore::new();
        store.save(make_task("t1", None)).await.unwrap();
        store.delete("t1").await.unwrap();
        store.delete("t1").await.unwrap();
        assert!(store.get("t1").await.unwrap().is_none());
    }
}
