//! Agent executor — the integration point between a worker's domain logic
//! and the task lifecycle.
//!
//! Implementors receive a [`RequestContext`] plus a [`CancelHandle`] and
//! return the artifacts to attach on completion. The request handler owns the
//! surrounding lifecycle: it creates the task, publishes `working`, runs the
//! executor, and publishes `completed` / `failed` / `canceled`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::error::Result;
use crate::types::{Artifact, Message};
use crate::utils::message_text;

/// Context for one agent execution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The task carrying this execution.
    pub task_id: String,

    /// Conversation context, if any.
    pub context_id: Option<String>,

    /// The incoming user message.
    pub message: Message,
}

impl RequestContext {
    /// Extracts the command text: all text parts joined by newlines.
    pub fn user_input(&self) -> String {
        message_text(&self.message, "\n")
    }
}

/// Cooperative cancellation signal for one task.
///
/// Cloneable; all clones observe the same flag. Long-running domain work
/// should either poll [`is_canceled`](Self::is_canceled) between steps or
/// race against [`cancelled`](Self::cancelled) in a `select!`.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelHandle {
    /// Create a fresh, un-canceled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        // notify_waiters only wakes registered waiters, so the future must
        // be enabled before the final flag check to close the race.
        loop {
            if self.is_canceled() {
                return;
            }
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_canceled() {
                return;
            }
            notified.await;
        }
    }
}

/// Tracks the cancel handle of every in-flight task.
#[derive(Default)]
pub struct CancelRegistry {
    handles: Mutex<HashMap<String, CancelHandle>>,
}

impl CancelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh handle for a task, replacing any stale entry.
    pub async fn register(&self, task_id: &str) -> CancelHandle {
        let handle = CancelHandle::new();
        let mut handles = self.handles.lock().await;
        handles.insert(task_id.to_string(), handle.clone());
        handle
    }

    /// Remove a task's handle (on execution exit).
    pub async fn remove(&self, task_id: &str) {
        let mut handles = self.handles.lock().await;
        handles.remove(task_id);
    }

    /// Cancel a task's handle if present. Returns whether a handle existed.
    pub async fn cancel(&self, task_id: &str) -> bool {
        let handles = self.handles.lock().await;
        match handles.get(task_id) {
            Some(handle) => {
                debug!(task_id = %task_id, "aborting in-flight execution");
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight task (shutdown path).
    pub async fn cancel_all(&self) {
        let mut handles = self.handles.lock().await;
        for (task_id, handle) in handles.drain() {
            debug!(task_id = %task_id, "canceling on shutdown");
            handle.cancel();
        }
    }

    /// Ids of all in-flight tasks.
    pub async fn task_ids(&self) -> Vec<String> {
        self.handles.lock().await.keys().cloned().collect()
    }

    /// Number of in-flight tasks.
    pub async fn len(&self) -> usize {
        self.handles.lock().await.len()
    }

    /// Whether no tasks are in flight.
    pub async fn is_empty(&self) -> bool {
        self.handles.lock().await.is_empty()
    }
}

/// Domain logic of one worker agent.
///
/// The returned artifacts are attached to the task's `completed` status. A
/// returned error transitions the task to `failed` with the error message
/// recorded. Implementations must respect the cancel handle cooperatively.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Run the worker's domain function for one request.
    async fn execute(&self, context: RequestContext, cancel: CancelHandle)
        -> Result<Vec<Artifact>>;
}
