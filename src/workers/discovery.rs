//! Repository discovery worker.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::server::{AgentExecutor, CancelHandle, RequestContext};
use crate::types::Artifact;
use crate::utils::new_data_artifact;

use super::command::{parse_command, WorkerCommand};
use super::provider::RepositoryProvider;

/// Lists repositories the platform is aware of.
///
/// Accepts `list repositories[, organization: X][, topic: Y]`; freeform
/// messages fall back to a full listing so exploratory questions still get
/// an answer.
pub struct DiscoveryExecutor {
    provider: Arc<dyn RepositoryProvider>,
}

impl DiscoveryExecutor {
    /// Create the executor over a provider.
    pub fn new(provider: Arc<dyn RepositoryProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl AgentExecutor for DiscoveryExecutor {
    async fn execute(
        &self,
        context: RequestContext,
        cancel: CancelHandle,
    ) -> Result<Vec<Artifact>> {
        let input = context.user_input();
        let (organization, topic) = match parse_command(&input) {
            WorkerCommand::ListRepositories {
                organization,
                topic,
            } => (organization, topic),
            other => {
                debug!(task_id = %context.task_id, command = ?other, "non-listing command, listing everything");
                (None, None)
            }
        };

        if cancel.is_canceled() {
            return Err(Error::internal("canceled before discovery started"));
        }

        let repositories = self
            .provider
            .list_repositories(organization.as_deref(), topic.as_deref())
            .await?;

        debug!(
            task_id = %context.task_id,
            count = repositories.len(),
            organization = ?organization,
            topic = ?topic,
            "discovery complete"
        );

        Ok(vec![new_data_artifact(
            "repository-listing",
            serde_json::json!({
                "repositories": repositories,
                "count": repositories.len(),
                "organization": organization,
                "topic": topic,
            }),
        )])
    }
}
