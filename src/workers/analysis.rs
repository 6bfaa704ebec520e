//! Code analysis worker.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::server::{AgentExecutor, CancelHandle, RequestContext};
use crate::types::Artifact;
use crate::utils::new_data_artifact;

use super::command::{find_repository_slug, parse_command, WorkerCommand};
use super::provider::RepositoryProvider;

/// Analyzes a single repository in depth.
///
/// Accepts `analyze repository: owner/repo[, branch: X]`. Freeform messages
/// are scanned for an `owner/repo` token; when none is present the worker
/// answers with guidance instead of failing, keeping exploration cheap.
pub struct AnalysisExecutor {
    provider: Arc<dyn RepositoryProvider>,
}

impl AnalysisExecutor {
    /// Create the executor over a provider.
    pub fn new(provider: Arc<dyn RepositoryProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl AgentExecutor for AnalysisExecutor {
    async fn execute(
        &self,
        context: RequestContext,
        cancel: CancelHandle,
    ) -> Result<Vec<Artifact>> {
        let input = context.user_input();
        let (owner, name, branch) = match parse_command(&input) {
            WorkerCommand::AnalyzeRepository {
                owner,
                name,
                branch,
            } => (owner, name, branch),
            WorkerCommand::Freeform { ref text } => match find_repository_slug(text) {
                Some((owner, name)) => (owner, name, None),
                None => {
                    debug!(task_id = %context.task_id, "no repository reference in message");
                    return Ok(vec![new_data_artifact(
                        "analysis-guidance",
                        serde_json::json!({
                            "message": "No repository reference found in the request.",
                            "expected": "analyze repository: owner/repo[, branch: X]",
                        }),
                    )]);
                }
            },
            other => {
                return Err(Error::invalid_params(format!(
                    "analysis worker cannot handle command {:?}",
                    other
                )))
            }
        };

        if cancel.is_canceled() {
            return Err(Error::internal("canceled before analysis started"));
        }

        let details = self
            .provider
            .repository_details(&owner, &name, branch.as_deref())
            .await?;

        debug!(task_id = %context.task_id, repo = %format!("{}/{}", owner, name), "analysis complete");

        Ok(vec![new_data_artifact(
            "repository-analysis",
            serde_json::to_value(&details)?,
        )])
    }
}
