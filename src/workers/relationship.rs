//! Dependency/relationship worker.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::server::{AgentExecutor, CancelHandle, RequestContext};
use crate::types::Artifact;
use crate::utils::new_data_artifact;

use super::command::{find_repository_slug, parse_command, WorkerCommand};
use super::provider::RepositoryProvider;

/// Maps a repository's dependency relationships.
///
/// Accepts `map dependencies: owner/repo` (and honors `analyze repository:`
/// by mapping the named repository). Freeform messages are scanned for a
/// repository token.
pub struct RelationshipExecutor {
    provider: Arc<dyn RepositoryProvider>,
}

impl RelationshipExecutor {
    /// Create the executor over a provider.
    pub fn new(provider: Arc<dyn RepositoryProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl AgentExecutor for RelationshipExecutor {
    async fn execute(
        &self,
        context: RequestContext,
        cancel: CancelHandle,
    ) -> Result<Vec<Artifact>> {
        let input = context.user_input();
        let (owner, name) = match parse_command(&input) {
            WorkerCommand::MapDependencies { owner, name } => (owner, name),
            WorkerCommand::AnalyzeRepository { owner, name, .. } => (owner, name),
            WorkerCommand::Freeform { ref text } => {
                find_repository_slug(text).ok_or_else(|| {
                    Error::invalid_params("no repository reference found in message")
                })?
            }
            other => {
                return Err(Error::invalid_params(format!(
                    "relationship worker cannot handle command {:?}",
                    other
                )))
            }
        };

        if cancel.is_canceled() {
            return Err(Error::internal("canceled before mapping started"));
        }

        let graph = self.provider.dependency_graph(&owner, &name).await?;
        debug!(task_id = %context.task_id, repo = %format!("{}/{}", owner, name), "relationship mapping complete");

        Ok(vec![new_data_artifact(
            "dependency-graph",
            serde_json::json!({
                "repository": format!("{}/{}", owner, name),
                "graph": graph,
            }),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactContent, Message, Part};
    use crate::workers::provider::SampleCatalog;

    fn context(text: &str) -> RequestContext {
        RequestContext {
            task_id: "t1".into(),
            context_id: None,
            message: Message::user_text(text),
        }
    }

    #[tokio::test]
    async fn maps_dependencies_for_command() {
        let executor = RelationshipExecutor::new(Arc::new(SampleCatalog::new()));
        let artifacts = executor
            .execute(
                context("map dependencies: cortside/coeus"),
                CancelHandle::new(),
            )
            .await
            .unwrap();

        let ArtifactContent::Parts { parts } = &artifacts[0].content else {
            panic!("expected inline parts");
        };
        let Part::Data { data } = &parts[0] else {
            panic!("expected data part");
        };
        assert_eq!(data["repository"], "cortside/coeus");
        assert!(data["graph"]["edges"].as_array().is_some());
    }

    #[tokio::test]
    async fn freeform_without_slug_fails() {
        let executor = RelationshipExecutor::new(Arc::new(SampleCatalog::new()));
        assert!(executor
            .execute(context("draw me a graph"), CancelHandle::new())
            .await
            .is_err());
    }
}
