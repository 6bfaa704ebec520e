//! The repository intelligence seam.
//!
//! Real code-hosting and code-analysis backends live behind
//! [`RepositoryProvider`]; the workers only speak this trait.
//! [`SampleCatalog`] is the built-in stand-in used by the shipped binaries
//! and the test suite.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One repository in a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySummary {
    /// Owning organization or user.
    pub owner: String,

    /// Repository name.
    pub name: String,

    /// Short description.
    pub description: String,

    /// Topic tags.
    pub topics: Vec<String>,

    /// Primary language.
    pub language: String,
}

/// Full analysis of one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDetails {
    /// Summary block.
    pub summary: RepositorySummary,

    /// Branch the analysis ran against.
    pub branch: String,

    /// Top-level modules/components.
    pub modules: Vec<String>,

    /// Direct dependencies.
    pub dependencies: Vec<String>,
}

/// The black-box domain capability workers execute against.
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// List repositories, optionally filtered by organization and/or topic.
    async fn list_repositories(
        &self,
        organization: Option<&str>,
        topic: Option<&str>,
    ) -> Result<Vec<RepositorySummary>>;

    /// Analyze one repository.
    async fn repository_details(
        &self,
        owner: &str,
        name: &str,
        branch: Option<&str>,
    ) -> Result<RepositoryDetails>;

    /// Map a repository's dependency relationships into an opaque graph.
    async fn dependency_graph(&self, owner: &str, name: &str) -> Result<Value>;
}

/// Static in-memory catalog.
#[derive(Debug, Default)]
pub struct SampleCatalog;

impl SampleCatalog {
    /// Create the catalog.
    pub fn new() -> Self {
        Self
    }

    fn repositories() -> Vec<RepositorySummary> {
        vec![
            RepositorySummary {
                owner: "cortside".to_string(),
                name: "cortside.aspnetcore".to_string(),
                description: "ASP.NET Core building blocks and middleware".to_string(),
                topics: vec!["dotnet".to_string(), "api".to_string()],
                language: "C#".to_string(),
            },
            RepositorySummary {
                owner: "cortside".to_string(),
                name: "coeus".to_string(),
                description: "Reference microservice demonstrating platform conventions"
                    .to_string(),
                topics: vec!["dotnet".to_string(), "microservice".to_string()],
                language: "C#".to_string(),
            },
            RepositorySummary {
                owner: "thehivegroup-ai".to_string(),
                name: "developer-agent".to_string(),
                description: "Multi-agent platform for repository intelligence".to_string(),
                topics: vec!["agents".to_string(), "a2a".to_string()],
                language: "TypeScript".to_string(),
            },
            RepositorySummary {
                owner: "thehivegroup-ai".to_string(),
                name: "knowledge-graph".to_string(),
                description: "Graph store for cross-repository relationships".to_string(),
                topics: vec!["graph".to_string(), "a2a".to_string()],
                language: "TypeScript".to_string(),
            },
        ]
    }
}

#[async_trait]
impl RepositoryProvider for SampleCatalog {
    async fn list_repositories(
        &self,
        organization: Option<&str>,
        topic: Option<&str>,
    ) -> Result<Vec<RepositorySummary>> {
        Ok(Self::repositories()
            .into_iter()
            .filter(|repo| {
                organization.map_or(true, |org| repo.owner.eq_ignore_ascii_case(org))
                    && topic.map_or(true, |t| {
                        repo.topics.iter().any(|have| have.eq_ignore_ascii_case(t))
                    })
            })
            .collect())
    }

    async fn repository_details(
        &self,
        owner: &str,
        name: &str,
        branch: Option<&str>,
    ) -> Result<RepositoryDetails> {
        let summary = Self::repositories()
            .into_iter()
            .find(|repo| repo.owner.eq_ignore_ascii_case(owner) && repo.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::invalid_params(format!("unknown repository: {}/{}", owner, name))
            })?;

        Ok(RepositoryDetails {
            branch: branch.unwrap_or("main").to_string(),
            modules: vec!["src".to_string(), "tests".to_string(), "docs".to_string()],
            dependencies: summary
                .topics
                .iter()
                .map(|topic| format!("{}-toolkit", topic))
                .collect(),
            summary,
        })
    }

    async fn dependency_graph(&self, owner: &str, name: &str) -> Result<Value> {
        let details = self.repository_details(owner, name, None).await?;
        let edges: Vec<Value> = details
            .dependencies
            .iter()
            .map(|dep| {
                serde_json::json!({
                    "from": format!("{}/{}", owner, name),
                    "to": dep,
                    "kind": "depends-on",
                })
            })
            .collect();
        Ok(serde_json::json!({
            "nodes": details.dependencies,
            "edges": edges,
        }))
    }
}
