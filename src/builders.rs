//! Ergonomic builders for wire types.

use crate::error::{Error, Result};
use crate::types::{
    AgentCapabilities, AgentCard, AgentProvider, AgentSkill, AgentTransport, PROTOCOL_VERSION,
};

/// Fluent builder for [`AgentCard`].
///
/// # Example
///
/// ```
/// use devmesh::builders::AgentCardBuilder;
///
/// let card = AgentCardBuilder::new("discovery-worker")
///     .description("Finds repositories across configured organizations")
///     .url("http://localhost:3002")
///     .skill("discover", "Repository discovery", "Lists known repositories", &["discovery"])
///     .build()
///     .unwrap();
/// assert_eq!(card.protocol_version, "0.3.0");
/// ```
#[derive(Debug, Clone, Default)]
pub struct AgentCardBuilder {
    name: String,
    description: Option<String>,
    url: Option<String>,
    skills: Vec<AgentSkill>,
    streaming: Option<bool>,
    multi_modal: Option<bool>,
    input_modes: Vec<String>,
    output_modes: Vec<String>,
    provider: Option<AgentProvider>,
}

impl AgentCardBuilder {
    /// Start a builder for an agent with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the agent description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the agent base URL. The JSON-RPC transport binding is derived
    /// from it at build time.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a skill.
    pub fn skill(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: &[&str],
    ) -> Self {
        self.skills.push(AgentSkill {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    /// Declare streaming support.
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }

    /// Declare multi-modal input support.
    pub fn multi_modal(mut self, multi_modal: bool) -> Self {
        self.multi_modal = Some(multi_modal);
        self
    }

    /// Override the accepted input modes (defaults to `text/plain` +
    /// `application/json`).
    pub fn input_modes(mut self, modes: &[&str]) -> Self {
        self.input_modes = modes.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Override the produced output modes (defaults to `application/json`).
    pub fn output_modes(mut self, modes: &[&str]) -> Self {
        self.output_modes = modes.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Set the provider block.
    pub fn provider(mut self, organization: impl Into<String>, url: impl Into<String>) -> Self {
        self.provider = Some(AgentProvider {
            organization: organization.into(),
            url: url.into(),
        });
        self
    }

    /// Build the card. Fails when the name or URL is missing.
    pub fn build(self) -> Result<AgentCard> {
        if self.name.is_empty() {
            return Err(Error::invalid_params("agent card requires a name"));
        }
        let url = self
            .url
            .ok_or_else(|| Error::invalid_params("agent card requires a url"))?;

        let input_modes = if self.input_modes.is_empty() {
            vec!["text/plain".to_string(), "application/json".to_string()]
        } else {
            self.input_modes
        };
        let output_modes = if self.output_modes.is_empty() {
            vec!["application/json".to_string()]
        } else {
            self.output_modes
        };

        Ok(AgentCard {
            protocol_version: PROTOCOL_VERSION.to_string(),
            name: self.name,
            description: self.description.unwrap_or_default(),
            transports: vec![AgentTransport {
                transport: "JSONRPC".to_string(),
                url: url.clone(),
                protocol_version: Some(PROTOCOL_VERSION.to_string()),
            }],
            url,
            capabilities: AgentCapabilities {
                streaming: self.streaming,
                multi_modal: self.multi_modal,
            },
            default_input_modes: input_modes,
            default_output_modes: output_modes,
            skills: self.skills,
            provider: self.provider,
        })
    }
}
