//! Process configuration, read once from the environment at startup.
//!
//! Every agent process carries the same knob set; only the default port
//! differs per agent kind. Malformed values fall back to defaults with a
//! warning rather than aborting startup.

use std::time::Duration;

use tracing::warn;

/// Which process this configuration is for. Determines the default port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// The supervising orchestrator (default port 3001).
    Orchestrator,
    /// Repository discovery worker (default port 3002).
    DiscoveryWorker,
    /// Code analysis worker (default port 3003).
    AnalysisWorker,
    /// Dependency/relationship worker (default port 3004).
    RelationshipWorker,
}

impl AgentKind {
    /// Default listen port for this agent kind.
    pub fn default_port(&self) -> u16 {
        match self {
            AgentKind::Orchestrator => 3001,
            AgentKind::DiscoveryWorker => 3002,
            AgentKind::AnalysisWorker => 3003,
            AgentKind::RelationshipWorker => 3004,
        }
    }

    /// Human-readable agent name used in cards and logs.
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Orchestrator => "orchestrator",
            AgentKind::DiscoveryWorker => "discovery-worker",
            AgentKind::AnalysisWorker => "analysis-worker",
            AgentKind::RelationshipWorker => "relationship-worker",
        }
    }
}

/// Process-wide startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which agent this process runs as.
    pub agent: AgentKind,

    /// Listen port.
    pub port: u16,

    /// Externally reachable base URL of this agent.
    pub base_url: String,

    /// Whether to install a tracing subscriber.
    pub enable_logging: bool,

    /// Per-request timeout for outbound control RPCs.
    pub timeout: Duration,

    /// Maximum retry attempts for retryable outbound failures.
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries.
    pub retry_delay: Duration,

    /// Maximum pooled keep-alive connections per host.
    pub max_sockets: usize,

    /// Whether outbound connections use TCP keep-alive.
    pub keep_alive: bool,

    /// How long a fetched agent card stays fresh.
    pub agent_card_cache_ttl: Duration,
}

impl Config {
    /// Read configuration from the environment for the given agent kind.
    pub fn from_env(agent: AgentKind) -> Self {
        let port = read_parsed("PORT", agent.default_port());
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));

        Self {
            agent,
            port,
            base_url,
            enable_logging: read_parsed("ENABLE_LOGGING", true),
            timeout: Duration::from_millis(read_parsed("TIMEOUT_MS", 30_000u64)),
            max_retries: read_parsed("MAX_RETRIES", 3u32),
            retry_delay: Duration::from_millis(read_parsed("RETRY_DELAY_MS", 1_000u64)),
            max_sockets: read_parsed("MAX_SOCKETS", 10usize),
            keep_alive: read_parsed("KEEP_ALIVE", true),
            agent_card_cache_ttl: Duration::from_millis(read_parsed(
                "AGENT_CARD_CACHE_TTL_MS",
                300_000u64,
            )),
        }
    }

    /// Defaults without touching the environment. Used by tests.
    pub fn for_agent(agent: AgentKind) -> Self {
        let port = agent.default_port();
        Self {
            agent,
            port,
            base_url: format!("http://localhost:{}", port),
            enable_logging: false,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_sockets: 10,
            keep_alive: true,
            agent_card_cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Read an environment variable and parse it, falling back to `default` on
/// absence or parse failure.
fn read_parsed<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(key = key, value = %raw, default = %default, "invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_per_agent() {
        assert_eq!(AgentKind::Orchestrator.default_port(), 3001);
        assert_eq!(AgentKind::DiscoveryWorker.default_port(), 3002);
        assert_eq!(AgentKind::AnalysisWorker.default_port(), 3003);
        assert_eq!(AgentKind::RelationshipWorker.default_port(), 3004);
    }

    #[test]
    fn defaults_match_platform_contract() {
        let cfg = Config::for_agent(AgentKind::DiscoveryWorker);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.max_sockets, 10);
        assert_eq!(cfg.agent_card_cache_ttl, Duration::from_secs(300));
        assert_eq!(cfg.base_url, "http://localhost:3002");
    }
}
