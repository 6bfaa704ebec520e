//! JSON-RPC over HTTP transport with pooling, retry, and monotonic ids.
//!
//! One transport instance owns one pooled `reqwest` client. Request ids are
//! a per-transport monotonic counter, and every response id is checked
//! against its request before the result is accepted.
//!
//! Retry policy: transport-class failures (connect refused/reset, timeout,
//! 502–504) retry with exponential backoff (`retry_delay · 2^attempt`) up to
//! `max_retries`. JSON-RPC level errors are answers, not failures — they
//! surface immediately.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{JsonRpcId, JsonRpcRequest, JsonRpcResponse};

/// Tuning knobs for a [`JsonRpcTransport`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,

    /// Maximum retry attempts for retryable failures.
    pub max_retries: u32,

    /// Base delay for exponential backoff.
    pub retry_delay: Duration,

    /// Maximum pooled keep-alive connections per host.
    pub max_sockets: usize,

    /// Whether to hold keep-alive connections.
    pub keep_alive: bool,

    /// Agent-card cache TTL (consumed by [`super::CardCache`]).
    pub agent_card_cache_ttl: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_sockets: 10,
            keep_alive: true,
            agent_card_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl ClientOptions {
    /// Derive options from process configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.timeout,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            max_sockets: config.max_sockets,
            keep_alive: config.keep_alive,
            agent_card_cache_ttl: config.agent_card_cache_ttl,
        }
    }

    /// Override the per-request timeout (the orchestrator's polling client
    /// uses a 5-minute envelope).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Pooled JSON-RPC over HTTP transport.
#[derive(Debug)]
pub struct JsonRpcTransport {
    http: reqwest::Client,
    next_id: AtomicU64,
    shut_down: AtomicBool,
    options: ClientOptions,
}

impl JsonRpcTransport {
    /// Create a transport with the given options.
    pub fn new(options: ClientOptions) -> Self {
        let mut builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .pool_max_idle_per_host(options.max_sockets);
        if options.keep_alive {
            builder = builder.tcp_keepalive(Some(Duration::from_secs(60)));
        } else {
            builder = builder.pool_idle_timeout(Duration::ZERO);
        }
        let http = builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            next_id: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
            options,
        }
    }

    /// The options this transport was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Mark the transport as shut down. Subsequent requests fail instead of
    /// touching the network; pooled connections drain as the inner client's
    /// handles drop.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::Transport("transport has been shut down".to_string()));
        }
        Ok(())
    }

    /// Send a JSON-RPC request to an agent base URL and return the `result`.
    ///
    /// Retries transport-class failures with exponential backoff; raises on
    /// response-id mismatch and relays JSON-RPC error objects as
    /// [`Error::JsonRpc`].
    pub async fn call(&self, base_url: &str, method: &str, params: Value) -> Result<Value> {
        self.ensure_open()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(JsonRpcId::Number(id as i64)),
            method: method.to_string(),
            params: Some(params),
        };

        let response = self
            .with_retry(method, || self.post_once(base_url, &request))
            .await?;

        if response.id != request.id {
            return Err(Error::InvalidJson(format!(
                "response id {:?} does not match request id {}",
                response.id, id
            )));
        }

        if let Some(error) = response.error {
            return Err(Error::JsonRpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        response.result.ok_or_else(|| {
            Error::InvalidJson("JSON-RPC response has neither 'result' nor 'error'".to_string())
        })
    }

    /// GET a JSON document (agent card, health) with the same retry policy.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        self.ensure_open()?;
        self.with_retry("GET", || async {
            let response = self
                .http
                .get(url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(triage_reqwest_error)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::Transport(format!("failed to read response body: {}", e)))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| Error::InvalidJson(format!("invalid JSON body: {}", e)))
        })
        .await
    }

    async fn post_once(&self, base_url: &str, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let response = self
            .http
            .post(base_url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(triage_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response body: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidJson(format!("invalid JSON-RPC response: {}", e)))
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, attempt_fn: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.options.max_retries => {
                    let delay = backoff_delay(self.options.retry_delay, attempt);
                    warn!(
                        what = %what,
                        attempt = attempt + 1,
                        max = self.options.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(what = %what, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }
}

impl Default for JsonRpcTransport {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

/// Exponential backoff: `base · 2^attempt`.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

fn triage_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("request timed out: {}", e))
    } else if e.is_connect() {
        Error::Transport(format!("connection failed: {}", e))
    } else {
        Error::Transport(format!("HTTP request failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(400));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn request_ids_are_monotonic() {
        let transport = JsonRpcTransport::default();
        let a = transport.next_id.fetch_add(1, Ordering::Relaxed);
        let b = transport.next_id.fetch_add(1, Ordering::Relaxed);
        assert!(b > a);
    }

    #[tokio::test]
    async fn shut_down_transport_rejects_requests() {
        let transport = JsonRpcTransport::default();
        assert!(!transport.is_shut_down());

        transport.shutdown();
        let err = transport
            .call("http://localhost:3002", "tasks/get", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("shut down"));

        let err = transport
            .get_json("http://localhost:3002/health")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn connect_failure_is_transport_error() {
        // Reserved TEST-NET-1 address; nothing listens there.
        let options = ClientOptions {
            timeout: Duration::from_millis(200),
            max_retries: 0,
            ..Default::default()
        };
        let transport = JsonRpcTransport::new(options);
        let err = transport
            .call("http://192.0.2.1:9/", "tasks/get", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_) | Error::Timeout(_)));
    }
}
