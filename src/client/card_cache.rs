//! TTL cache for fetched agent cards.
//!
//! Entries expire by absolute deadline. Concurrent fetches of the same URL
//! may racily duplicate the HTTP request; the duplicate write is harmless
//! and tolerated by design of the concurrency model.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::types::AgentCard;

/// Cached agent cards keyed by base URL.
#[derive(Debug)]
pub struct CardCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    card: AgentCard,
    expires_at: Instant,
}

impl CardCache {
    /// Create a cache with the given entry TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a fresh entry; expired entries are treated as absent.
    pub async fn get(&self, base_url: &str) -> Option<AgentCard> {
        let entries = self.entries.read().await;
        let entry = entries.get(base_url)?;
        if entry.expires_at <= Instant::now() {
            debug!(base_url = %base_url, "agent card cache entry expired");
            return None;
        }
        Some(entry.card.clone())
    }

    /// Insert or refresh an entry.
    pub async fn put(&self, base_url: &str, card: AgentCard) {
        let mut entries = self.entries.write().await;
        entries.insert(
            base_url.to_string(),
            CacheEntry {
                card,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
