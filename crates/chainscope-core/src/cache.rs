//! In-memory TTL cache for upstream response bodies.
//!
//! Adapters key entries by the full request URL (plus body for JSON-RPC
//! posts), so identical requests inside the TTL never reach the network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

/// How a single upstream call interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a fresh entry when present; otherwise fetch and store.
    #[default]
    Use,
    /// Always fetch, then overwrite the entry.
    Refresh,
    /// Neither read nor write. Used by health probes and price comparison.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
    max_entries: usize,
}

impl CacheInner {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).and_then(|entry| {
            if Instant::now() <= entry.expires_at {
                Some(entry.body.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, key: String, body: String, ttl: Duration) {
        if self.map.len() >= self.max_entries && !self.map.contains_key(&key) {
            self.clear_expired();
            if self.map.len() >= self.max_entries {
                self.evict_soonest_expiring();
            }
        }

        let expires_at = Instant::now() + ttl;
        self.map.insert(key, CacheEntry { body, expires_at });
    }

    fn clear_expired(&mut self) {
        let now = Instant::now();
        self.map.retain(|_, entry| entry.expires_at > now);
    }

    fn evict_soonest_expiring(&mut self) {
        let victim = self
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            self.map.remove(&key);
        }
    }
}

/// Thread-safe in-memory response cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(1_024)
    }
}

impl CacheStore {
    /// Creates a cache bounded to `max_entries` live entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                max_entries: max_entries.max(1),
            })),
        }
    }

    /// Returns the cached body for `key` if present and not expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.inner.read().await;
        store.get(key)
    }

    /// Stores `body` under `key` for `ttl`. A zero TTL is a no-op.
    pub async fn put(&self, key: String, body: String, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }

        let mut store = self.inner.write().await;
        store.put(key, body, ttl);
    }

    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        store.clear_expired();
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Number of entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_overwrites_entries() {
        let cache = CacheStore::default();

        assert!(cache.get("key1").await.is_none());

        cache
            .put("key1".to_string(), "value1".to_string(), Duration::from_secs(1))
            .await;
        assert_eq!(cache.get("key1").await, Some("value1".to_string()));

        cache
            .put("key1".to_string(), "value2".to_string(), Duration::from_secs(1))
            .await;
        assert_eq!(cache.get("key1").await, Some("value2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = CacheStore::default();

        cache
            .put("key1".to_string(), "value1".to_string(), Duration::from_secs(30))
            .await;
        assert!(cache.get("key1").await.is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.get("key1").await.is_none());

        cache.clear_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn zero_ttl_is_never_stored() {
        let cache = CacheStore::default();

        cache
            .put("key1".to_string(), "value1".to_string(), Duration::ZERO)
            .await;
        assert!(cache.get("key1").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn bounded_cache_evicts_soonest_expiring_entry() {
        let cache = CacheStore::new(2);

        cache
            .put("short".to_string(), "a".to_string(), Duration::from_secs(5))
            .await;
        cache
            .put("long".to_string(), "b".to_string(), Duration::from_secs(500))
            .await;
        cache
            .put("new".to_string(), "c".to_string(), Duration::from_secs(60))
            .await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("short").await.is_none());
        assert!(cache.get("long").await.is_some());
        assert!(cache.get("new").await.is_some());
    }

    #[test]
    fn cache_modes_gate_reads_and_writes() {
        assert!(CacheMode::default().reads());
        assert!(CacheMode::Refresh.writes());
        assert!(!CacheMode::Refresh.reads());
        assert!(!CacheMode::Bypass.writes());
    }
}
