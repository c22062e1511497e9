use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use serde_json::Value;
use tokio::time::Instant;

use crate::cache::CacheStore;

/// One cached value and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached JSON value.
    pub value: Value,
    /// First instant at which the entry is stale.
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-memory cache storage.
///
/// Entries are not shared between instances nor persisted. Expired entries
/// are evicted when a lookup finds them stale, and every write sweeps the
/// remaining stale entries so keys that are never read again do not pile up.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheStore {
    /// Number of stored entries, including stale ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();

        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            debug!("Evicted expired cache entry {key}");
            return None;
        }

        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    async fn set(&self, key: String, value: Value, ttl: Duration) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!("Evicted {evicted} expired cache entries");
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

/// Storage that never keeps anything; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn set(&self, _key: String, _value: Value, _ttl: Duration) {}
}
