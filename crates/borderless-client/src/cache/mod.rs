//! Response cache.
//!
//! Idempotent reads may opt into memoization per call. The cache depends only
//! on the [`CacheStore`] contract (get, and set with a time-to-live), so the
//! backing store can be swapped: [`InMemoryCacheStore`] is the default,
//! [`NoopCacheStore`] disables caching entirely.
//!
//! There is no explicit invalidation. Entries disappear when their TTL runs
//! out; callers needing fresher data skip the cache for that call.
//!
//! Concurrent callers asking for the same missing key are not deduplicated:
//! each computes and stores its own value. Writes for one key always carry
//! the same upstream answer, so the last writer wins harmlessly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;

mod memory;

pub use self::memory::{CacheEntry, InMemoryCacheStore, NoopCacheStore};

/// Default time-to-live for cached responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Backing store for cached responses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the live value stored under `key`.
    ///
    /// Must never return a value whose TTL has elapsed.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: String, value: Value, ttl: Duration);
}

/// Memoizes JSON values through a pluggable [`CacheStore`].
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache").finish_non_exhaustive()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryCacheStore::default()))
    }
}

impl ResponseCache {
    /// Creates a cache over `store`.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Returns the cached value for `key`, or runs `compute` and caches its
    /// result for `ttl`.
    ///
    /// Failed computations are returned as-is and nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `compute`.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value>> + Send,
    {
        if let Some(value) = self.store.get(key).await {
            debug!("Cache hit for {key}");
            return Ok(value);
        }

        debug!("Cache miss for {key}");
        let value = compute().await?;
        self.store.set(key.to_string(), value.clone(), ttl).await;
        Ok(value)
    }
}

/// Cache key for a generic GET: a hash over the endpoint and the serialized
/// query pairs.
///
/// ```
/// use borderless_client::cache::request_key;
///
/// let a = request_key("v1/transfers", &[("status".into(), "outgoing_payment_sent".into())]);
/// let b = request_key("v1/transfers", &[("status".into(), "funds_refunded".into())]);
/// assert_ne!(a, b);
/// assert!(a.starts_with("wise_get_"));
/// ```
#[must_use]
pub fn request_key(endpoint: &str, query: &[(String, String)]) -> String {
    // Serializing a slice of string pairs cannot fail.
    let params = serde_json::to_string(query).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(params.as_bytes());
    format!("wise_get_{}", hex::encode(hasher.finalize()))
}

/// Cache key for the per-profile balance listing.
#[must_use]
pub fn balances_key(profile_id: u64) -> String {
    format!("wise_balances_{profile_id}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_request_key_is_stable_and_order_sensitive() {
        let forward = vec![
            ("source".to_string(), "EUR".to_string()),
            ("target".to_string(), "USD".to_string()),
        ];
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();

        assert_eq!(request_key("v1/rates", &forward), request_key("v1/rates", &forward));
        assert_ne!(request_key("v1/rates", &forward), request_key("v1/rates", &reversed));
        assert_ne!(request_key("v1/rates", &forward), request_key("v2/rates", &forward));
    }

    #[test]
    fn test_balances_key_is_per_profile() {
        assert_eq!(balances_key(42), "wise_balances_42");
        assert_ne!(balances_key(42), balances_key(43));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_within_ttl_is_served_from_cache() {
        let cache = ResponseCache::default();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let compute = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"amount": 10}))
        };

        let ttl = Duration::from_secs(60);
        let first = cache.get_or_compute("k", ttl, compute).await.unwrap();
        let second = cache.get_or_compute("k", ttl, compute).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_recomputed() {
        let cache = ResponseCache::default();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let compute = move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"call": n}))
        };

        let ttl = Duration::from_secs(300);
        let first = cache.get_or_compute("k", ttl, compute).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        let second = cache.get_or_compute("k", ttl, compute).await.unwrap();

        assert_eq!(first, json!({"call": 0}));
        assert_eq!(second, json!({"call": 1}));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = ResponseCache::default();
        let ttl = Duration::from_secs(60);

        let failed = cache
            .get_or_compute("k", ttl, || async {
                Err(ClientError::InvalidResponse("boom".to_string()))
            })
            .await;
        assert!(failed.is_err());

        let value = cache
            .get_or_compute("k", ttl, || async { Ok(json!("fresh")) })
            .await
            .unwrap();
        assert_eq!(value, json!("fresh"));
    }

    #[tokio::test]
    async fn test_noop_store_always_recomputes() {
        let cache = ResponseCache::new(Arc::new(NoopCacheStore));
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let compute = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        };

        let ttl = Duration::from_secs(60);
        cache.get_or_compute("k", ttl, compute).await.unwrap();
        cache.get_or_compute("k", ttl, compute).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
