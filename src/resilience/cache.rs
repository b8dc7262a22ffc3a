//! TTL response cache for product queries
//!
//! Uses moka for thread-safe concurrent caching with TTL-based expiration.
//! Entries older than the TTL are never served; they are dropped lazily by
//! moka or overwritten on the next `set`.

use moka::sync::Cache;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default TTL for cached responses
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Upper bound on entries; TTL is the real eviction policy, this is only a safety net
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Response cache keyed by request shape
pub struct ResponseCache {
    cache: Cache<String, Value>,
    /// Cache hit count
    hits: AtomicU64,
    /// Cache miss count
    misses: AtomicU64,
    /// Explicit invalidations
    invalidations: AtomicU64,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }

    pub fn with_config(max_entries: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            ttl,
        }
    }

    /// Look up a cached payload, counting the hit or miss
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.cache.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache_key = %key, "Cache hit");
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache_key = %key, "Cache miss");
                None
            }
        }
    }

    /// Store a payload, replacing any previous (possibly stale) entry
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.cache.insert(key.into(), value);
    }

    /// Drop a key immediately
    pub fn invalidate(&self, key: &str) {
        if self.cache.contains_key(key) {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        self.cache.invalidate(key);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            invalidations: self.invalidations.load(Ordering::Relaxed),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            entry_count: self.cache.entry_count(),
            ttl_secs: self.ttl.as_secs(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    /// Hit rate (0.0 - 1.0)
    pub hit_rate: f64,
    /// Approximate; moka applies pending writes lazily
    pub entry_count: u64,
    pub ttl_secs: u64,
}
