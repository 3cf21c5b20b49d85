//! TTL + LRU bounded response store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use serde::Serialize;

use crate::config::schema::CacheBudgetConfig;
use crate::observability::metrics;

/// Fixed per-entry bookkeeping charge on top of the body size.
const ENTRY_OVERHEAD_BYTES: usize = 256;

/// A complete upstream response held for replay.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug)]
struct Stored {
    response: CachedResponse,
    expires_at: Instant,
    /// Access stamp; also the entry's key in the recency index.
    stamp: u64,
    size: usize,
}

/// Interior state guarded by one mutex. The recency index maps access
/// stamps to keys; stamps are unique, so the first index entry is always
/// the least recently used.
struct CacheInner {
    map: HashMap<String, Stored>,
    by_access: BTreeMap<u64, String>,
    total_bytes: usize,
    next_stamp: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Aggregate counters for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

/// Bounded response cache with per-entry TTL and LRU eviction.
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    max_entries: usize,
    max_bytes: usize,
}

impl ResponseCache {
    pub fn new(budget: &CacheBudgetConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                by_access: BTreeMap::new(),
                total_bytes: 0,
                next_stamp: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_entries: budget.max_entries.max(1),
            max_bytes: budget.max_bytes,
        }
    }

    /// Look up a key. A fresh entry is returned and becomes most recently
    /// used; a stale entry is discarded on the spot and counts as a miss.
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        let expired = match inner.map.get(key) {
            Some(stored) => stored.expires_at <= Instant::now(),
            None => {
                inner.misses += 1;
                metrics::record_cache_miss();
                return None;
            }
        };

        if expired {
            Self::remove_locked(&mut inner, key);
            inner.misses += 1;
            metrics::record_cache_miss();
            return None;
        }

        let stamp = inner.next_stamp;
        inner.next_stamp += 1;
        let stored = inner.map.get_mut(key).expect("entry checked above");
        let old_stamp = std::mem::replace(&mut stored.stamp, stamp);
        let response = stored.response.clone();
        inner.by_access.remove(&old_stamp);
        inner.by_access.insert(stamp, key.to_string());
        inner.hits += 1;
        metrics::record_cache_hit();
        Some(response)
    }

    /// Insert a response with the given TTL, evicting least recently used
    /// entries until the entry and byte budgets both hold. A response too
    /// large to ever fit is skipped rather than flushing the whole cache.
    pub fn put(&self, key: &str, response: CachedResponse, ttl: Duration) {
        let size = response.body.len() + ENTRY_OVERHEAD_BYTES;
        if size > self.max_bytes {
            tracing::debug!(key, size, "Response exceeds cache byte budget, not stored");
            return;
        }

        let mut inner = self.inner.lock().expect("cache mutex poisoned");

        // Replacing an entry frees its budget before eviction runs.
        Self::remove_locked(&mut inner, key);

        while inner.map.len() >= self.max_entries
            || inner.total_bytes + size > self.max_bytes
        {
            let victim = match inner.by_access.iter().next() {
                Some((_, k)) => k.clone(),
                None => break,
            };
            Self::remove_locked(&mut inner, &victim);
            inner.evictions += 1;
            metrics::record_cache_eviction();
        }

        let stamp = inner.next_stamp;
        inner.next_stamp += 1;
        inner.by_access.insert(stamp, key.to_string());
        inner.total_bytes += size;
        inner.map.insert(
            key.to_string(),
            Stored {
                response,
                expires_at: Instant::now() + ttl,
                stamp,
                size,
            },
        );
    }

    /// Remove one key if present.
    pub fn invalidate(&self, key: &str) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        Self::remove_locked(&mut inner, key);
    }

    /// Drop every expired entry. Run periodically so entries that are
    /// never read again do not pin memory until evicted.
    pub fn sweep_expired(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let now = Instant::now();
        let expired: Vec<String> = inner
            .map
            .iter()
            .filter(|(_, stored)| stored.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        let removed = expired.len();
        for key in expired {
            Self::remove_locked(&mut inner, &key);
        }
        if removed > 0 {
            tracing::debug!(removed, "Swept expired cache entries");
        }
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        let lookups = inner.hits + inner.misses;
        CacheStats {
            entries: inner.map.len(),
            total_bytes: inner.total_bytes,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }

    fn remove_locked(inner: &mut CacheInner, key: &str) {
        if let Some(stored) = inner.map.remove(key) {
            inner.by_access.remove(&stored.stamp);
            inner.total_bytes -= stored.size;
        }
    }
}

/// Whether a response may be stored at all. Decided at write time: only
/// safe methods, only success statuses, and never when the upstream asked
/// for the response not to be cached.
pub fn response_cacheable(method: &Method, status: StatusCode, headers: &HeaderMap) -> bool {
    if method != Method::GET && method != Method::HEAD {
        return false;
    }
    if !status.is_success() {
        return false;
    }
    if let Some(cc) = headers
        .get(axum::http::header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
    {
        let cc = cc.to_ascii_lowercase();
        if cc.contains("no-store") || cc.contains("no-cache") || cc.contains("private") {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn cache(max_entries: usize, max_bytes: usize) -> ResponseCache {
        ResponseCache::new(&CacheBudgetConfig {
            max_entries,
            max_bytes,
        })
    }

    fn response(body: &str) -> CachedResponse {
        CachedResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    #[test]
    fn stores_and_serves_until_expiry() {
        let cache = cache(10, 1024 * 1024);
        cache.put("k", response("hello"), Duration::from_millis(80));

        assert_eq!(cache.get("k").unwrap().body, Bytes::from("hello"));

        std::thread::sleep(Duration::from_millis(100));
        assert!(cache.get("k").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 0, "stale entry is removed on read");
    }

    #[test]
    fn entry_budget_evicts_least_recently_used() {
        let cache = cache(2, 1024 * 1024);
        let ttl = Duration::from_secs(60);

        cache.put("a", response("a"), ttl);
        cache.put("b", response("b"), ttl);

        // Touch "a" so "b" is the LRU entry.
        assert!(cache.get("a").is_some());

        cache.put("c", response("c"), ttl);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn byte_budget_evicts_until_the_new_entry_fits() {
        let body = "x".repeat(512);
        let cache = cache(100, 2 * (512 + ENTRY_OVERHEAD_BYTES));
        let ttl = Duration::from_secs(60);

        cache.put("a", response(&body), ttl);
        cache.put("b", response(&body), ttl);
        cache.put("c", response(&body), ttl);

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert!(stats.total_bytes <= 2 * (512 + ENTRY_OVERHEAD_BYTES));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn oversized_response_is_skipped_without_flushing() {
        let cache = cache(10, 1024);
        let ttl = Duration::from_secs(60);

        cache.put("small", response("ok"), ttl);
        cache.put("huge", response(&"x".repeat(4096)), ttl);

        assert!(cache.get("small").is_some());
        assert!(cache.get("huge").is_none());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn replacing_a_key_reuses_its_budget() {
        let cache = cache(1, 1024 * 1024);
        let ttl = Duration::from_secs(60);

        cache.put("k", response("v1"), ttl);
        cache.put("k", response("v2"), ttl);

        assert_eq!(cache.get("k").unwrap().body, Bytes::from("v2"));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn invalidate_removes_the_entry_and_frees_budget() {
        let cache = cache(10, 1024 * 1024);
        cache.put("k", response("v"), Duration::from_secs(60));
        assert_eq!(cache.stats().entries, 1);

        cache.invalidate("k");
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().total_bytes, 0);
        assert!(cache.get("k").is_none());

        // Invalidating an absent key is a no-op.
        cache.invalidate("missing");
    }

    #[test]
    fn write_gate_rejects_unsafe_responses() {
        let ok = HeaderMap::new();
        assert!(response_cacheable(&Method::GET, StatusCode::OK, &ok));
        assert!(response_cacheable(&Method::HEAD, StatusCode::OK, &ok));

        assert!(!response_cacheable(&Method::POST, StatusCode::OK, &ok));
        assert!(!response_cacheable(
            &Method::GET,
            StatusCode::INTERNAL_SERVER_ERROR,
            &ok
        ));
        assert!(!response_cacheable(&Method::GET, StatusCode::NOT_FOUND, &ok));

        let mut no_store = HeaderMap::new();
        no_store.insert(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("No-Store, max-age=0"),
        );
        assert!(!response_cacheable(&Method::GET, StatusCode::OK, &no_store));

        let mut private = HeaderMap::new();
        private.insert(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("private"),
        );
        assert!(!response_cacheable(&Method::GET, StatusCode::OK, &private));
    }
}
