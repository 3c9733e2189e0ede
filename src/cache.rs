//! TTL cache with approximate LRU eviction
//!
//! Keys are derived from an operation prefix plus a canonicalized
//! (sorted-key) JSON stringification of the query parameters, so the same
//! logical query always maps to the same key. There is no dependency
//! tracking between cached results and the content they were derived
//! from; callers invalidate broadly with [`ContentCache::invalidate_pattern`].
//!
//! Eviction is approximate LRU: expired entries are dropped lazily on
//! access and by a periodic sweep, and inserting at capacity evicts the
//! oldest 10% of entries by last access time.

use regex::Regex;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use ahash::AHashMap;

use crate::version::canonical_json;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entry count that triggers eviction on insert
    pub capacity: usize,
    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,
    /// Minimum interval between opportunistic expired-entry sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: 1000,
            default_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    inserted_at: Instant,
    ttl: Duration,
    hits: u64,
    last_accessed: Instant,
    /// Approximate serialized size, computed once at insert
    size_hint: usize,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) > self.ttl
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0.0 when no lookups happened
    pub hit_rate: f64,
    /// Estimated memory footprint of keys and serialized values
    pub memory_bytes: usize,
    /// Age of the oldest entry, if any
    pub oldest_age: Option<Duration>,
    /// Age of the newest entry, if any
    pub newest_age: Option<Duration>,
}

/// TTL-keyed result cache
///
/// None of the operations fail: absent entries produce `None`/`false`/0.
#[derive(Debug)]
pub struct ContentCache {
    entries: AHashMap<String, CacheEntry>,
    config: CacheConfig,
    hits: u64,
    misses: u64,
    last_sweep: Instant,
}

impl Default for ContentCache {
    fn default() -> Self {
        ContentCache::new(CacheConfig::default())
    }
}

impl ContentCache {
    pub fn new(config: CacheConfig) -> Self {
        ContentCache {
            entries: AHashMap::new(),
            config,
            hits: 0,
            misses: 0,
            last_sweep: Instant::now(),
        }
    }

    /// Derive a cache key from an operation prefix and its parameters
    pub fn key_for(prefix: &str, params: &Value) -> String {
        format!("{}:{}", prefix, canonical_json(params))
    }

    /// Insert a value with an explicit TTL, or the configured default
    pub fn set(&mut self, key: impl Into<String>, data: Value, ttl: Option<Duration>) {
        let key = key.into();
        self.maybe_sweep();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.capacity {
            self.evict_oldest_tenth();
        }
        let now = Instant::now();
        let size_hint = key.len() + data.to_string().len();
        self.entries.insert(
            key,
            CacheEntry {
                data,
                inserted_at: now,
                ttl: ttl.unwrap_or(self.config.default_ttl),
                hits: 0,
                last_accessed: now,
                size_hint,
            },
        );
    }

    /// Look up a key; expired entries are removed and counted as misses
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.maybe_sweep();
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(entry) if entry.expired(now) => {
                self.entries.remove(key);
                self.misses += 1;
                None
            }
            Some(entry) => {
                entry.hits += 1;
                entry.last_accessed = now;
                self.hits += 1;
                Some(entry.data.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// True if the key is present and not expired (does not count as a hit)
    pub fn has(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|e| !e.expired(Instant::now()))
            .unwrap_or(false)
    }

    /// Remove a key; true if it was present
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry (counters are kept)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Delete every key matching the regex; returns the number removed.
    /// An invalid pattern removes nothing.
    pub fn invalidate_pattern(&mut self, pattern: &str) -> usize {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(err) => {
                warn!(pattern, %err, "invalid cache invalidation pattern");
                return 0;
            }
        };
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|k| re.is_match(k))
            .cloned()
            .collect();
        for key in &doomed {
            self.entries.remove(key);
        }
        if !doomed.is_empty() {
            debug!(pattern, count = doomed.len(), "invalidated cache entries");
        }
        doomed.len()
    }

    /// Cache a query result under the `query:` prefix
    pub fn cache_query(&mut self, params: &Value, data: Value, ttl: Option<Duration>) {
        self.set(Self::key_for("query", params), data, ttl);
    }

    /// Cached query result, if fresh
    pub fn cached_query(&mut self, params: &Value) -> Option<Value> {
        self.get(&Self::key_for("query", params))
    }

    /// Cache a single-content result under the `content:` prefix
    pub fn cache_content(&mut self, params: &Value, data: Value, ttl: Option<Duration>) {
        self.set(Self::key_for("content", params), data, ttl);
    }

    pub fn cached_content(&mut self, params: &Value) -> Option<Value> {
        self.get(&Self::key_for("content", params))
    }

    /// Cache a search result under the `search:` prefix
    pub fn cache_search(&mut self, params: &Value, data: Value, ttl: Option<Duration>) {
        self.set(Self::key_for("search", params), data, ttl);
    }

    pub fn cached_search(&mut self, params: &Value) -> Option<Value> {
        self.get(&Self::key_for("search", params))
    }

    /// Remove every expired entry; returns the number removed
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.expired(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        let now = Instant::now();
        let ages = self.entries.values().map(|e| now.duration_since(e.inserted_at));
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
            memory_bytes: self.entries.values().map(|e| e.size_hint).sum(),
            oldest_age: ages.clone().max(),
            newest_age: ages.min(),
        }
    }

    /// Single-threaded stand-in for the once-a-minute background sweep:
    /// runs on access when the sweep interval has elapsed. Hosts with a
    /// real timer can call [`ContentCache::purge_expired`] directly.
    fn maybe_sweep(&mut self) {
        if self.last_sweep.elapsed() >= self.config.sweep_interval {
            self.last_sweep = Instant::now();
            self.purge_expired();
        }
    }

    /// Evict the oldest 10% of entries (at least one) by last access time
    fn evict_oldest_tenth(&mut self) {
        let count = (self.entries.len() / 10).max(1);
        let mut by_access: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.last_accessed))
            .collect();
        by_access.sort_by_key(|(_, at)| *at);
        for (key, _) in by_access.into_iter().take(count) {
            self.entries.remove(&key);
        }
        debug!(evicted = count, "cache capacity eviction");
    }
}
