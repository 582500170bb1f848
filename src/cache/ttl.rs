//! TTL cache implementation.
//!
//! Keys are strings built from collection names (`collection:id` for
//! documents, serialized option segments for queries), values are the
//! raw JSON the store returned. Expiry is lazy on access plus a periodic
//! sweep driven by the owner; there is no access-recency tracking, so
//! capacity eviction is bulk-FIFO by insertion time, not LRU.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Cache tuning knobs
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled at all
    pub enabled: bool,
    /// How long an entry stays valid
    pub ttl: Duration,
    /// Maximum number of entries before bulk eviction
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(5 * 60),
            max_size: 1000,
        }
    }
}

/// Cache statistics, passive only
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Entries returned before expiry
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Entries removed by capacity eviction
    pub evictions: u64,
    /// Entries removed as expired (lazy or sweep)
    pub expired: u64,
}

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    expires_at: Instant,
}

/// String-keyed TTL cache over JSON values
pub struct TtlCache {
    entries: HashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl TtlCache {
    /// Create a cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    /// The configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Whether caching is enabled
    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Insert a value, evicting the oldest quarter of entries first if
    /// the cache is full.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if !self.config.enabled {
            return;
        }

        if self.entries.len() >= self.config.max_size {
            self.evict_oldest();
        }

        let now = Instant::now();
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + self.config.ttl,
            },
        );
    }

    /// Look up a value. An expired entry is removed and counts as a miss;
    /// expired data is never returned.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }

        match self.entries.get(key) {
            Some(entry) if Instant::now() <= entry.expires_at => {
                self.stats.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.expired += 1;
                self.stats.misses += 1;
                None
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Remove one entry
    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Remove every entry whose key contains `pattern` as a substring.
    /// Linear in cache size.
    pub fn invalidate_pattern(&mut self, pattern: &str) {
        self.entries.retain(|key, _| !key.contains(pattern));
    }

    /// Remove all expired entries, returning how many were dropped
    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.expires_at);
        let removed = before - self.entries.len();
        self.stats.expired += removed as u64;
        removed
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live entries (expired-but-unswept included)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Evict the oldest 25% of entries by insertion time, at least one.
    fn evict_oldest(&mut self) {
        let mut ordered: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.inserted_at))
            .collect();
        ordered.sort_by_key(|(_, inserted_at)| *inserted_at);

        let remove_count = (ordered.len() / 4).max(1);
        for (key, _) in ordered.into_iter().take(remove_count) {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }
}
