//! TTL-bounded response cache for idempotent read requests.
//!
//! Keys are a stable SHA-256 hash of the raw query text. Entries expire
//! after the configured TTL and are deleted (never refreshed in place) on
//! the read that finds them stale. Insertion past capacity evicts the
//! single oldest entry by insertion time; reads do not promote, so this
//! is deliberately not an LRU.
//!
//! The cache is read-through only for the caller: it never triggers a
//! network call itself. Adapters populate it explicitly after a
//! successful fetch.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// One stored response plus its insertion timestamp.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Cache statistics for monitoring and debugging.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total cache hits.
    pub hits: u64,
    /// Total cache misses (absent or expired).
    pub misses: u64,
    /// Total entries inserted.
    pub insertions: u64,
    /// Entries evicted to make room.
    pub evictions: u64,
    /// Entries deleted because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    /// Hit rate as a value between 0.0 and 1.0, or 0.0 with no accesses.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded, TTL-expiring key/value store for query responses.
///
/// Thread-safe via interior mutability; the get-with-expiry and
/// evict-then-set sequences each hold the internal lock end to end so
/// concurrent tasks cannot corrupt eviction accounting.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use blogforge::limits::ResponseCache;
///
/// let cache: ResponseCache<String> = ResponseCache::new(100, Duration::from_secs(3600));
/// cache.set("rust async runtimes", "results".to_string());
/// assert_eq!(cache.get("rust async runtimes").as_deref(), Some("results"));
/// assert!(cache.get("unrelated query").is_none());
/// ```
pub struct ResponseCache<V> {
    max_size: usize,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    stats: Mutex<CacheStats>,
}

impl<V: Clone> ResponseCache<V> {
    /// Creates a cache holding at most `max_size` entries for `ttl` each.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            max_size,
            ttl,
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Looks up a query, returning the stored value while it is fresh.
    ///
    /// A stale entry is deleted as a side effect and reported as a miss.
    pub fn get(&self, query: &str) -> Option<V> {
        let key = cache_key(query);
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let mut stats = self.stats.lock().expect("cache stats lock poisoned");

        match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                stats.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(&key);
                stats.expirations += 1;
                stats.misses += 1;
                None
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Inserts or overwrites the value for a query.
    ///
    /// When inserting a new key would exceed capacity, the single oldest
    /// entry by insertion time is evicted first.
    pub fn set(&self, query: &str, value: V) {
        if self.max_size == 0 {
            return;
        }

        let key = cache_key(query);
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let mut stats = self.stats.lock().expect("cache stats lock poisoned");

        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest_key) = oldest {
                entries.remove(&oldest_key);
                stats.evictions += 1;
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
        stats.insertions += 1;
    }

    /// Removes all entries. Statistics are preserved.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    /// Number of stored entries (fresh or stale).
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().expect("cache stats lock poisoned").clone()
    }
}

/// Stable hash of the normalized query string.
fn cache_key(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}
