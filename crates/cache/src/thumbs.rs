//! Thumbnail cache with time, size, and count bounded eviction.
//!
//! Stores preview batches keyed by opaque strings (whole-document or
//! page-range keys, chosen by the generator). Three limits are enforced
//! independently: entry age, aggregate payload size, and entry count.
//! Size and count eviction remove oldest-by-creation entries down to 80%
//! of the respective limit, leaving headroom before the next enforcement
//! pass is needed.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use paperdrop_render::PageImage;

use crate::config::CacheConfig;

/// A cache key identifying one cached batch.
///
/// Opaque to the cache: the same document cached under a whole-document
/// key and under a page-range key is two distinct entries.
pub type CacheKey = String;

/// Limits are enforced down to this percentage of the configured value,
/// not to the value itself.
const EVICTION_TARGET_PERCENT: usize = 80;

/// A cached preview batch.
///
/// Owned exclusively by the cache; `get` hands out clones.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key this entry is stored under
    pub key: CacheKey,

    /// Ordered page images of the batch
    pub pages: Vec<PageImage>,

    /// When the entry was inserted
    pub created_at: Instant,

    /// When the entry was last returned by `get`
    pub last_access_at: Instant,

    /// Number of times the entry has been returned (1 on insert)
    pub access_count: u64,
}

impl CacheEntry {
    /// Aggregate size of the payload in bytes (derived, not stored).
    pub fn size_bytes(&self) -> usize {
        self.pages.iter().map(PageImage::size_bytes).sum()
    }

    fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries currently cached
    pub entry_count: usize,

    /// Aggregate payload size in bytes
    pub size_used: usize,

    /// Number of cache hits
    pub hits: u64,

    /// Number of cache misses (including expired-on-read)
    pub misses: u64,

    /// Entries removed by size or count eviction
    pub evictions: u64,

    /// Entries removed because they aged out
    pub expirations: u64,
}

impl CacheStats {
    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Internal cache state.
struct CacheState {
    /// Map from key to entry
    entries: HashMap<CacheKey, CacheEntry>,

    /// Keys in insertion order (front = oldest created_at)
    insertion_order: VecDeque<CacheKey>,

    /// Aggregate payload size in bytes
    size_used: usize,

    config: CacheConfig,
    stats: CacheStats,
}

impl CacheState {
    fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            size_used: 0,
            config,
            stats: CacheStats::default(),
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.size_used = self.size_used.saturating_sub(entry.size_bytes());
        self.insertion_order.retain(|k| k != key);
        Some(entry)
    }

    /// Remove the oldest-by-creation entry. Returns false if empty.
    fn evict_oldest(&mut self) -> bool {
        if let Some(key) = self.insertion_order.pop_front() {
            if let Some(entry) = self.entries.remove(&key) {
                self.size_used = self.size_used.saturating_sub(entry.size_bytes());
                self.stats.evictions += 1;
                return true;
            }
        }
        false
    }

    /// Drop every entry older than the configured expiry. Returns the
    /// number removed.
    fn clean_expired(&mut self, now: Instant) -> usize {
        let expiry = self.config.expiry;
        let expired: Vec<CacheKey> = self
            .entries
            .values()
            .filter(|e| e.age_at(now) > expiry)
            .map(|e| e.key.clone())
            .collect();
        for key in &expired {
            self.remove_entry(key);
            self.stats.expirations += 1;
        }
        expired.len()
    }

    /// Full maintenance pass: expired entries first, then size eviction to
    /// 80% of the size limit, then count eviction to 80% of the entry
    /// limit, oldest-created first in both cases.
    fn maintain(&mut self, now: Instant) {
        self.clean_expired(now);

        if self.size_used > self.config.max_total_size {
            let target = self.config.max_total_size * EVICTION_TARGET_PERCENT / 100;
            while self.size_used > target && self.evict_oldest() {}
        }

        if self.entries.len() > self.config.max_entries {
            let target = self.config.max_entries * EVICTION_TARGET_PERCENT / 100;
            while self.entries.len() > target && self.evict_oldest() {}
        }

        self.refresh_stats();
    }

    fn refresh_stats(&mut self) {
        self.stats.entry_count = self.entries.len();
        self.stats.size_used = self.size_used;
    }
}

/// Thumbnail cache with TTL, size, and count bounded eviction.
///
/// Thread-safe: all mutation happens under a single mutex, including the
/// maintenance scan (which iterates while mutating).
///
/// # Example
///
/// ```
/// use paperdrop_cache::{CacheConfig, ThumbnailCache};
/// use paperdrop_render::PageImage;
///
/// let cache = ThumbnailCache::new(CacheConfig::default());
/// cache.put("doc:/tmp/report.pdf".into(), vec![PageImage::new(1, 4, vec![0u8; 1024])]);
///
/// if let Some(entry) = cache.get("doc:/tmp/report.pdf") {
///     println!("{} cached page(s)", entry.pages.len());
/// }
/// ```
pub struct ThumbnailCache {
    state: Arc<Mutex<CacheState>>,
}

impl ThumbnailCache {
    /// Create a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new(config))),
        }
    }

    /// Retrieve a batch by key.
    ///
    /// An entry past its expiry is removed on the spot and reported as a
    /// miss. On a hit, `last_access_at` and `access_count` are updated.
    /// Absence is the normal "not cached" outcome, never an error.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<CacheEntry> {
        let mut state = self.state.lock().unwrap();

        let expired = match state.entries.get(key) {
            Some(entry) => entry.age_at(now) > state.config.expiry,
            None => {
                state.stats.misses += 1;
                return None;
            }
        };

        if expired {
            state.remove_entry(key);
            state.stats.expirations += 1;
            state.stats.misses += 1;
            state.refresh_stats();
            return None;
        }

        let entry = state.entries.get_mut(key).expect("entry checked above");
        entry.last_access_at = now;
        entry.access_count += 1;
        let cloned = entry.clone();
        state.stats.hits += 1;
        Some(cloned)
    }

    /// Insert or overwrite a batch. Always runs a maintenance pass
    /// afterward, so limits hold immediately after the insert that
    /// crossed them.
    pub fn put(&self, key: CacheKey, pages: Vec<PageImage>) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();

        state.remove_entry(&key);

        let entry = CacheEntry {
            key: key.clone(),
            pages,
            created_at: now,
            last_access_at: now,
            access_count: 1,
        };
        state.size_used += entry.size_bytes();
        state.entries.insert(key.clone(), entry);
        state.insertion_order.push_back(key);

        state.maintain(now);
    }

    /// Run a maintenance pass: expiry, then size eviction, then count
    /// eviction.
    pub fn maintain(&self) {
        let mut state = self.state.lock().unwrap();
        state.maintain(Instant::now());
    }

    /// Remove expired entries only. Returns the number removed. This is
    /// the background sweep operation; it runs independently of `put` and
    /// `get` so an idle cache still sheds aged entries.
    pub fn clean_expired(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        let removed = state.clean_expired(Instant::now());
        state.refresh_stats();
        removed
    }

    /// Check for a key without touching access bookkeeping.
    pub fn contains(&self, key: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.entries.contains_key(key)
    }

    /// Remove an entry, returning it if present.
    pub fn remove(&self, key: &str) -> Option<CacheEntry> {
        let mut state = self.state.lock().unwrap();
        let removed = state.remove_entry(key);
        state.refresh_stats();
        removed
    }

    /// Clear all entries.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.insertion_order.clear();
        state.size_used = 0;
        state.refresh_stats();
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate payload size in bytes.
    pub fn size_used(&self) -> usize {
        self.state.lock().unwrap().size_used
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let mut state = self.state.lock().unwrap();
        state.refresh_stats();
        state.stats
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
