//! Paperdrop Cache Library
//!
//! Bounded in-memory store for generated page-preview batches. Entries
//! expire by age and are evicted oldest-first when either the aggregate
//! payload size or the entry count exceeds its configured limit, in both
//! cases down to an 80% target so steady insertion pressure does not
//! trigger an eviction scan on every put.

pub mod config;
pub mod sweep;
pub mod thumbs;

pub use config::{CacheConfig, ConfigError};
pub use sweep::CacheSweeper;
pub use thumbs::{CacheEntry, CacheKey, CacheStats, ThumbnailCache};
