//! Background expiry sweep.
//!
//! `put` and `get` already shed expired entries as a side effect, but an
//! idle cache would otherwise hold aged entries forever. The sweeper runs
//! `clean_expired` on a fixed interval (hourly by default) from its own
//! thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::thumbs::ThumbnailCache;

/// Background thread that periodically removes expired cache entries.
///
/// The thread checks for shutdown at a finer granularity than the sweep
/// interval so `shutdown()` returns promptly even with an hourly sweep.
pub struct CacheSweeper {
    thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl CacheSweeper {
    /// Start sweeping `cache` every `interval`.
    pub fn start(cache: Arc<ThumbnailCache>, interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let thread = thread::Builder::new()
            .name("thumb-cache-sweep".to_string())
            .spawn(move || {
                Self::run(cache, shutdown_flag, interval);
            })
            .expect("Failed to spawn cache sweeper thread");

        Self {
            thread: Some(thread),
            shutdown,
        }
    }

    fn run(cache: Arc<ThumbnailCache>, shutdown: Arc<AtomicBool>, interval: Duration) {
        let tick = Duration::from_millis(100).min(interval);
        let mut since_sweep = Duration::ZERO;

        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            thread::sleep(tick);
            since_sweep += tick;

            if since_sweep >= interval {
                let removed = cache.clean_expired();
                if removed > 0 {
                    debug!(removed, "expiry sweep removed entries");
                }
                since_sweep = Duration::ZERO;
            }
        }
    }

    /// Check if the sweeper is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop the sweeper and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.join().expect("Cache sweeper thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use paperdrop_render::PageImage;

    #[test]
    fn test_sweeper_removes_expired_entries_while_idle() {
        let config = CacheConfig::default().with_expiry(Duration::from_millis(30));
        let cache = Arc::new(ThumbnailCache::new(config));
        cache.put("a".into(), vec![PageImage::new(1, 1, vec![0u8; 64])]);

        let sweeper = CacheSweeper::start(cache.clone(), Duration::from_millis(50));

        // No get/put happens from here on; only the sweep can remove it.
        thread::sleep(Duration::from_millis(250));
        assert!(cache.is_empty(), "sweep should have removed the aged entry");

        sweeper.shutdown();
    }

    #[test]
    fn test_sweeper_leaves_fresh_entries() {
        let config = CacheConfig::default().with_expiry(Duration::from_secs(3600));
        let cache = Arc::new(ThumbnailCache::new(config));
        cache.put("a".into(), vec![PageImage::new(1, 1, vec![0u8; 64])]);

        let sweeper = CacheSweeper::start(cache.clone(), Duration::from_millis(30));
        thread::sleep(Duration::from_millis(150));

        assert_eq!(cache.len(), 1);
        sweeper.shutdown();
    }

    #[test]
    fn test_shutdown_is_prompt_for_long_intervals() {
        let cache = Arc::new(ThumbnailCache::default());
        let sweeper = CacheSweeper::start(cache, Duration::from_secs(3600));

        assert!(!sweeper.is_shutting_down());
        let start = std::time::Instant::now();
        sweeper.shutdown();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
