//! Service facade wiring the pipeline together.
//!
//! The host constructs one [`PreviewService`] and talks only to it: it
//! owns the thumbnail cache, its hourly expiry sweep, and the paginated
//! generator, and can optionally stand up download watching so that
//! finished downloads get their initial preview pushed to a sink without
//! the host asking.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use paperdrop_cache::{CacheConfig, CacheSweeper, ThumbnailCache};
use paperdrop_render::PageRenderer;
use paperdrop_watch::{DirectoryScanner, StabilityWatcher, WatchConfig, WatcherHandle};
use tracing::{debug, info};

use crate::cursor::{GenerationCursor, LoadMore, PreviewBatch};
use crate::generator::{GeneratorConfig, PaginatedGenerator};

/// Sink receiving the initial preview for each stabilized download.
/// `None` means generation produced nothing and the host should show its
/// generic fallback for that file.
pub type PreviewSink = Arc<dyn Fn(&Path, Option<PreviewBatch>) + Send + Sync>;

/// Entry point owning the cache, the expiry sweep, and the generator.
pub struct PreviewService {
    cache: Arc<ThumbnailCache>,
    generator: PaginatedGenerator,
    sweeper: Option<CacheSweeper>,
}

impl PreviewService {
    /// Create a service over `renderer` with default pagination settings.
    /// The expiry sweep starts immediately, on the interval carried by
    /// `cache_config`.
    pub fn new(renderer: Arc<dyn PageRenderer>, cache_config: CacheConfig) -> Self {
        Self::with_config(renderer, cache_config, GeneratorConfig::default())
    }

    /// Create a service with custom pagination settings.
    pub fn with_config(
        renderer: Arc<dyn PageRenderer>,
        cache_config: CacheConfig,
        generator_config: GeneratorConfig,
    ) -> Self {
        let sweep_interval = cache_config.sweep_interval;
        let cache = Arc::new(ThumbnailCache::new(cache_config));
        let sweeper = CacheSweeper::start(cache.clone(), sweep_interval);
        let generator = PaginatedGenerator::with_config(renderer, cache.clone(), generator_config);

        info!(
            sweep_secs = sweep_interval.as_secs(),
            "preview service started"
        );

        Self {
            cache,
            generator,
            sweeper: Some(sweeper),
        }
    }

    /// Generate (or fetch from cache) the initial preview for `document`.
    pub fn generate_initial(&self, document: &Path) -> Option<PreviewBatch> {
        self.generator.generate_initial(document)
    }

    /// Render the next page window for `cursor`.
    pub fn load_more(&self, cursor: &mut GenerationCursor) -> LoadMore {
        self.generator.load_more(cursor)
    }

    /// Shared handle to the thumbnail cache, for host-side stats or
    /// manual invalidation.
    pub fn cache(&self) -> Arc<ThumbnailCache> {
        self.cache.clone()
    }

    /// Start watching for finished downloads.
    ///
    /// A polling scanner feeds change events into the stability watcher.
    /// Stable paths are queued to a dedicated generation thread, which
    /// renders the initial preview and pushes it to `sink`; the watcher's
    /// own timer thread never waits on the renderer, so a slow or hung
    /// render stalls only the queued generations, not stability detection
    /// for other downloads. The returned handle keeps the background
    /// threads alive.
    pub fn watch_downloads(&self, config: WatchConfig, sink: PreviewSink) -> DownloadWatch {
        let watch_dir = config.watch_dir.clone();
        let scan_interval = config.scan_interval;

        let (stable_tx, stable_rx) = mpsc::channel::<PathBuf>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let generator = self.generator.clone();
        let generation_shutdown = shutdown.clone();
        let generation = thread::Builder::new()
            .name("preview-gen".to_string())
            .spawn(move || {
                Self::run_generation(stable_rx, generator, sink, generation_shutdown);
            })
            .expect("Failed to spawn preview generation thread");

        let stable_tx = Mutex::new(stable_tx);
        let watcher = StabilityWatcher::new(
            config,
            Arc::new(move |path: &Path| {
                debug!(path = %path.display(), "download stable, queueing preview");
                let _ = stable_tx.lock().unwrap().send(path.to_path_buf());
            }),
        );

        let handle = watcher.handle();
        let scanner = DirectoryScanner::start(
            watch_dir.clone(),
            scan_interval,
            Arc::new(move |path: &Path| handle.handle_event(path)),
        );

        info!(dir = %watch_dir.display(), "watching for downloads");
        DownloadWatch {
            watcher,
            scanner,
            generation: Some(generation),
            shutdown,
        }
    }

    fn run_generation(
        stable_rx: mpsc::Receiver<PathBuf>,
        generator: PaginatedGenerator,
        sink: PreviewSink,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            match stable_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(path) => {
                    let batch = generator.generate_initial(&path);
                    sink(&path, batch);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Stop the expiry sweep. Any [`DownloadWatch`] handles must be shut
    /// down separately by their owners.
    pub fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown();
        }
    }
}

/// Running download watch: a directory scanner feeding a stability
/// watcher, whose stable paths drain to a generation thread. Dropping it
/// without calling [`DownloadWatch::shutdown`] leaves the threads running
/// for the life of the process.
pub struct DownloadWatch {
    watcher: StabilityWatcher,
    scanner: DirectoryScanner,
    generation: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl DownloadWatch {
    /// Handle for injecting change events from an additional source,
    /// such as a host UI bridge.
    pub fn handle(&self) -> WatcherHandle {
        self.watcher.handle()
    }

    /// Stop the scanner, the watcher, and the generation thread, waiting
    /// for all three. Stable paths still queued are dropped without a
    /// preview.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.scanner.shutdown();
        self.watcher.shutdown();
        if let Some(generation) = self.generation.take() {
            generation.join().expect("Preview generation thread panicked");
        }
    }
}
