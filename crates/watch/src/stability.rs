//! File-stability detection state machine.
//!
//! Per observed path: `Unseen -> Debouncing -> Polling -> Stable | Vanished`.
//! A change event for an eligible, unseen path starts a debounce timer;
//! further events in the burst reset it. When the burst quiesces, the
//! watcher samples the file's size on a fixed interval. Consecutive
//! unchanged non-zero samples mean the writer is done; the completion
//! callback fires exactly once per path for the lifetime of the watcher.
//! A path that disappears mid-poll is dropped silently — the download may
//! have been cancelled or moved, which is not an error.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::config::WatchConfig;

/// Callback invoked with each stabilized file path, exactly once per path.
pub type StableCallback = Arc<dyn Fn(&Path) + Send + Sync>;

/// Granularity of the internal timer thread. Debounce and poll deadlines
/// are observed within one tick.
const TIMER_TICK: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Waiting for the event burst to quiesce.
    Debouncing { deadline: Instant },
    /// Sampling the file size until it holds steady.
    Polling {
        next_sample: Instant,
        last_size: Option<u64>,
        stable_samples: u32,
    },
}

struct WatcherState {
    /// At most one record per path.
    records: HashMap<PathBuf, Phase>,
    /// Paths that already emitted a signal; later events for them are ignored.
    signaled: HashSet<PathBuf>,
}

struct Inner {
    state: Mutex<WatcherState>,
    config: WatchConfig,
    callback: StableCallback,
    shutdown: AtomicBool,
}

impl Inner {
    fn handle_event(&self, path: &Path) {
        if !self.config.is_eligible(path) {
            trace!(path = %path.display(), "ignoring ineligible path");
            return;
        }

        let mut state = self.state.lock().unwrap();
        if state.signaled.contains(path) {
            trace!(path = %path.display(), "already signaled, ignoring event");
            return;
        }

        let deadline = Instant::now() + self.config.debounce_window;
        match state.records.get_mut(path) {
            None => {
                state
                    .records
                    .insert(path.to_path_buf(), Phase::Debouncing { deadline });
                debug!(path = %path.display(), "debounce started");
            }
            Some(Phase::Debouncing { deadline: current }) => {
                // Still in the burst; only the last event starts polling.
                *current = deadline;
            }
            Some(Phase::Polling { .. }) => {
                // Already sampling; the size polls will see any new writes.
            }
        }
    }

    /// Advance every record whose deadline has passed. Stable callbacks
    /// are invoked after the state lock is released.
    fn tick(&self) {
        let now = Instant::now();
        let mut stable = Vec::new();

        {
            let mut state = self.state.lock().unwrap();
            let paths: Vec<PathBuf> = state.records.keys().cloned().collect();

            for path in paths {
                let phase = match state.records.get(&path) {
                    Some(phase) => *phase,
                    None => continue,
                };

                match phase {
                    Phase::Debouncing { deadline } => {
                        if deadline <= now {
                            // First sample is a full poll interval after the
                            // burst quiesced, not on the same tick.
                            state.records.insert(
                                path,
                                Phase::Polling {
                                    next_sample: now + self.config.poll_interval,
                                    last_size: None,
                                    stable_samples: 0,
                                },
                            );
                        }
                    }
                    Phase::Polling {
                        next_sample,
                        last_size,
                        stable_samples,
                    } => {
                        if next_sample > now {
                            continue;
                        }

                        let size = match fs::metadata(&path) {
                            Ok(meta) => meta.len(),
                            Err(_) => {
                                // Vanished: no signal, no error.
                                state.records.remove(&path);
                                debug!(path = %path.display(), "file vanished during polling");
                                continue;
                            }
                        };

                        let stable_samples = if size > 0 && last_size == Some(size) {
                            stable_samples + 1
                        } else if size > 0 {
                            1
                        } else {
                            0
                        };

                        if stable_samples >= self.config.required_stable_samples {
                            state.records.remove(&path);
                            state.signaled.insert(path.clone());
                            stable.push(path);
                        } else {
                            state.records.insert(
                                path,
                                Phase::Polling {
                                    next_sample: now + self.config.poll_interval,
                                    last_size: Some(size),
                                    stable_samples,
                                },
                            );
                        }
                    }
                }
            }
        }

        for path in stable {
            debug!(path = %path.display(), "download stable");
            (self.callback)(&path);
        }
    }
}

/// Cloneable handle for feeding change events into a running watcher.
///
/// Event sources (a host UI bridge or the [`crate::DirectoryScanner`])
/// hold one of these; the watcher itself keeps ownership of its timer
/// thread.
#[derive(Clone)]
pub struct WatcherHandle {
    inner: Arc<Inner>,
}

impl WatcherHandle {
    /// Report a filesystem change event for `path`.
    pub fn handle_event(&self, path: &Path) {
        self.inner.handle_event(path);
    }

    /// Whether `path` currently has a debounce/polling record.
    pub fn is_tracking(&self, path: &Path) -> bool {
        self.inner.state.lock().unwrap().records.contains_key(path)
    }

    /// Whether `path` has already emitted its completion signal.
    pub fn has_signaled(&self, path: &Path) -> bool {
        self.inner.state.lock().unwrap().signaled.contains(path)
    }

    /// Number of paths currently being debounced or polled.
    pub fn tracked_count(&self) -> usize {
        self.inner.state.lock().unwrap().records.len()
    }
}

/// Watches candidate files until their size holds steady, then signals
/// completion exactly once per path.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use paperdrop_watch::{StabilityWatcher, WatchConfig};
///
/// let watcher = StabilityWatcher::new(
///     WatchConfig::default(),
///     Arc::new(|path| println!("download finished: {}", path.display())),
/// );
///
/// // Feed events from whatever observes the filesystem:
/// watcher.handle().handle_event(std::path::Path::new("/downloads/report.pdf"));
/// # watcher.shutdown();
/// ```
pub struct StabilityWatcher {
    inner: Arc<Inner>,
    thread: Option<JoinHandle<()>>,
}

impl StabilityWatcher {
    /// Create a watcher and start its timer thread.
    pub fn new(config: WatchConfig, callback: StableCallback) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(WatcherState {
                records: HashMap::new(),
                signaled: HashSet::new(),
            }),
            config,
            callback,
            shutdown: AtomicBool::new(false),
        });

        let timer_inner = inner.clone();
        let thread = thread::Builder::new()
            .name("stability-watch".to_string())
            .spawn(move || {
                while !timer_inner.shutdown.load(Ordering::Acquire) {
                    thread::sleep(TIMER_TICK);
                    timer_inner.tick();
                }
            })
            .expect("Failed to spawn stability watcher thread");

        Self {
            inner,
            thread: Some(thread),
        }
    }

    /// Get a cloneable handle for event sources.
    pub fn handle(&self) -> WatcherHandle {
        WatcherHandle {
            inner: self.inner.clone(),
        }
    }

    /// Report a filesystem change event for `path`.
    pub fn handle_event(&self, path: &Path) {
        self.inner.handle_event(path);
    }

    /// Stop the watcher and wait for its timer thread to exit. Pending
    /// records are dropped without signaling.
    pub fn shutdown(mut self) {
        self.inner.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.join().expect("Stability watcher thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::fs::{File, OpenOptions};
    use std::io::Write;

    fn test_dir(tag: &str) -> PathBuf {
        let nonce: u64 = rand::thread_rng().gen();
        let dir = std::env::temp_dir().join(format!("paperdrop-watch-{}-{}", tag, nonce));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fast_config() -> WatchConfig {
        WatchConfig::default()
            .with_debounce_window(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(25))
    }

    fn collecting_watcher(config: WatchConfig) -> (StabilityWatcher, Arc<Mutex<Vec<PathBuf>>>) {
        let signals: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = signals.clone();
        let watcher = StabilityWatcher::new(
            config,
            Arc::new(move |path: &Path| {
                sink.lock().unwrap().push(path.to_path_buf());
            }),
        );
        (watcher, signals)
    }

    #[test]
    fn test_stable_file_signals_exactly_once() {
        let dir = test_dir("stable");
        let path = dir.join("report.pdf");
        fs::write(&path, b"finished download contents").unwrap();

        let (watcher, signals) = collecting_watcher(fast_config());
        watcher.handle_event(&path);

        thread::sleep(Duration::from_millis(400));
        assert_eq!(signals.lock().unwrap().as_slice(), &[path.clone()]);
        assert!(watcher.handle().has_signaled(&path));

        // A later, unrelated event for the same path is ignored.
        watcher.handle_event(&path);
        thread::sleep(Duration::from_millis(300));
        assert_eq!(signals.lock().unwrap().len(), 1);

        watcher.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_empty_file_never_signals_until_written() {
        let dir = test_dir("empty");
        let path = dir.join("report.pdf");
        File::create(&path).unwrap();

        let (watcher, signals) = collecting_watcher(fast_config());
        watcher.handle_event(&path);

        // Size 0 never counts as a stable sample.
        thread::sleep(Duration::from_millis(300));
        assert!(signals.lock().unwrap().is_empty());

        fs::write(&path, b"now it has contents").unwrap();
        thread::sleep(Duration::from_millis(300));
        assert_eq!(signals.lock().unwrap().len(), 1);

        watcher.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_samples_are_spaced_by_poll_interval() {
        let dir = test_dir("cadence");
        let path = dir.join("report.pdf");
        fs::write(&path, b"finished download contents").unwrap();

        // Long poll interval: two stable samples cannot both land before
        // debounce + 2 * poll_interval.
        let config = WatchConfig::default()
            .with_debounce_window(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(200));
        let (watcher, signals) = collecting_watcher(config);
        watcher.handle_event(&path);

        thread::sleep(Duration::from_millis(300));
        assert!(
            signals.lock().unwrap().is_empty(),
            "signal fired before two full poll intervals elapsed"
        );

        thread::sleep(Duration::from_millis(400));
        assert_eq!(signals.lock().unwrap().len(), 1);

        watcher.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_growth_resets_stability() {
        let dir = test_dir("growth");
        let path = dir.join("report.pdf");
        fs::write(&path, b"partial").unwrap();

        let (watcher, signals) = collecting_watcher(fast_config());
        watcher.handle_event(&path);

        // Keep the file growing past the debounce window and the first
        // few polls; no signal may fire while it grows.
        thread::sleep(Duration::from_millis(80));
        for _ in 0..4 {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(b"more data").unwrap();
            thread::sleep(Duration::from_millis(25));
        }

        // Growth stopped; the file stabilizes and signals once.
        thread::sleep(Duration::from_millis(400));
        assert_eq!(signals.lock().unwrap().len(), 1);

        watcher.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_vanished_file_emits_nothing() {
        let dir = test_dir("vanish");
        let path = dir.join("report.pdf");
        fs::write(&path, b"about to disappear").unwrap();

        let (watcher, signals) = collecting_watcher(fast_config());
        watcher.handle_event(&path);

        // Let the debounce elapse, then delete before stability is reached.
        thread::sleep(Duration::from_millis(60));
        fs::remove_file(&path).unwrap();

        thread::sleep(Duration::from_millis(300));
        assert!(signals.lock().unwrap().is_empty());
        assert!(!watcher.handle().is_tracking(&path));
        assert!(!watcher.handle().has_signaled(&path));

        watcher.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_burst_of_events_coalesces_to_one_record() {
        let dir = test_dir("burst");
        let path = dir.join("report.pdf");
        fs::write(&path, b"contents").unwrap();

        let (watcher, signals) = collecting_watcher(fast_config());
        let handle = watcher.handle();

        for _ in 0..5 {
            handle.handle_event(&path);
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(handle.tracked_count(), 1);

        thread::sleep(Duration::from_millis(400));
        assert_eq!(signals.lock().unwrap().len(), 1);

        watcher.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_ineligible_extension_is_ignored() {
        let dir = test_dir("inelig");
        let path = dir.join("song.mp3");
        fs::write(&path, b"audio").unwrap();

        let (watcher, signals) = collecting_watcher(fast_config());
        watcher.handle_event(&path);

        assert_eq!(watcher.handle().tracked_count(), 0);
        thread::sleep(Duration::from_millis(250));
        assert!(signals.lock().unwrap().is_empty());

        watcher.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_independent_paths_signal_independently() {
        let dir = test_dir("multi");
        let a = dir.join("a.pdf");
        let b = dir.join("b.docx");
        fs::write(&a, b"first").unwrap();
        fs::write(&b, b"second").unwrap();

        let (watcher, signals) = collecting_watcher(fast_config());
        watcher.handle_event(&a);
        watcher.handle_event(&b);

        thread::sleep(Duration::from_millis(400));
        let mut got = signals.lock().unwrap().clone();
        got.sort();
        let mut want = vec![a, b];
        want.sort();
        assert_eq!(got, want);

        watcher.shutdown();
        let _ = fs::remove_dir_all(dir);
    }
}
