//! Directory polling scanner.
//!
//! The pipeline detects downloads with nothing but filesystem polling, so
//! it cannot rely on a host event source being present. The scanner lists
//! the watch directory on a fixed interval and synthesizes a change event
//! for every new file and every file whose size moved since the last
//! scan. The stability watcher's debounce absorbs the resulting bursts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::trace;

/// Sink for synthesized change events.
pub type ChangeSink = Arc<dyn Fn(&Path) + Send + Sync>;

/// Background thread that polls a directory and reports file changes.
pub struct DirectoryScanner {
    thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl DirectoryScanner {
    /// Start scanning `dir` every `interval`, reporting changes to `sink`.
    ///
    /// A directory that does not exist (yet) is not an error; scans simply
    /// find nothing until it appears.
    pub fn start(dir: PathBuf, interval: Duration, sink: ChangeSink) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let thread = thread::Builder::new()
            .name("download-scan".to_string())
            .spawn(move || {
                Self::run(dir, interval, sink, shutdown_flag);
            })
            .expect("Failed to spawn directory scanner thread");

        Self {
            thread: Some(thread),
            shutdown,
        }
    }

    fn run(dir: PathBuf, interval: Duration, sink: ChangeSink, shutdown: Arc<AtomicBool>) {
        let mut known_sizes: HashMap<PathBuf, u64> = HashMap::new();

        while !shutdown.load(Ordering::Acquire) {
            Self::scan_once(&dir, &sink, &mut known_sizes);
            thread::sleep(interval);
        }
    }

    fn scan_once(dir: &Path, sink: &ChangeSink, known_sizes: &mut HashMap<PathBuf, u64>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(dir = %dir.display(), error = %e, "watch directory unreadable");
                return;
            }
        };

        let mut seen: HashMap<PathBuf, u64> = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let meta = match entry.metadata() {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            seen.insert(path, meta.len());
        }

        for (path, size) in &seen {
            match known_sizes.get(path) {
                Some(known) if known == size => {}
                _ => sink(path),
            }
        }

        *known_sizes = seen;
    }

    /// Stop the scanner and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.join().expect("Directory scanner thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::Mutex;

    fn test_dir(tag: &str) -> PathBuf {
        let nonce: u64 = rand::thread_rng().gen();
        let dir = std::env::temp_dir().join(format!("paperdrop-scan-{}-{}", tag, nonce));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn collecting_sink() -> (ChangeSink, Arc<Mutex<Vec<PathBuf>>>) {
        let events: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let sink: ChangeSink = Arc::new(move |path: &Path| {
            sink_events.lock().unwrap().push(path.to_path_buf());
        });
        (sink, events)
    }

    #[test]
    fn test_new_file_reported() {
        let dir = test_dir("new");
        let (sink, events) = collecting_sink();
        let scanner = DirectoryScanner::start(dir.clone(), Duration::from_millis(20), sink);

        let path = dir.join("incoming.pdf");
        fs::write(&path, b"data").unwrap();

        thread::sleep(Duration::from_millis(150));
        assert!(events.lock().unwrap().contains(&path));

        scanner.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_unchanged_file_reported_once() {
        let dir = test_dir("steady");
        let path = dir.join("steady.pdf");
        fs::write(&path, b"fixed contents").unwrap();

        let (sink, events) = collecting_sink();
        let scanner = DirectoryScanner::start(dir.clone(), Duration::from_millis(20), sink);

        thread::sleep(Duration::from_millis(200));
        let count = events
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == path)
            .count();
        assert_eq!(count, 1, "a steady file should only be reported on first sight");

        scanner.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_size_change_reported_again() {
        let dir = test_dir("grow");
        let path = dir.join("growing.pdf");
        fs::write(&path, b"v1").unwrap();

        let (sink, events) = collecting_sink();
        let scanner = DirectoryScanner::start(dir.clone(), Duration::from_millis(20), sink);

        thread::sleep(Duration::from_millis(100));
        fs::write(&path, b"version two, larger").unwrap();
        thread::sleep(Duration::from_millis(100));

        let count = events
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == path)
            .count();
        assert!(count >= 2, "size change should re-report, got {}", count);

        scanner.shutdown();
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_directory_is_not_fatal() {
        let dir = test_dir("missing").join("does-not-exist");
        let (sink, events) = collecting_sink();
        let scanner = DirectoryScanner::start(dir, Duration::from_millis(20), sink);

        thread::sleep(Duration::from_millis(100));
        assert!(events.lock().unwrap().is_empty());

        scanner.shutdown();
    }

    #[test]
    fn test_subdirectories_ignored() {
        let dir = test_dir("subdir");
        fs::create_dir(dir.join("nested")).unwrap();

        let (sink, events) = collecting_sink();
        let scanner = DirectoryScanner::start(dir.clone(), Duration::from_millis(20), sink);

        thread::sleep(Duration::from_millis(100));
        assert!(events.lock().unwrap().is_empty());

        scanner.shutdown();
        let _ = fs::remove_dir_all(dir);
    }
}
