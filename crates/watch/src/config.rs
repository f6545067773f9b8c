//! Watcher configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the stability watcher and directory scanner.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory observed for finished downloads.
    pub watch_dir: PathBuf,

    /// Quiet period after the last change event before polling starts.
    /// Default: 1000ms.
    pub debounce_window: Duration,

    /// Interval between file-size samples while polling.
    /// Default: 500ms.
    pub poll_interval: Duration,

    /// Consecutive samples of the same non-zero size required to declare
    /// the file stable. Default: 2.
    pub required_stable_samples: u32,

    /// Interval between directory scans when using [`crate::DirectoryScanner`].
    /// Default: 500ms.
    pub scan_interval: Duration,

    /// File extensions (lowercase, without dot) eligible for preview.
    pub extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            watch_dir: Self::default_watch_dir(),
            debounce_window: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(500),
            required_stable_samples: 2,
            scan_interval: Duration::from_millis(500),
            extensions: Self::default_extensions(),
        }
    }
}

impl WatchConfig {
    /// Create a configuration watching the given directory with defaults
    /// for everything else.
    pub fn new<P: Into<PathBuf>>(watch_dir: P) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            ..Self::default()
        }
    }

    /// Set the watched directory.
    pub fn with_watch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.watch_dir = dir.into();
        self
    }

    /// Set the debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Set the size-poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the required consecutive stable samples.
    pub fn with_required_stable_samples(mut self, samples: u32) -> Self {
        self.required_stable_samples = samples.max(1);
        self
    }

    /// Set the directory scan interval.
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Replace the eligible extension set (lowercase, without dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// The platform downloads directory, falling back to the current
    /// directory when the platform has no notion of one.
    pub fn default_watch_dir() -> PathBuf {
        dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Document extensions eligible for preview by default.
    pub fn default_extensions() -> Vec<String> {
        ["pdf", "doc", "docx", "txt", "rtf", "odt"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Whether a path's extension is in the eligible set (case-insensitive).
    pub fn is_eligible(&self, path: &std::path::Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| e == &ext)
            }
            None => false,
        }
    }
}
