//! Paperdrop Watch Library
//!
//! Download-completion detection. A file that appears in the watched
//! directory may still be mid-write; the only portable signal that the
//! writer has finished is the file's size holding steady. This crate
//! debounces bursts of change events per path, then polls the candidate
//! file's size until it is unchanged across consecutive samples, and
//! emits a "download complete" callback exactly once per path.

pub mod config;
pub mod scan;
pub mod stability;

pub use config::WatchConfig;
pub use scan::{ChangeSink, DirectoryScanner};
pub use stability::{StabilityWatcher, StableCallback, WatcherHandle};
