//! Paperdrop Core Library
//!
//! Preview orchestration for finished downloads. The generator renders a
//! small initial window of a multi-page document through the external
//! renderer, caches the batch, and streams further pages on demand as the
//! viewer scrolls; the service facade wires the generator, cache, expiry
//! sweep, and download watcher together for the host UI.
//!
//! Failures never cross the boundary to the host: every error degrades to
//! an empty result and the host shows its generic fallback.

pub mod cursor;
pub mod generator;
pub mod keys;
pub mod service;

pub use cursor::{GenerationCursor, LoadMore, PreviewBatch};
pub use generator::{GeneratorConfig, PaginatedGenerator};
pub use service::{DownloadWatch, PreviewService, PreviewSink};
