//! Paginated preview generation.
//!
//! The generator renders lazily: for documents longer than the initial
//! window it rasterizes only the first two pages up front, then renders
//! further fixed-size windows as the host asks for them. Every batch is
//! cached; a repeated request for the same document or window never
//! reaches the external renderer.
//!
//! Concurrency contract: callers must not issue two `load_more` calls for
//! the same cursor concurrently. There is no internal de-duplication, so
//! concurrent identical requests do duplicate rendering work.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use paperdrop_cache::ThumbnailCache;
use paperdrop_render::{artifact, PageImage, PageRenderer, RenderResult};
use tracing::{debug, warn};

use crate::cursor::{GenerationCursor, LoadMore, PreviewBatch};
use crate::keys;

/// Configuration for the paginated generator.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    /// Documents with more pages than this get a lazy initial window of
    /// exactly this many pages; shorter documents are rendered whole.
    /// Default: 2.
    pub initial_page_limit: u32,

    /// Pages per load-more window. Default: 5.
    pub batch_size: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            initial_page_limit: 2,
            batch_size: 5,
        }
    }
}

impl GeneratorConfig {
    /// Set the initial window size.
    pub fn with_initial_page_limit(mut self, pages: u32) -> Self {
        self.initial_page_limit = pages.max(1);
        self
    }

    /// Set the load-more window size.
    pub fn with_batch_size(mut self, pages: u32) -> Self {
        self.batch_size = pages.max(1);
        self
    }
}

/// Orchestrates the external renderer and the thumbnail cache to produce
/// page batches on demand.
///
/// Cheap to clone; clones share the same renderer and cache.
#[derive(Clone)]
pub struct PaginatedGenerator {
    renderer: Arc<dyn PageRenderer>,
    cache: Arc<ThumbnailCache>,
    config: GeneratorConfig,
}

impl PaginatedGenerator {
    /// Create a generator over `renderer`, populating `cache`.
    pub fn new(renderer: Arc<dyn PageRenderer>, cache: Arc<ThumbnailCache>) -> Self {
        Self::with_config(renderer, cache, GeneratorConfig::default())
    }

    /// Create a generator with a custom configuration.
    pub fn with_config(
        renderer: Arc<dyn PageRenderer>,
        cache: Arc<ThumbnailCache>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            renderer,
            cache,
            config,
        }
    }

    /// Generate the initial preview batch for `document`.
    ///
    /// Returns the cached batch without touching the renderer when one
    /// exists. Otherwise queries the page count, rasterizes the initial
    /// window, caches the result, and returns it with a fresh cursor.
    /// `None` means nothing could be produced; the host shows its generic
    /// fallback. No error crosses this boundary.
    pub fn generate_initial(&self, document: &Path) -> Option<PreviewBatch> {
        let key = keys::document_key(document);
        if let Some(entry) = self.cache.get(&key) {
            debug!(document = %document.display(), "initial preview served from cache");
            return PreviewBatch::from_pages(document, entry.pages);
        }

        match self.render_initial(document, &key) {
            Ok(batch) => batch,
            Err(err) => {
                warn!(document = %document.display(), error = %err, "initial preview generation failed");
                None
            }
        }
    }

    /// Render the next window of pages for `cursor`.
    ///
    /// Returns [`LoadMore::Exhausted`] without invoking the renderer once
    /// every page has been generated. A window already in the cache is
    /// returned from there. Render failures degrade to an empty batch and
    /// leave the cursor unchanged so the host may retry later.
    pub fn load_more(&self, cursor: &mut GenerationCursor) -> LoadMore {
        let (first, last) = match cursor.next_window(self.config.batch_size) {
            Some(window) => window,
            None => {
                debug!(document = %cursor.document_path.display(), "pagination exhausted");
                return LoadMore::Exhausted;
            }
        };

        let key = keys::range_key(&cursor.document_path, first, last);
        if let Some(entry) = self.cache.get(&key) {
            debug!(
                document = %cursor.document_path.display(),
                first, last,
                "page range served from cache"
            );
            if let Some(max) = entry.pages.iter().map(|p| p.page_number).max() {
                cursor.advance_to(max);
            }
            return LoadMore::Batch(entry.pages);
        }

        let document = cursor.document_path.clone();
        match self.render_window(&document, first, last, cursor.total_pages) {
            Ok(images) => {
                match images.iter().map(|p| p.page_number).max() {
                    Some(max) => {
                        self.cache.put(key, images.clone());
                        cursor.advance_to(max);
                        LoadMore::Batch(images)
                    }
                    None => LoadMore::Batch(Vec::new()),
                }
            }
            Err(err) => {
                warn!(
                    document = %document.display(),
                    first, last,
                    error = %err,
                    "load-more rendering failed"
                );
                LoadMore::Batch(Vec::new())
            }
        }
    }

    fn render_initial(&self, document: &Path, key: &str) -> RenderResult<Option<PreviewBatch>> {
        let total_pages = self.renderer.page_count(document)?;

        let last = if total_pages <= self.config.initial_page_limit {
            total_pages
        } else {
            self.config.initial_page_limit
        };

        let images = self.render_window(document, 1, last, total_pages)?;
        match PreviewBatch::from_pages(document, images) {
            Some(batch) => {
                self.cache.put(key.to_string(), batch.images.clone());
                Ok(Some(batch))
            }
            None => {
                debug!(document = %document.display(), "initial window produced no images");
                Ok(None)
            }
        }
    }

    /// Rasterize an inclusive window and collect the artifacts. The
    /// artifact collector deletes the temp files on every exit path.
    fn render_window(
        &self,
        document: &Path,
        first_page: u32,
        last_page: u32,
        total_pages: u32,
    ) -> RenderResult<Vec<PageImage>> {
        let prefix = batch_output_prefix();
        self.renderer
            .rasterize(document, first_page, last_page, &prefix)?;
        Ok(artifact::collect_pages(
            &prefix,
            first_page,
            last_page,
            total_pages,
            self.renderer.artifact_extension(),
        ))
    }
}

/// Per-batch output prefix in the OS temp directory.
///
/// The reference scheme was timestamp-only, which collides when two
/// batches start within the same millisecond; pid and a process-wide
/// sequence number are appended to keep prefixes distinct.
fn batch_output_prefix() -> PathBuf {
    static BATCH_SEQ: AtomicU64 = AtomicU64::new(0);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let seq = BATCH_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pdf_thumb_{}_{}_{}", process::id(), millis, seq))
}
