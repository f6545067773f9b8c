//! Pagination cursor and batch types returned across the host boundary.

use std::path::{Path, PathBuf};

use paperdrop_render::PageImage;
use serde::{Deserialize, Serialize};

/// Caller-held token recording how far into a document rendering has
/// progressed.
///
/// `highest_generated_page` is monotonically non-decreasing and never
/// exceeds `total_pages`. The host passes the cursor back to
/// [`crate::PaginatedGenerator::load_more`] on viewport-proximity
/// triggers until exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCursor {
    /// Document the cursor belongs to
    pub document_path: PathBuf,

    /// Total pages in the document
    pub total_pages: u32,

    /// Highest page number rendered so far (1-based)
    pub highest_generated_page: u32,
}

impl GenerationCursor {
    /// Create a cursor after an initial batch rendered up to
    /// `highest_generated_page`.
    pub fn new(document_path: &Path, total_pages: u32, highest_generated_page: u32) -> Self {
        Self {
            document_path: document_path.to_path_buf(),
            total_pages,
            highest_generated_page: highest_generated_page.min(total_pages),
        }
    }

    /// Whether every page of the document has been rendered.
    pub fn is_exhausted(&self) -> bool {
        self.highest_generated_page >= self.total_pages
    }

    /// The next inclusive page window of at most `batch_size` pages, or
    /// `None` when exhausted.
    pub fn next_window(&self, batch_size: u32) -> Option<(u32, u32)> {
        if self.is_exhausted() {
            return None;
        }
        let first = self.highest_generated_page + 1;
        let last = (self.highest_generated_page + batch_size).min(self.total_pages);
        Some((first, last))
    }

    /// Advance the cursor to `page`. Never moves backwards and never
    /// exceeds `total_pages`.
    pub fn advance_to(&mut self, page: u32) {
        self.highest_generated_page = self
            .highest_generated_page
            .max(page.min(self.total_pages));
    }
}

/// A batch of rendered pages together with the pagination cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewBatch {
    /// Rendered page images, ordered by page number
    pub images: Vec<PageImage>,

    /// Cursor for requesting further pages
    pub cursor: GenerationCursor,
}

impl PreviewBatch {
    /// Rebuild a batch from cached pages. Returns `None` for an empty
    /// payload, which the cache never stores but the boundary treats as
    /// "nothing produced".
    pub(crate) fn from_pages(document: &Path, images: Vec<PageImage>) -> Option<Self> {
        let highest = images.iter().map(|i| i.page_number).max()?;
        let total_pages = images.first().map(|i| i.total_pages)?;
        Some(Self {
            images,
            cursor: GenerationCursor::new(document, total_pages, highest),
        })
    }
}

/// Result of a load-more request.
#[derive(Debug, Clone)]
pub enum LoadMore {
    /// Rendered (or cached) pages for the next window. May be empty when
    /// rendering produced nothing; the host falls back to a placeholder.
    Batch(Vec<PageImage>),

    /// Every page has already been generated; no renderer was invoked.
    Exhausted,
}

impl LoadMore {
    /// Whether this is the exhausted signal.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, LoadMore::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_window_progression() {
        let mut cursor = GenerationCursor::new(Path::new("/d/report.pdf"), 12, 2);
        assert_eq!(cursor.next_window(5), Some((3, 7)));

        cursor.advance_to(7);
        assert_eq!(cursor.next_window(5), Some((8, 12)));

        cursor.advance_to(12);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.next_window(5), None);
    }

    #[test]
    fn test_single_page_document_starts_exhausted() {
        let cursor = GenerationCursor::new(Path::new("/d/one.pdf"), 1, 1);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.next_window(5), None);
    }

    #[test]
    fn test_advance_is_monotonic_and_clamped() {
        let mut cursor = GenerationCursor::new(Path::new("/d/report.pdf"), 10, 5);
        cursor.advance_to(3);
        assert_eq!(cursor.highest_generated_page, 5);
        cursor.advance_to(99);
        assert_eq!(cursor.highest_generated_page, 10);
    }

    #[test]
    fn test_new_clamps_to_total() {
        let cursor = GenerationCursor::new(Path::new("/d/report.pdf"), 4, 9);
        assert_eq!(cursor.highest_generated_page, 4);
    }

    #[test]
    fn test_batch_from_pages_rebuilds_cursor() {
        let doc = Path::new("/d/report.pdf");
        let pages = vec![
            PageImage::new(1, 12, vec![1]),
            PageImage::new(2, 12, vec![2]),
        ];
        let batch = PreviewBatch::from_pages(doc, pages).unwrap();
        assert_eq!(batch.cursor.total_pages, 12);
        assert_eq!(batch.cursor.highest_generated_page, 2);
        assert!(PreviewBatch::from_pages(doc, Vec::new()).is_none());
    }

    #[test]
    fn test_boundary_types_serialize() {
        let doc = Path::new("/d/report.pdf");
        let batch =
            PreviewBatch::from_pages(doc, vec![PageImage::new(1, 3, vec![9, 9])]).unwrap();

        let json = serde_json::to_string(&batch).unwrap();
        let back: PreviewBatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cursor, batch.cursor);
        assert_eq!(back.images.len(), 1);
    }
}
