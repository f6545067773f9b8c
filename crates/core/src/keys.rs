//! Cache key scheme.
//!
//! Two key shapes: a whole-document key for the initial batch and a
//! range-scoped key per load-more window. Two requests for the same
//! document but different ranges are distinct cache entries.

use std::path::Path;

/// Key for the initial preview batch of a document.
pub fn document_key(document: &Path) -> String {
    format!("doc:{}", document.display())
}

/// Key for one rendered page range of a document.
pub fn range_key(document: &Path, first_page: u32, last_page: u32) -> String {
    format!("doc:{}#{}-{}", document.display(), first_page, last_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key_is_path_scoped() {
        let a = document_key(Path::new("/downloads/a.pdf"));
        let b = document_key(Path::new("/downloads/b.pdf"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_range_keys_distinct_per_window() {
        let doc = Path::new("/downloads/report.pdf");
        let first = range_key(doc, 3, 7);
        let second = range_key(doc, 8, 12);
        assert_ne!(first, second);
        assert_ne!(first, document_key(doc));
    }
}
