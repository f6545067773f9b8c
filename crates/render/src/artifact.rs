//! Collection and cleanup of temporary rasterization artifacts.
//!
//! The raster tool writes one image file per page under a caller-chosen
//! prefix. Those files are scoped to the batch: they must be gone by the
//! time the batch is handed to the cache, on success and failure alike.
//! [`ArtifactGuard`] ties the deletion to scope exit so a decode error or
//! panic cannot leak temp files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::page::PageImage;

/// PNG file signature; artifacts that fail this check are treated as
/// decode failures and dropped from the batch.
const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

/// Path of the artifact for one page: `<prefix>-<page_number>.<ext>`.
///
/// This naming is part of the external tool contract (`pdftoppm` appends
/// the page number itself).
pub fn artifact_path(output_prefix: &Path, page_number: u32, extension: &str) -> PathBuf {
    let mut name = output_prefix.as_os_str().to_os_string();
    name.push(format!("-{}.{}", page_number, extension));
    PathBuf::from(name)
}

/// Deletes a set of artifact files when dropped.
///
/// Deletion failures are logged and swallowed; they cannot affect the
/// correctness of the batch already read into memory.
pub struct ArtifactGuard {
    paths: Vec<PathBuf>,
}

impl ArtifactGuard {
    /// Guard the artifacts for an inclusive page range under `output_prefix`.
    pub fn for_range(output_prefix: &Path, first_page: u32, last_page: u32, extension: &str) -> Self {
        let paths = (first_page..=last_page)
            .map(|page| artifact_path(output_prefix, page, extension))
            .collect();
        Self { paths }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove artifact"),
            }
        }
    }
}

/// Read the artifacts for an inclusive page range into [`PageImage`]s.
///
/// Pages with no artifact are skipped (a partial batch is a normal,
/// successful outcome). Artifacts that are empty or not valid PNG are
/// dropped per-page. All artifacts in the range are deleted before this
/// function returns, whatever happens during decoding.
pub fn collect_pages(
    output_prefix: &Path,
    first_page: u32,
    last_page: u32,
    total_pages: u32,
    extension: &str,
) -> Vec<PageImage> {
    let _guard = ArtifactGuard::for_range(output_prefix, first_page, last_page, extension);

    let mut images = Vec::new();
    for page in first_page..=last_page {
        let path = artifact_path(output_prefix, page, extension);
        if !path.exists() {
            debug!(page, path = %path.display(), "artifact absent, skipping page");
            continue;
        }
        match fs::read(&path) {
            Ok(data) if data.len() >= PNG_MAGIC.len() && data[..PNG_MAGIC.len()] == PNG_MAGIC => {
                images.push(PageImage::new(page, total_pages, data));
            }
            Ok(_) => {
                warn!(page, path = %path.display(), "artifact not a valid PNG, dropping page");
            }
            Err(e) => {
                warn!(page, path = %path.display(), error = %e, "failed to read artifact, dropping page");
            }
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn unique_prefix(tag: &str) -> PathBuf {
        let nonce: u64 = rand::thread_rng().gen();
        std::env::temp_dir().join(format!("paperdrop-artifact-{}-{}", tag, nonce))
    }

    fn write_png(prefix: &Path, page: u32) -> PathBuf {
        let path = artifact_path(prefix, page, "png");
        let mut data = PNG_MAGIC.to_vec();
        data.extend_from_slice(&page.to_be_bytes());
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_artifact_path_embeds_page_number() {
        let path = artifact_path(Path::new("/tmp/pdf_thumb_17"), 3, "png");
        assert_eq!(path, PathBuf::from("/tmp/pdf_thumb_17-3.png"));
    }

    #[test]
    fn test_collect_reads_and_deletes_all_pages() {
        let prefix = unique_prefix("full");
        let paths: Vec<_> = (1..=3).map(|p| write_png(&prefix, p)).collect();

        let images = collect_pages(&prefix, 1, 3, 10, "png");
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].page_number, 1);
        assert_eq!(images[2].page_number, 3);
        assert!(images.iter().all(|i| i.total_pages == 10));

        for path in paths {
            assert!(!path.exists(), "artifact should be deleted: {:?}", path);
        }
    }

    #[test]
    fn test_missing_page_yields_partial_batch() {
        let prefix = unique_prefix("partial");
        write_png(&prefix, 1);
        // page 2 never written
        write_png(&prefix, 3);

        let images = collect_pages(&prefix, 1, 3, 3, "png");
        let pages: Vec<u32> = images.iter().map(|i| i.page_number).collect();
        assert_eq!(pages, vec![1, 3]);
    }

    #[test]
    fn test_invalid_artifact_dropped_but_deleted() {
        let prefix = unique_prefix("invalid");
        write_png(&prefix, 1);
        let bad = artifact_path(&prefix, 2, "png");
        fs::write(&bad, b"not a png").unwrap();

        let images = collect_pages(&prefix, 1, 2, 2, "png");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].page_number, 1);
        // Cleanup must run even for the page that failed to decode.
        assert!(!bad.exists());
    }

    #[test]
    fn test_empty_range_output_is_empty() {
        let prefix = unique_prefix("empty");
        let images = collect_pages(&prefix, 1, 2, 2, "png");
        assert!(images.is_empty());
    }

    #[test]
    fn test_guard_removes_leftovers_on_drop() {
        let prefix = unique_prefix("guard");
        let path = write_png(&prefix, 1);
        {
            let _guard = ArtifactGuard::for_range(&prefix, 1, 1, "png");
        }
        assert!(!path.exists());
    }
}
