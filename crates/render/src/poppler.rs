//! Out-of-process page rendering via the Poppler command-line tools.
//!
//! The preview pipeline never rasterizes pages itself. Page counts come
//! from `pdfinfo` and page images from `pdftoppm`, both invoked as child
//! processes. The command contract is fixed:
//!
//! - `pdfinfo <doc>` — page count parsed from the `Pages:` line.
//! - `pdftoppm -png -f <first> -l <last> -scale-to <width> <doc> <prefix>`
//!   — one PNG per page, named `<prefix>-<page>.png`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors from the external renderer.
///
/// Callers above the generator boundary never see these; the generator
/// degrades them to an empty result. They exist so the failure site is
/// precise in logs.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("page count unavailable for {document}: {reason}")]
    PageCountUnavailable { document: PathBuf, reason: String },
    #[error("rasterization of pages {first}-{last} failed for {document}: {reason}")]
    RasterizationFailed {
        document: PathBuf,
        first: u32,
        last: u32,
        reason: String,
    },
}

/// Capability interface over the external renderer tooling.
///
/// Two operations: query the page count of a document, and rasterize an
/// inclusive page range to image files under a caller-chosen output prefix.
/// The rasterizer must write one file per page named
/// `<prefix>-<page_number>.<ext>`; pages it cannot produce are simply
/// absent, which the artifact collector treats as a partial (not failed)
/// batch.
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document. Must be positive on success.
    fn page_count(&self, document: &Path) -> RenderResult<u32>;

    /// Rasterize the inclusive page range `[first_page, last_page]` to
    /// image files under `output_prefix`.
    fn rasterize(
        &self,
        document: &Path,
        first_page: u32,
        last_page: u32,
        output_prefix: &Path,
    ) -> RenderResult<()>;

    /// File extension of the artifacts the raster tool writes.
    fn artifact_extension(&self) -> &str {
        "png"
    }
}

/// Default target width in pixels for rasterized pages.
pub const DEFAULT_TARGET_WIDTH: u32 = 800;

/// Poppler-backed renderer (`pdfinfo` + `pdftoppm`).
///
/// Binaries are resolved through `PATH` by default; both can be overridden
/// for sandboxed or bundled installs.
pub struct PopplerRenderer {
    pdfinfo_bin: PathBuf,
    pdftoppm_bin: PathBuf,
    target_width: u32,
}

impl Default for PopplerRenderer {
    fn default() -> Self {
        Self {
            pdfinfo_bin: PathBuf::from("pdfinfo"),
            pdftoppm_bin: PathBuf::from("pdftoppm"),
            target_width: DEFAULT_TARGET_WIDTH,
        }
    }
}

impl PopplerRenderer {
    /// Create a renderer with the default binaries and target width.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target image width in pixels (`pdftoppm -scale-to`).
    pub fn with_target_width(mut self, width: u32) -> Self {
        self.target_width = width;
        self
    }

    /// Override the locations of the Poppler binaries.
    pub fn with_binaries<P: AsRef<Path>>(mut self, pdfinfo: P, pdftoppm: P) -> Self {
        self.pdfinfo_bin = pdfinfo.as_ref().to_path_buf();
        self.pdftoppm_bin = pdftoppm.as_ref().to_path_buf();
        self
    }

    /// Get the configured target width.
    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    fn page_count_error(&self, document: &Path, reason: impl Into<String>) -> RenderError {
        RenderError::PageCountUnavailable {
            document: document.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl PageRenderer for PopplerRenderer {
    fn page_count(&self, document: &Path) -> RenderResult<u32> {
        let output = Command::new(&self.pdfinfo_bin)
            .arg(document)
            .output()
            .map_err(|e| self.page_count_error(document, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.page_count_error(
                document,
                format!("pdfinfo exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let pages = parse_page_count(&stdout)
            .ok_or_else(|| self.page_count_error(document, "no positive page count in output"))?;

        debug!(document = %document.display(), pages, "page count query");
        Ok(pages)
    }

    fn rasterize(
        &self,
        document: &Path,
        first_page: u32,
        last_page: u32,
        output_prefix: &Path,
    ) -> RenderResult<()> {
        let fail = |reason: String| RenderError::RasterizationFailed {
            document: document.to_path_buf(),
            first: first_page,
            last: last_page,
            reason,
        };

        let output = Command::new(&self.pdftoppm_bin)
            .arg("-png")
            .arg("-f")
            .arg(first_page.to_string())
            .arg("-l")
            .arg(last_page.to_string())
            .arg("-scale-to")
            .arg(self.target_width.to_string())
            .arg(document)
            .arg(output_prefix)
            .output()
            .map_err(|e| fail(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        debug!(
            document = %document.display(),
            first_page,
            last_page,
            prefix = %output_prefix.display(),
            "rasterized page range"
        );
        Ok(())
    }
}

/// Parse the page count from `pdfinfo` output.
///
/// Returns `None` for missing, unparsable, or non-positive counts; the
/// renderer treats all three as the same failure.
fn parse_page_count(output: &str) -> Option<u32> {
    let line = output.lines().find(|l| l.starts_with("Pages:"))?;
    let value = line.trim_start_matches("Pages:").trim();
    match value.parse::<u32>() {
        Ok(pages) if pages > 0 => Some(pages),
        _ => None,
    }
}
