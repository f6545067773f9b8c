//! Paperdrop Render Library
//!
//! External page-rendering capability for the preview pipeline. Page
//! rasterization is delegated to out-of-process Poppler tools (`pdfinfo`
//! for page counts, `pdftoppm` for page images); this crate wraps that
//! command contract behind the [`PageRenderer`] trait so the rest of the
//! pipeline can be driven by a fake renderer in tests.

pub mod artifact;
pub mod page;
pub mod poppler;

pub use artifact::{artifact_path, collect_pages, ArtifactGuard};
pub use page::PageImage;
pub use poppler::{PageRenderer, PopplerRenderer, RenderError, RenderResult};
