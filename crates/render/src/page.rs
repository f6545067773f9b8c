//! Rendered page images.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A single rendered page of a document.
///
/// Immutable once produced. The image data is the encoded PNG bytes as
/// written by the external raster tool; the pipeline never re-encodes it.
/// `total_pages` is carried alongside so a cached batch is self-describing:
/// a pagination cursor can be rebuilt from the batch alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-based page number within the source document
    pub page_number: u32,

    /// Total number of pages in the source document
    pub total_pages: u32,

    /// Encoded image bytes (PNG)
    pub data: Vec<u8>,
}

impl PageImage {
    /// Create a new page image.
    pub fn new(page_number: u32, total_pages: u32, data: Vec<u8>) -> Self {
        Self {
            page_number,
            total_pages,
            data,
        }
    }

    /// Size of the encoded image data in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Encode the image as a `data:` URL for host UIs that render previews
    /// from an inline source rather than a file path.
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bytes() {
        let image = PageImage::new(1, 10, vec![0u8; 1234]);
        assert_eq!(image.size_bytes(), 1234);
    }

    #[test]
    fn test_data_url_prefix_and_payload() {
        let image = PageImage::new(3, 5, vec![0x89, 0x50, 0x4E, 0x47]);
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let encoded = url.trim_start_matches("data:image/png;base64,");
        let decoded = BASE64.decode(encoded).unwrap();
        assert_eq!(decoded, image.data);
    }

    #[test]
    fn test_clone_is_deep() {
        let image = PageImage::new(2, 12, vec![1, 2, 3]);
        let mut cloned = image.clone();
        cloned.data.push(4);
        assert_eq!(image.data, vec![1, 2, 3]);
    }
}
