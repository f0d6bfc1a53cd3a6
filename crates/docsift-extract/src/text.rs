//! Plain text and markdown extractor.

use async_trait::async_trait;
use docsift_core::{ContentExtractor, ExtractError, ExtractedContent};
use std::path::Path;
use tokio::fs;

use crate::extension_of;

const EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Extractor for plain text files. Content is read as-is.
pub struct TextExtractor;

impl TextExtractor {
    /// Create a new text extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for TextExtractor {
    fn supported_types(&self) -> &[&str] {
        &["text/plain", "text/markdown", "text/x-markdown"]
    }

    fn can_extract(&self, path: &Path, _mime_type: &str) -> bool {
        self.can_extract_by_extension(path)
    }

    fn can_extract_by_extension(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| EXTENSIONS.contains(&ext.as_str()))
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let bytes = fs::read(path).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ExtractError::Parse(format!("{}: {e}", path.display())))?;
        Ok(ExtractedContent::new(text))
    }
}
