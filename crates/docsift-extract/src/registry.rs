//! Extractor registry for routing files to content extractors.

use docsift_core::{normalize_content, ContentExtractor, ExtractError, ExtractedContent};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::{CsvExtractor, PdfExtractor, SpreadsheetExtractor, TextExtractor};

/// Registry of content extractors.
///
/// Dispatch is by MIME type (guessed from the extension) first, then by
/// asking each extractor whether it accepts the extension. A MIME hit still
/// has to pass the extractor's own `can_extract`, so an extractor with an
/// extension allow-list never sees files outside it.
pub struct ExtractorRegistry {
    /// Named extractors, in registration order
    extractors: Vec<(String, Arc<dyn ContentExtractor>)>,
    /// MIME type to extractor index
    mime_mapping: HashMap<String, usize>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
            mime_mapping: HashMap::new(),
        }
    }

    /// Registry with the PDF, spreadsheet, CSV and text extractors.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("pdf", PdfExtractor::new());
        registry.register("spreadsheet", SpreadsheetExtractor::new());
        registry.register("csv", CsvExtractor::new());
        registry.register("text", TextExtractor::new());
        registry
    }

    /// Register an extractor. A later registration under the same name
    /// replaces the earlier one.
    pub fn register<E: ContentExtractor + 'static>(&mut self, name: &str, extractor: E) {
        let extractor: Arc<dyn ContentExtractor> = Arc::new(extractor);
        let index = match self.extractors.iter().position(|(n, _)| n == name) {
            Some(index) => {
                self.mime_mapping.retain(|_, i| *i != index);
                self.extractors[index].1 = Arc::clone(&extractor);
                index
            }
            None => {
                self.extractors.push((name.to_string(), Arc::clone(&extractor)));
                self.extractors.len() - 1
            }
        };
        for mime in extractor.supported_types() {
            self.mime_mapping.insert((*mime).to_string(), index);
        }
    }

    /// Names of registered extractors.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.extractors.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// MIME type guessed from the file extension.
    #[must_use]
    pub fn mime_for(path: &Path) -> String {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// Get an extractor for a MIME type.
    #[must_use]
    pub fn get_for_mime(&self, mime_type: &str) -> Option<Arc<dyn ContentExtractor>> {
        self.mime_mapping
            .get(mime_type)
            .and_then(|&index| self.extractors.get(index))
            .map(|(_, extractor)| Arc::clone(extractor))
    }

    /// Get an extractor that can handle a file.
    #[must_use]
    pub fn get_for_file(&self, path: &Path) -> Option<Arc<dyn ContentExtractor>> {
        let mime_type = Self::mime_for(path);

        // First try by MIME type
        if let Some(extractor) = self
            .get_for_mime(&mime_type)
            .filter(|extractor| extractor.can_extract(path, &mime_type))
        {
            return Some(extractor);
        }

        // Then by extension
        self.extractors
            .iter()
            .find(|(_, extractor)| extractor.can_extract(path, &mime_type))
            .map(|(_, extractor)| Arc::clone(extractor))
    }

    /// Whether some extractor accepts this file.
    #[must_use]
    pub fn supports(&self, path: &Path) -> bool {
        self.get_for_file(path).is_some()
    }

    /// Extract and normalize the content of a file.
    ///
    /// # Errors
    ///
    /// `UnsupportedType` when no extractor accepts the file, `EmptyContent`
    /// when nothing is left after normalization, or the extractor's error.
    pub async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let extractor = self.get_for_file(path).ok_or_else(|| {
            let kind = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_else(|| Self::mime_for(path));
            ExtractError::UnsupportedType(kind)
        })?;

        let raw = extractor.extract(path).await?;
        let text = normalize_content(&raw.text);
        if text.is_empty() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            return Err(ExtractError::EmptyContent(name));
        }

        debug!(
            "Extracted {} chars from {:?} ({} raw)",
            text.len(),
            path,
            raw.text.len()
        );
        Ok(ExtractedContent {
            text,
            metadata: raw.metadata,
        })
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct FixedExtractor(&'static str);

    #[async_trait]
    impl ContentExtractor for FixedExtractor {
        fn supported_types(&self) -> &[&str] {
            &["text/plain"]
        }

        async fn extract(&self, _path: &Path) -> Result<ExtractedContent, ExtractError> {
            Ok(ExtractedContent::new(self.0))
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ExtractorRegistry::new();
        assert!(registry.extractors.is_empty());
        assert!(registry.mime_mapping.is_empty());
    }

    #[test]
    fn test_with_defaults_registers_all() {
        let registry = ExtractorRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["pdf", "spreadsheet", "csv", "text"]);
    }

    #[test]
    fn test_get_for_mime() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(registry.get_for_mime("application/pdf").is_some());
        assert!(registry.get_for_mime("text/csv").is_some());
        assert!(registry.get_for_mime("video/mp4").is_none());
    }

    #[test]
    fn test_supports_by_extension() {
        let registry = ExtractorRegistry::with_defaults();
        for name in ["a.pdf", "b.xlsx", "c.xls", "d.csv", "e.txt", "f.md", "G.PDF"] {
            assert!(registry.supports(Path::new(name)), "{name}");
        }
        assert!(!registry.supports(Path::new("photo.png")));
        assert!(!registry.supports(Path::new("Makefile")));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ExtractorRegistry::new();
        registry.register("text", TextExtractor::new());
        registry.register("text", FixedExtractor("fixed"));
        assert_eq!(registry.names(), vec!["text"]);
        assert!(registry.get_for_mime("text/markdown").is_none());
        assert!(registry.get_for_mime("text/plain").is_some());
    }

    #[tokio::test]
    async fn test_extract_normalizes() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("note.txt");
        std::fs::write(&file_path, "  Dr.   Smith \r\n\r\n  asthma\t\tplan  ").unwrap();

        let registry = ExtractorRegistry::with_defaults();
        let content = registry.extract(&file_path).await.unwrap();
        assert_eq!(content.text, "Dr. Smith\nasthma plan");
    }

    #[tokio::test]
    async fn test_extract_empty_content() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("blank.md");
        std::fs::write(&file_path, " \n\t\n").unwrap();

        let registry = ExtractorRegistry::with_defaults();
        match registry.extract(&file_path).await {
            Err(ExtractError::EmptyContent(name)) => assert_eq!(name, "blank.md"),
            other => panic!("expected EmptyContent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_unsupported_type() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("image.png");
        std::fs::write(&file_path, [0u8; 10]).unwrap();

        let registry = ExtractorRegistry::with_defaults();
        match registry.extract(&file_path).await {
            Err(ExtractError::UnsupportedType(kind)) => assert_eq!(kind, ".png"),
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_mime_needs_allowed_extension() {
        let registry = ExtractorRegistry::with_defaults();
        for name in ["server.log", "app.ini", "notes.conf", "list.text"] {
            assert_eq!(ExtractorRegistry::mime_for(Path::new(name)), "text/plain", "{name}");
            assert!(!registry.supports(Path::new(name)), "{name}");
        }
    }

    #[tokio::test]
    async fn test_extract_rejects_other_text_extensions() {
        let temp_dir = tempdir().unwrap();
        let registry = ExtractorRegistry::with_defaults();

        for (name, ext) in [("server.log", ".log"), ("app.ini", ".ini")] {
            let file_path = temp_dir.path().join(name);
            std::fs::write(&file_path, "some text").unwrap();
            match registry.extract(&file_path).await {
                Err(ExtractError::UnsupportedType(kind)) => assert_eq!(kind, ext),
                other => panic!("expected UnsupportedType for {name}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_extract_uses_registered_extractor() {
        let mut registry = ExtractorRegistry::new();
        registry.register("fixed", FixedExtractor("  canned   text "));

        let content = registry.extract(Path::new("/any/file.txt")).await.unwrap();
        assert_eq!(content.text, "canned text");
    }
}
