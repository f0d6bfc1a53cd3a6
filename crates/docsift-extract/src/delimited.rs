//! CSV extractor.

use async_trait::async_trait;
use csv::ReaderBuilder;
use docsift_core::{ContentExtractor, DocumentMetadata, ExtractError, ExtractedContent};
use std::path::Path;

use crate::extension_of;

/// Extractor for comma-separated files. Every row becomes one line with
/// its fields joined by spaces; the first row is treated as data.
pub struct CsvExtractor;

impl CsvExtractor {
    /// Create a new CSV extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for CsvExtractor {
    fn supported_types(&self) -> &[&str] {
        &["text/csv", "application/csv"]
    }

    fn can_extract(&self, path: &Path, _mime_type: &str) -> bool {
        self.can_extract_by_extension(path)
    }

    fn can_extract_by_extension(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| ext == "csv")
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        parse_rows(&bytes)
    }
}

fn parse_rows(bytes: &[u8]) -> Result<ExtractedContent, ExtractError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Parse(format!("csv: {e}")))?;
        lines.push(record.iter().collect::<Vec<_>>().join(" "));
    }

    Ok(ExtractedContent {
        metadata: DocumentMetadata {
            row_count: Some(lines.len() as u64),
            ..Default::default()
        },
        text: lines.join("\n"),
    })
}
