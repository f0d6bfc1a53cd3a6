//! # docsift-extract
//!
//! Content extraction from document formats for the docsift indexing pipeline.
//!
//! This crate reads files and produces normalized
//! [`ExtractedContent`](docsift_core::ExtractedContent) ready for embedding.
//!
//! ## Supported Formats
//!
//! | Extractor | Formats | Metadata |
//! |-----------|---------|----------|
//! | [`PdfExtractor`] | `.pdf` | page count, info dictionary, PDF version |
//! | [`SpreadsheetExtractor`] | `.xlsx`, `.xlsm`, `.xls`, `.ods` | sheet count, sheet names |
//! | [`CsvExtractor`] | `.csv` | row count |
//! | [`TextExtractor`] | `.txt`, `.md`, `.markdown` | none |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsift_extract::ExtractorRegistry;
//! use std::path::Path;
//!
//! let registry = ExtractorRegistry::with_defaults();
//! let content = registry.extract(Path::new("records/visit.pdf")).await?;
//! println!("Extracted {} bytes", content.text.len());
//! ```
//!
//! Every extractor returns raw text; the registry normalizes it with
//! [`normalize_content`](docsift_core::normalize_content) and rejects
//! documents that end up empty.

pub mod delimited;
pub mod pdf;
pub mod registry;
pub mod spreadsheet;
pub mod text;

pub use delimited::CsvExtractor;
pub use pdf::PdfExtractor;
pub use registry::ExtractorRegistry;
pub use spreadsheet::SpreadsheetExtractor;
pub use text::TextExtractor;

use std::path::Path;

/// Lower-case extension of `path` without the dot.
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}
