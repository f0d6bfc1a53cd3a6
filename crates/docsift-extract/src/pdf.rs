//! PDF content extractor.
//!
//! Uses pdf-extract for the text layer and lopdf for document structure
//! (page count, info dictionary, header version).

use async_trait::async_trait;
use docsift_core::{ContentExtractor, DocumentMetadata, ExtractError, ExtractedContent};
use lopdf::{Document, Object};
use std::path::Path;
use tracing::{debug, warn};

/// Extractor for PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for PdfExtractor {
    fn supported_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    fn can_extract_by_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        debug!("Extracting PDF: {:?}", path);

        let bytes = tokio::fs::read(path).await?;

        // Both parsers are CPU bound
        let (text, metadata) = tokio::task::spawn_blocking(move || {
            let text = pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ExtractError::Parse(format!("PDF text extraction failed: {e}")))?;
            let metadata = read_pdf_metadata(&bytes);
            Ok::<_, ExtractError>((text, metadata))
        })
        .await
        .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))??;

        Ok(ExtractedContent { text, metadata })
    }
}

/// Read page count, info dictionary and version. Structure errors only
/// cost metadata, never the text.
fn read_pdf_metadata(bytes: &[u8]) -> DocumentMetadata {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Failed to load PDF structure for metadata: {}", e);
            return DocumentMetadata::default();
        }
    };

    let mut metadata = DocumentMetadata {
        page_count: u32::try_from(doc.get_pages().len()).ok(),
        pdf_version: Some(doc.version.clone()),
        ..Default::default()
    };

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(&doc, obj))
        .and_then(|obj| obj.as_dict().ok());

    if let Some(info) = info {
        let field = |key: &[u8]| {
            info.get(key)
                .ok()
                .and_then(|obj| resolve(&doc, obj))
                .and_then(pdf_string)
        };
        metadata.title = field(b"Title");
        metadata.author = field(b"Author");
        metadata.subject = field(b"Subject");
        metadata.creator = field(b"Creator");
        metadata.producer = field(b"Producer");
    }

    metadata
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a byte order mark,
/// otherwise single-byte.
fn pdf_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    let decoded = decode_pdf_text(bytes);
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn decode_pdf_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| char::from(b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream, StringFormat};
    use tempfile::tempdir;

    /// Build a one-page PDF containing `text` in Helvetica.
    fn build_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(b"Visit Summary".to_vec(), StringFormat::Literal),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_supported_types() {
        let extractor = PdfExtractor::new();
        assert_eq!(extractor.supported_types(), &["application/pdf"]);
        assert!(extractor.can_extract_by_extension(Path::new("scan.PDF")));
        assert!(!extractor.can_extract_by_extension(Path::new("scan.txt")));
    }

    #[test]
    fn test_decode_pdf_text_utf16() {
        let bytes = [0xFE, 0xFF, 0x00, 0x44, 0x00, 0x72, 0x00, 0x2E];
        assert_eq!(decode_pdf_text(&bytes), "Dr.");
        assert_eq!(decode_pdf_text(b"Plain"), "Plain");
    }

    #[test]
    fn test_read_pdf_metadata() {
        let bytes = build_pdf("Hello");
        let metadata = read_pdf_metadata(&bytes);
        assert_eq!(metadata.page_count, Some(1));
        assert_eq!(metadata.pdf_version.as_deref(), Some("1.5"));
        assert_eq!(metadata.title.as_deref(), Some("Visit Summary"));
        assert!(metadata.author.is_none());
    }

    #[test]
    fn test_read_pdf_metadata_garbage() {
        let metadata = read_pdf_metadata(b"not a pdf");
        assert_eq!(metadata, DocumentMetadata::default());
    }

    #[tokio::test]
    async fn test_extract_text_and_metadata() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("visit.pdf");
        std::fs::write(&file_path, build_pdf("Asthma follow up")).unwrap();

        let content = PdfExtractor::new().extract(&file_path).await.unwrap();
        assert!(content.text.contains("Asthma follow up"));
        assert_eq!(content.metadata.page_count, Some(1));
    }

    #[tokio::test]
    async fn test_extract_corrupt_pdf_fails() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("broken.pdf");
        std::fs::write(&file_path, b"%PDF-1.4 garbage").unwrap();

        let result = PdfExtractor::new().extract(&file_path).await;
        assert!(result.is_err());
    }
}
