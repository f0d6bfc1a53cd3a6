//! Spreadsheet extractor (xlsx, xlsm, xls, ods).

use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Range, Reader};
use docsift_core::{ContentExtractor, DocumentMetadata, ExtractError, ExtractedContent};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::extension_of;

const EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Extractor for workbook files. Each sheet becomes tab-separated rows;
/// sheets are separated by a newline.
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    /// Create a new spreadsheet extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for SpreadsheetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for SpreadsheetExtractor {
    fn supported_types(&self) -> &[&str] {
        &[
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "application/vnd.ms-excel.sheet.macroenabled.12",
            "application/vnd.ms-excel.sheet.binary.macroenabled.12",
            "application/vnd.ms-excel",
            "application/vnd.oasis.opendocument.spreadsheet",
        ]
    }

    fn can_extract(&self, path: &Path, _mime_type: &str) -> bool {
        self.can_extract_by_extension(path)
    }

    fn can_extract_by_extension(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| EXTENSIONS.contains(&ext.as_str()))
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        debug!("Extracting spreadsheet: {:?}", path);
        let path: PathBuf = path.to_path_buf();

        tokio::task::spawn_blocking(move || read_workbook(&path))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

fn read_workbook(path: &Path) -> Result<ExtractedContent, ExtractError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ExtractError::Parse(format!("{}: {e}", path.display())))?;

    let sheet_names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| ExtractError::Parse(format!("sheet {name}: {e}")))?;
        sheets.push(sheet_to_text(&range));
    }

    Ok(ExtractedContent {
        text: sheets.join("\n"),
        metadata: DocumentMetadata {
            sheet_count: u32::try_from(sheet_names.len()).ok(),
            sheet_names,
            ..Default::default()
        },
    })
}

/// Serialize one sheet as tab-separated rows. Trailing empty cells are
/// dropped, empty rows are skipped.
fn sheet_to_text(range: &Range<Data>) -> String {
    range
        .rows()
        .map(|row| {
            let mut cells: Vec<String> = row.iter().map(cell_text).collect();
            while cells.last().is_some_and(String::is_empty) {
                cells.pop();
            }
            cells.join("\t")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_can_extract_by_extension() {
        let extractor = SpreadsheetExtractor::new();
        assert!(extractor.can_extract_by_extension(Path::new("labs.xlsx")));
        assert!(extractor.can_extract_by_extension(Path::new("LABS.XLS")));
        assert!(extractor.can_extract_by_extension(Path::new("labs.ods")));
        assert!(!extractor.can_extract_by_extension(Path::new("labs.csv")));
    }

    #[test]
    fn test_sheet_to_text() {
        let mut range: Range<Data> = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String("Patient".to_string()));
        range.set_value((0, 1), Data::String("Doctor".to_string()));
        range.set_value((1, 0), Data::String("Jane Roe".to_string()));
        range.set_value((1, 1), Data::String("Dr. Smith".to_string()));
        range.set_value((1, 2), Data::Int(42));

        assert_eq!(
            sheet_to_text(&range),
            "Patient\tDoctor\nJane Roe\tDr. Smith\t42"
        );
    }

    #[test]
    fn test_cell_text_variants() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("  x ".to_string())), "x");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
        assert_eq!(cell_text(&Data::Int(7)), "7");
    }

    #[tokio::test]
    async fn test_extract_invalid_workbook_fails() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("broken.xlsx");
        std::fs::write(&file_path, b"not a zip archive").unwrap();

        let result = SpreadsheetExtractor::new().extract(&file_path).await;
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }
}
