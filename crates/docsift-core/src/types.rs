//! Core types for docsift.
//!
//! This module contains the shared data structures used across docsift:
//!
//! ## Documents
//! - [`DocumentRecord`]: One indexed document, persisted as a point payload
//! - [`DocumentMetadata`]: Extractor and indexer metadata attached to a record
//! - [`ExtractedContent`]: Normalized text pulled from a file
//!
//! ## Vector Storage
//! - [`VectorPoint`]: A record together with its embedding
//! - [`ScoredRecord`]: A similarity hit returned by a store
//! - [`ScrollPage`]: One page of a full collection scan
//! - [`CollectionInfo`]: Collection description
//! - [`DistanceMetric`]: Vector distance calculation method
//!
//! ## Search
//! - [`TermBucket`]: Named category of extracted query terms
//! - [`SearchCriteria`]: Structured form of a natural-language query
//! - [`Match`]: One occurrence of a term inside a document
//! - [`ContextBlock`]: Highlighted snippets for one document
//! - [`SearchResult`]: A ranked, user-facing hit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Namespace for deterministic document identifiers.
pub const DOCUMENT_NAMESPACE: Uuid = Uuid::from_u128(0x6d8f_1c0e_5a3b_4f7d_9e21_b4c6_a0d3_e857);

/// Derive the stable point id for a document from its file name.
///
/// Ids depend only on the file name, so re-indexing a file with the same
/// name overwrites the existing point instead of adding a duplicate.
#[must_use]
pub fn document_id(filename: &str) -> Uuid {
    Uuid::new_v5(&DOCUMENT_NAMESPACE, filename.as_bytes())
}

// ============================================================================
// Documents
// ============================================================================

/// One indexed document.
///
/// Serializes to the point payload layout: `path`, `content`, `filename`,
/// `filetype`, `metadata`, `indexed_at`. The id travels as the point id, not
/// inside the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Point identifier (see [`document_id`])
    #[serde(skip)]
    pub id: Uuid,
    /// Path the document was indexed from
    pub path: PathBuf,
    /// File name without directory
    pub filename: String,
    /// Lower-case extension without the dot
    #[serde(rename = "filetype")]
    pub file_type: String,
    /// Normalized extracted text
    pub content: String,
    /// Extractor and indexer metadata
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// When the document was indexed
    pub indexed_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Name of the directory containing the document, or an empty string at
    /// the filesystem root.
    #[must_use]
    pub fn directory(&self) -> String {
        self.path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Metadata attached to a document.
///
/// Format-specific fields are filled by extractors; bookkeeping fields
/// (`content_hash`, `size_bytes`, `mime_type`, `embedding_model`) by the
/// indexer. Unknown keys found in stored payloads are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    /// PDF header version, e.g. `1.7`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_count: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sheet_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// blake3 hash of the normalized content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Content extracted from a file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    /// Main text content
    pub text: String,
    /// File-level metadata
    pub metadata: DocumentMetadata,
}

impl ExtractedContent {
    /// Create extracted content with empty metadata.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata::default(),
        }
    }
}

// ============================================================================
// Vector Storage
// ============================================================================

/// Distance metric for vector search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclid,
    Dot,
}

/// A record paired with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub record: DocumentRecord,
}

impl VectorPoint {
    /// Build a point whose id is the record's id.
    #[must_use]
    pub fn new(record: DocumentRecord, vector: Vec<f32>) -> Self {
        Self {
            id: record.id,
            vector,
            record,
        }
    }
}

/// A similarity hit returned by a vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: DocumentRecord,
    pub score: f32,
}

/// One page of a collection scan.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub records: Vec<DocumentRecord>,
    /// Offset to pass to the next scroll call; `None` when exhausted
    pub next_offset: Option<Uuid>,
}

/// Description of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: u64,
    pub dimension: usize,
    pub distance: DistanceMetric,
    pub status: String,
}

// ============================================================================
// Search
// ============================================================================

/// Category of extracted query terms.
///
/// Serialized with the JSON keys a language model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TermBucket {
    /// Fallback bucket holding the raw query
    Terms,
    Names,
    Keywords,
    Doctors,
    MedicalTerms,
    Conditions,
}

impl TermBucket {
    /// JSON key for this bucket.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Terms => "terms",
            Self::Names => "names",
            Self::Keywords => "keywords",
            Self::Doctors => "doctors",
            Self::MedicalTerms => "medicalTerms",
            Self::Conditions => "conditions",
        }
    }

    /// Buckets whose terms are person names and get honorific variants.
    #[must_use]
    pub const fn is_name_like(self) -> bool {
        matches!(self, Self::Names | Self::Doctors)
    }
}

/// Structured search criteria derived from a natural-language query.
///
/// Terms are trimmed, never blank, and unique within a bucket ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(flatten)]
    buckets: BTreeMap<TermBucket, Vec<String>>,
    /// Every term must be present in a result (query said "and")
    #[serde(rename = "requireAll", default)]
    pub require_all: bool,
}

impl SearchCriteria {
    /// Create empty criteria.
    #[must_use]
    pub fn new(require_all: bool) -> Self {
        Self {
            buckets: BTreeMap::new(),
            require_all,
        }
    }

    /// Fail-open criteria: the whole query as a single term.
    #[must_use]
    pub fn fallback(query: &str) -> Self {
        let mut criteria = Self::new(false);
        criteria.push(TermBucket::Terms, query);
        criteria
    }

    /// Add a term to a bucket. Returns `false` if the term was blank or
    /// already present in that bucket.
    pub fn push(&mut self, bucket: TermBucket, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }
        let entries = self.buckets.entry(bucket).or_default();
        let folded = term.to_lowercase();
        if entries.iter().any(|t| t.to_lowercase() == folded) {
            return false;
        }
        entries.push(term.to_string());
        true
    }

    /// Terms in one bucket.
    #[must_use]
    pub fn terms(&self, bucket: TermBucket) -> &[String] {
        self.buckets.get(&bucket).map_or(&[][..], Vec::as_slice)
    }

    /// Every distinct term across buckets, in bucket order.
    #[must_use]
    pub fn all_terms(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.buckets
            .values()
            .flatten()
            .filter(|t| seen.insert(t.to_lowercase()))
            .map(String::as_str)
            .collect()
    }

    /// Whether `term` belongs to a name-like bucket.
    #[must_use]
    pub fn is_name_term(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.buckets
            .iter()
            .filter(|(bucket, _)| bucket.is_name_like())
            .flat_map(|(_, terms)| terms)
            .any(|t| t.to_lowercase() == needle)
    }

    /// Number of distinct terms.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.all_terms().len()
    }

    /// True when no bucket holds a term.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }
}

/// Where a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "lowercase")]
pub enum MatchLocation {
    /// Zero-based line number
    Line(usize),
    /// Byte offset into the content
    Offset(usize),
}

/// One occurrence of a criteria term inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub term: String,
    pub location: MatchLocation,
    pub context: String,
}

/// Highlighted snippets for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBlock {
    /// Snippets joined by the separator, with highlight markers applied
    pub text: String,
    /// Terms that were highlighted
    pub highlights: BTreeSet<String>,
}

impl ContextBlock {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub filename: String,
    /// Name of the containing directory
    pub directory: String,
    pub path: PathBuf,
    pub score: f32,
    pub context: ContextBlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> DocumentRecord {
        DocumentRecord {
            id: document_id("report.pdf"),
            path: PathBuf::from("/data/clinic/report.pdf"),
            filename: "report.pdf".to_string(),
            file_type: "pdf".to_string(),
            content: "Dr. Smith reviewed the case".to_string(),
            metadata: DocumentMetadata {
                page_count: Some(2),
                ..Default::default()
            },
            indexed_at: Utc::now(),
        }
    }

    // ==================== Identity Tests ====================

    #[test]
    fn test_document_id_is_deterministic() {
        assert_eq!(document_id("a.txt"), document_id("a.txt"));
        assert_ne!(document_id("a.txt"), document_id("b.txt"));
    }

    // ==================== DocumentRecord Tests ====================

    #[test]
    fn test_record_payload_keys() {
        let record = sample_record();
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();

        for key in ["path", "content", "filename", "filetype", "metadata", "indexed_at"] {
            assert!(obj.contains_key(key), "missing payload key {key}");
        }
        assert!(!obj.contains_key("id"));
        assert_eq!(json["metadata"]["page_count"], 2);
        assert!(json["metadata"].get("title").is_none());
    }

    #[test]
    fn test_record_payload_roundtrip_keeps_unknown_metadata() {
        let payload = serde_json::json!({
            "path": "/data/a.pdf",
            "content": "text",
            "filename": "a.pdf",
            "filetype": "pdf",
            "metadata": {"pageCount": 3, "info": {"Title": "A"}},
            "indexed_at": "2024-05-01T10:00:00Z"
        });
        let record: DocumentRecord = serde_json::from_value(payload).unwrap();
        assert_eq!(record.metadata.extra["pageCount"], 3);
        assert_eq!(record.id, Uuid::nil());
    }

    #[test]
    fn test_record_directory() {
        assert_eq!(sample_record().directory(), "clinic");

        let mut root = sample_record();
        root.path = PathBuf::from("/report.pdf");
        assert_eq!(root.directory(), "");
    }

    // ==================== DistanceMetric Tests ====================

    #[test]
    fn test_distance_metric_default() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::Cosine);
        assert_eq!(
            serde_json::to_string(&DistanceMetric::Euclid).unwrap(),
            "\"euclid\""
        );
    }

    // ==================== SearchCriteria Tests ====================

    #[test]
    fn test_criteria_push_trims_and_dedupes() {
        let mut criteria = SearchCriteria::new(false);
        assert!(criteria.push(TermBucket::Names, "  Smith "));
        assert!(!criteria.push(TermBucket::Names, "smith"));
        assert!(!criteria.push(TermBucket::Names, "   "));
        assert_eq!(criteria.terms(TermBucket::Names), ["Smith"]);
    }

    #[test]
    fn test_criteria_all_terms_dedupes_across_buckets() {
        let mut criteria = SearchCriteria::new(true);
        criteria.push(TermBucket::Doctors, "Smith");
        criteria.push(TermBucket::Conditions, "asthma");
        criteria.push(TermBucket::MedicalTerms, "SMITH");

        assert_eq!(criteria.all_terms(), vec!["Smith", "asthma"]);
        assert_eq!(criteria.term_count(), 2);
        assert!(criteria.is_name_term("smith"));
        assert!(!criteria.is_name_term("asthma"));
    }

    #[test]
    fn test_criteria_fallback() {
        let criteria = SearchCriteria::fallback(" chest pain ");
        assert_eq!(criteria.terms(TermBucket::Terms), ["chest pain"]);
        assert!(!criteria.require_all);

        assert!(SearchCriteria::fallback("   ").is_empty());
    }

    #[test]
    fn test_criteria_serialization_uses_bucket_keys() {
        let mut criteria = SearchCriteria::new(true);
        criteria.push(TermBucket::MedicalTerms, "MRI");
        let json = serde_json::to_value(&criteria).unwrap();
        assert_eq!(json["medicalTerms"][0], "MRI");
        assert_eq!(json["requireAll"], true);
    }

    #[test]
    fn test_term_bucket_keys_match_serde() {
        for bucket in [
            TermBucket::Terms,
            TermBucket::Names,
            TermBucket::Keywords,
            TermBucket::Doctors,
            TermBucket::MedicalTerms,
            TermBucket::Conditions,
        ] {
            let json = serde_json::to_string(&bucket).unwrap();
            assert_eq!(json, format!("\"{}\"", bucket.key()));
        }
    }

    // ==================== Match Tests ====================

    #[test]
    fn test_match_location_ordering() {
        assert!(MatchLocation::Line(1) < MatchLocation::Line(4));
        assert!(MatchLocation::Offset(10) < MatchLocation::Offset(11));
    }

    // ==================== SearchResult Tests ====================

    #[test]
    fn test_search_result_serialization() {
        let result = SearchResult {
            filename: "report.pdf".to_string(),
            directory: "clinic".to_string(),
            path: PathBuf::from("/data/clinic/report.pdf"),
            score: 0.82,
            context: ContextBlock {
                text: "**Smith** reviewed".to_string(),
                highlights: BTreeSet::from(["Smith".to_string()]),
            },
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: SearchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
