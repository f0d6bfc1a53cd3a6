//! Core traits for docsift components.
//!
//! This module defines the trait interfaces that docsift components implement:
//!
//! - [`ContentExtractor`]: Extract text from files
//! - [`Embedder`]: Generate vector embeddings
//! - [`VectorStore`]: Store, scan and search document points
//! - [`LanguageModel`]: Complete a prompt, used for query interpretation
//!
//! These traits enable a pluggable architecture where different backends
//! can be swapped without changing the rest of the system.

use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

use crate::error::{EmbedError, ExtractError, LlmError, StoreError};
use crate::types::{
    CollectionInfo, DistanceMetric, ExtractedContent, ScoredRecord, ScrollPage, VectorPoint,
};

// ============================================================================
// Content Extraction
// ============================================================================

/// Trait for extracting content from files.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Returns the MIME types this extractor can handle.
    fn supported_types(&self) -> &[&str];

    /// Check if this extractor can handle the given file.
    fn can_extract(&self, path: &Path, mime_type: &str) -> bool {
        self.supported_types().contains(&mime_type) || self.can_extract_by_extension(path)
    }

    /// Check if extractor can handle based on file extension.
    fn can_extract_by_extension(&self, _path: &Path) -> bool {
        false
    }

    /// Extract raw text and metadata from a file.
    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError>;
}

// ============================================================================
// Embedding
// ============================================================================

/// Trait for embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Prepare the backend (load weights, check credentials).
    ///
    /// Called at most once successfully; callers guard it.
    async fn init(&self) -> Result<(), EmbedError> {
        Ok(())
    }

    /// Embed one piece of already-normalized text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

// ============================================================================
// Vector Storage
// ============================================================================

/// Trait for vector store backends.
///
/// Every operation addresses a named collection. Upserts replace points with
/// the same id.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Names of existing collections.
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Create a collection.
    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: DistanceMetric,
    ) -> Result<(), StoreError>;

    /// Describe a collection.
    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, StoreError>;

    /// Insert or replace points. With `wait` the call returns only once the
    /// write is applied.
    async fn upsert(
        &self,
        collection: &str,
        points: &[VectorPoint],
        wait: bool,
    ) -> Result<(), StoreError>;

    /// Nearest neighbours of `vector`, best first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, StoreError>;

    /// One page of all records, starting at `offset`.
    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        offset: Option<Uuid>,
    ) -> Result<ScrollPage, StoreError>;

    /// Fetch a single point with its vector.
    async fn retrieve(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<VectorPoint>, StoreError>;

    /// Number of points in a collection.
    async fn count(&self, collection: &str) -> Result<u64, StoreError>;
}

// ============================================================================
// Language Model
// ============================================================================

/// Trait for text-completion backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Complete a prompt made of a system instruction and a user message.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}
