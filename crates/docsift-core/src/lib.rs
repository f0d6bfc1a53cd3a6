//! # docsift-core
//!
//! Core types and traits for docsift, a document retrieval pipeline that
//! indexes PDFs, spreadsheets, CSV and text files into a vector store and
//! answers natural-language queries against them.
//!
//! This crate provides the foundational abstractions used throughout docsift:
//!
//! - **Content Extraction**: [`ContentExtractor`] trait for turning files into text
//! - **Embedding Generation**: [`Embedder`] trait for converting text to vectors
//! - **Vector Storage**: [`VectorStore`] trait for collections, points and similarity search
//! - **Query Understanding**: [`LanguageModel`] trait for the model behind query interpretation
//!
//! ## Architecture
//!
//! ```text
//! File → ContentExtractor → Embedder → VectorStore
//!                                          ↓
//! Query → LanguageModel → SearchCriteria → SearchResult
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DocumentRecord`] | One indexed document, stored as a point payload |
//! | [`ExtractedContent`] | Normalized text and metadata pulled from a file |
//! | [`SearchCriteria`] | Structured terms produced from a free-form query |
//! | [`ContextBlock`] | Highlighted, deduplicated snippets for one document |
//! | [`SearchResult`] | A ranked, user-facing match |
//!
//! ## Related Crates
//!
//! - `docsift-extract`: Content extraction implementations
//! - `docsift-embed`: Embedding provider and backends
//! - `docsift-store`: Vector store client, Qdrant and in-memory backends
//! - `docsift-query`: Query interpretation and search
//! - `docsift-index`: Indexing pipeline

pub mod error;
pub mod text;
pub mod traits;
pub mod types;

pub use error::{EmbedError, Error, ExtractError, LlmError, Result, SearchError, StoreError};
pub use text::{normalize_content, normalize_for_embedding};
pub use traits::*;
pub use types::*;
