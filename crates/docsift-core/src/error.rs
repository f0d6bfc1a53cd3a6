//! Error types for docsift.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for docsift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Content extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// Vector store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Search failed
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// A write was acknowledged but could not be read back intact
    #[error("verification failed for {path}: {reason}")]
    Verification { path: PathBuf, reason: String },

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Content extraction errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("no content could be extracted from {0}")]
    EmptyContent(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Embedding errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("cannot embed empty input")]
    EmptyInput,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding component {index} is not finite")]
    NonFinite { index: usize },

    #[error("embedding is an all-zero vector")]
    ZeroVector,
}

/// Vector store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("vector store unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },

    #[error("collection error: {0}")]
    Collection(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("malformed store response: {0}")]
    Decode(String),
}

/// Language model errors.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("language model request failed: {0}")]
    Request(String),

    #[error("language model returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed language model response: {0}")]
    Decode(String),

    #[error("language model returned no content")]
    EmptyResponse,
}

/// Search errors. Query interpretation never fails, so only the
/// embedding and store stages can surface here.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("store lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for docsift operations.
pub type Result<T> = std::result::Result<T, Error>;
