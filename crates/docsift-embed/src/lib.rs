//! # docsift-embed
//!
//! Embedding generation for docsift.
//!
//! All callers go through [`EmbeddingProvider`], which normalizes input text,
//! initializes the backend exactly once (concurrent first callers share a
//! single initialization) and validates every vector it hands out.
//!
//! ## Backends
//!
//! | Type | Model | Dimension | Notes |
//! |------|-------|-----------|-------|
//! | [`OpenAiEmbedder`] | `text-embedding-ada-002` | 1536 | Any OpenAI-compatible `/embeddings` endpoint, retries 429/5xx |
//! | [`HashEmbedder`] | `docsift-hash` | configurable | Deterministic, offline, for tests and air-gapped runs |
//! | [`CandleEmbedder`] | `thenlper/gte-small` | 384 | Local BERT via Candle (requires `candle` feature) |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsift_embed::{EmbeddingProvider, OpenAiEmbedder, OpenAiEmbedderConfig};
//! use std::sync::Arc;
//!
//! let backend = OpenAiEmbedder::new(OpenAiEmbedderConfig::with_api_key(key))?;
//! let provider = EmbeddingProvider::new(Arc::new(backend));
//!
//! let vector = provider.embed("follow-up visit with Dr. Smith").await?;
//! assert_eq!(vector.len(), provider.dimension());
//! ```
//!
//! ## Cargo Features
//!
//! - `candle`: Enables the Candle ML stack for local embeddings

#[cfg(feature = "candle")]
pub mod candle;
pub mod hash;
pub mod openai;
pub mod provider;

#[cfg(feature = "candle")]
pub use candle::CandleEmbedder;
pub use hash::HashEmbedder;
pub use openai::{OpenAiEmbedder, OpenAiEmbedderConfig};
pub use provider::{validate_embedding, EmbeddingProvider};
