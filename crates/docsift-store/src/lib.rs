//! Vector storage layer for docsift.
//!
//! This crate provides [`StoreClient`], the collection-scoped entry point the
//! indexer and search engine use, and two implementations of the
//! [`VectorStore`](docsift_core::VectorStore) trait.
//!
//! # Features
//!
//! - **Lazy provisioning**: The collection is created on first use, with a
//!   bounded number of attempts and a fixed pause between them
//! - **Deterministic ids**: Points are keyed by document id, so upserts replace
//! - **Qdrant**: REST backend with request timeouts and connect retries
//! - **In-memory**: Brute-force backend for tests and small offline runs
//!
//! # Example
//!
//! ```rust,ignore
//! use docsift_store::{QdrantConfig, QdrantStore, StoreClient};
//! use std::sync::Arc;
//!
//! let backend = QdrantStore::new(QdrantConfig::default())?;
//! let client = StoreClient::new(Arc::new(backend), "documents", 1536);
//!
//! client.ensure_ready().await?;
//! let hits = client.search(&query_vector, 10).await?;
//! ```

pub mod client;
pub mod memory;
pub mod qdrant;

pub use client::{RetryPolicy, StoreClient, DEFAULT_COLLECTION};
pub use memory::MemoryStore;
pub use qdrant::{QdrantConfig, QdrantStore};
