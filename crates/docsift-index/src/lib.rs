//! Indexing pipeline for docsift.
//!
//! Every file goes through: extraction → embedding → storage → read-back
//! verification. One document becomes one point, keyed by its file name, so
//! indexing the same name again replaces the previous version.
//!
//! # Components
//!
//! - [`IndexerService`]: Runs the pipeline for one file or a whole directory
//! - [`IndexerConfig`]: Configuration for the indexer
//! - [`IndexReport`]: Per-file outcome of a directory run
//! - [`IndexUpdate`]: Events emitted during indexing
//!
//! # Example
//!
//! ```rust,ignore
//! use docsift_index::{IndexerConfig, IndexerService, IndexUpdate};
//!
//! let indexer = IndexerService::new(extractors, embedder, store, IndexerConfig::default());
//!
//! // Subscribe to updates
//! let mut updates = indexer.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(update) = updates.recv().await {
//!         if let IndexUpdate::FileError { path, error } = update {
//!             eprintln!("{}: {}", path.display(), error);
//!         }
//!     }
//! });
//!
//! let report = indexer
//!     .index_directory(dir, Some(&|status: &str| println!("{status}")))
//!     .await?;
//! println!("{} indexed, {} failed", report.success.len(), report.failed.len());
//! ```

pub mod indexer;

pub use indexer::{IndexReport, IndexUpdate, IndexerConfig, IndexerService, Progress};
