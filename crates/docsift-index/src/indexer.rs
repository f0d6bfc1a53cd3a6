//! Main indexing service.

use chrono::Utc;
use docsift_core::{document_id, DocumentRecord, Error, Result};
use docsift_embed::EmbeddingProvider;
use docsift_extract::ExtractorRegistry;
use docsift_store::StoreClient;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Index update events.
#[derive(Debug, Clone)]
pub enum IndexUpdate {
    IndexingStarted { path: PathBuf },
    FileIndexed { path: PathBuf, id: Uuid },
    FileError { path: PathBuf, error: String },
}

/// Callback receiving human-readable status lines.
pub type Progress<'a> = Option<&'a (dyn Fn(&str) + Send + Sync)>;

/// Configuration for the indexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Read every point back after writing it
    pub verify_writes: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            verify_writes: true,
        }
    }
}

/// Outcome of a directory run, by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub success: Vec<String>,
    pub failed: Vec<String>,
}

impl IndexReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.success.len() + self.failed.len()
    }
}

/// Main indexing service.
pub struct IndexerService {
    /// Extractor registry
    extractors: Arc<ExtractorRegistry>,
    /// Embedding provider
    embedder: Arc<EmbeddingProvider>,
    /// Collection-scoped store client
    store: Arc<StoreClient>,
    /// Configuration
    config: IndexerConfig,
    /// Update broadcast
    update_tx: broadcast::Sender<IndexUpdate>,
}

impl IndexerService {
    /// Create a new indexer service.
    #[must_use]
    pub fn new(
        extractors: Arc<ExtractorRegistry>,
        embedder: Arc<EmbeddingProvider>,
        store: Arc<StoreClient>,
        config: IndexerConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);

        Self {
            extractors,
            embedder,
            store,
            config,
            update_tx,
        }
    }

    /// Subscribe to index updates.
    pub fn subscribe(&self) -> broadcast::Receiver<IndexUpdate> {
        self.update_tx.subscribe()
    }

    /// Index a single file.
    ///
    /// # Errors
    ///
    /// Extraction, embedding, store or verification failures for this file.
    pub async fn index_one(&self, path: &Path) -> Result<DocumentRecord> {
        self.index_file(path, None).await
    }

    /// Index every regular file directly inside `dir`, in file-name order.
    ///
    /// Subdirectories are not entered. A file that fails is recorded under
    /// `failed` and the run continues.
    ///
    /// # Errors
    ///
    /// Only when the directory itself cannot be read.
    pub async fn index_directory(&self, dir: &Path, progress: Progress<'_>) -> Result<IndexReport> {
        report(progress, "Reading directory...");

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(_) => debug!("Skipping non-file {:?}", path),
                Err(e) => debug!("Skipping unreadable entry {:?}: {}", path, e),
            }
        }
        files.sort_by_key(|path| path.file_name().map(ToOwned::to_owned));

        info!("Indexing {} files from {:?}", files.len(), dir);

        let mut outcome = IndexReport::default();
        for path in files {
            let name = file_name(&path);
            report(progress, &format!("Processing {name}..."));

            match self.index_file(&path, progress).await {
                Ok(_) => {
                    report(progress, &format!("Successfully indexed {name}"));
                    outcome.success.push(name);
                }
                Err(e) => {
                    error!("Failed to index {:?}: {}", path, e);
                    report(progress, &format!("Failed to index {name}: {e}"));
                    outcome.failed.push(name);
                }
            }
        }

        info!(
            "Indexed {} of {} files from {:?}",
            outcome.success.len(),
            outcome.total(),
            dir
        );
        Ok(outcome)
    }

    async fn index_file(&self, path: &Path, progress: Progress<'_>) -> Result<DocumentRecord> {
        let _ = self.update_tx.send(IndexUpdate::IndexingStarted {
            path: path.to_path_buf(),
        });

        match self.process_file(path, progress).await {
            Ok(record) => {
                info!("Indexed {:?} as {}", path, record.id);
                let _ = self.update_tx.send(IndexUpdate::FileIndexed {
                    path: path.to_path_buf(),
                    id: record.id,
                });
                Ok(record)
            }
            Err(e) => {
                let _ = self.update_tx.send(IndexUpdate::FileError {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Process a file through the full pipeline: extract → embed → store → verify.
    async fn process_file(&self, path: &Path, progress: Progress<'_>) -> Result<DocumentRecord> {
        let filename = file_name(path);
        if filename.is_empty() {
            return Err(Error::Other(format!("not a file path: {}", path.display())));
        }

        let fs_meta = tokio::fs::metadata(path).await?;

        report(progress, &format!("Extracting text from {filename}..."));
        let extracted = self.extractors.extract(path).await?;

        let mut metadata = extracted.metadata;
        metadata.content_hash = Some(compute_hash(&extracted.text));
        metadata.size_bytes = Some(fs_meta.len());
        metadata.mime_type = Some(ExtractorRegistry::mime_for(path));
        metadata.embedding_model = Some(self.embedder.model_name().to_string());

        report(progress, &format!("Generating embedding for {filename}..."));
        let vector = self.embedder.embed(&extracted.text).await?;

        let record = DocumentRecord {
            id: document_id(&filename),
            path: path.to_path_buf(),
            file_type: file_type(path),
            filename,
            content: extracted.text,
            metadata,
            indexed_at: Utc::now(),
        };

        report(progress, &format!("Storing {}...", record.filename));
        self.store.upsert(record.clone(), vector).await?;

        if self.config.verify_writes {
            self.verify(&record).await?;
        }

        Ok(record)
    }

    /// Read the point back and check it arrived intact.
    async fn verify(&self, record: &DocumentRecord) -> Result<()> {
        let reason = match self.store.retrieve(record.id).await? {
            None => "point not found after write",
            Some(point) if point.vector.is_empty() => "stored vector is empty",
            Some(point) if point.record.content.is_empty() => "stored content is empty",
            Some(_) => {
                debug!("Verified {} ({})", record.filename, record.id);
                return Ok(());
            }
        };

        Err(Error::Verification {
            path: record.path.clone(),
            reason: reason.to_string(),
        })
    }
}

fn report(progress: Progress<'_>, status: &str) {
    if let Some(callback) = progress {
        callback(status);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_type(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// blake3 hash of normalized content.
fn compute_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}
