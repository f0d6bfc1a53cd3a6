//! Collection-scoped client with lazy, retried provisioning.

use docsift_core::{
    CollectionInfo, DistanceMetric, DocumentRecord, ScoredRecord, ScrollPage, StoreError,
    VectorPoint, VectorStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "documents";

/// How often and how patiently to try provisioning the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Client for one collection of a [`VectorStore`].
///
/// Every operation first makes sure the collection exists. Provisioning
/// happens once per client; concurrent callers wait for the same attempt
/// and a failed provisioning is tried again on the next call.
pub struct StoreClient {
    backend: Arc<dyn VectorStore>,
    collection: String,
    dimension: usize,
    retry: RetryPolicy,
    ready: OnceCell<()>,
}

impl StoreClient {
    /// Create a client for `collection` holding vectors of `dimension`.
    #[must_use]
    pub fn new(backend: Arc<dyn VectorStore>, collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            backend,
            collection: collection.into(),
            dimension,
            retry: RetryPolicy::default(),
            ready: OnceCell::new(),
        }
    }

    /// Replace the provisioning retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Make sure the collection exists, creating it when absent.
    ///
    /// # Errors
    ///
    /// `StoreError::Unavailable` once every attempt of the retry policy has
    /// failed.
    pub async fn ensure_ready(&self) -> Result<(), StoreError> {
        self.ready
            .get_or_try_init(|| self.provision_with_retry())
            .await
            .map(|_| ())
    }

    async fn provision_with_retry(&self) -> Result<(), StoreError> {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.provision().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "Vector store not ready (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        Err(StoreError::Unavailable {
            attempts,
            message: last_error,
        })
    }

    async fn provision(&self) -> Result<(), StoreError> {
        let existing = self.backend.list_collections().await?;
        if existing.iter().any(|name| name == &self.collection) {
            info!("Using existing collection: {}", self.collection);
            return Ok(());
        }

        info!(
            "Creating collection {} ({} dims, cosine) on {}",
            self.collection,
            self.dimension,
            self.backend.name()
        );
        self.backend
            .create_collection(&self.collection, self.dimension, DistanceMetric::Cosine)
            .await
    }

    /// Store a record with its vector, waiting for the write to apply.
    ///
    /// # Errors
    ///
    /// Provisioning or backend write errors.
    pub async fn upsert(&self, record: DocumentRecord, vector: Vec<f32>) -> Result<(), StoreError> {
        self.ensure_ready().await?;
        let point = VectorPoint::new(record, vector);
        self.backend
            .upsert(&self.collection, std::slice::from_ref(&point), true)
            .await
    }

    /// Nearest records to `vector`.
    ///
    /// # Errors
    ///
    /// Provisioning or backend query errors.
    pub async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredRecord>, StoreError> {
        self.ensure_ready().await?;
        self.backend.search(&self.collection, vector, limit).await
    }

    /// One page of all records.
    ///
    /// # Errors
    ///
    /// Provisioning or backend query errors.
    pub async fn scroll(&self, limit: usize, offset: Option<Uuid>) -> Result<ScrollPage, StoreError> {
        self.ensure_ready().await?;
        self.backend.scroll(&self.collection, limit, offset).await
    }

    /// Fetch one point with its vector.
    ///
    /// # Errors
    ///
    /// Provisioning or backend query errors.
    pub async fn retrieve(&self, id: Uuid) -> Result<Option<VectorPoint>, StoreError> {
        self.ensure_ready().await?;
        self.backend.retrieve(&self.collection, id).await
    }

    /// Describe the collection.
    ///
    /// # Errors
    ///
    /// Provisioning or backend errors.
    pub async fn get_info(&self) -> Result<CollectionInfo, StoreError> {
        self.ensure_ready().await?;
        self.backend.collection_info(&self.collection).await
    }

    /// Describe the collection without provisioning it.
    ///
    /// Returns `None` when the collection does not exist yet. No retry
    /// policy applies.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub async fn inspect(&self) -> Result<Option<CollectionInfo>, StoreError> {
        let existing = self.backend.list_collections().await?;
        if !existing.iter().any(|name| name == &self.collection) {
            return Ok(None);
        }
        self.backend.collection_info(&self.collection).await.map(Some)
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Provisioning or backend errors.
    pub async fn count(&self) -> Result<u64, StoreError> {
        self.ensure_ready().await?;
        self.backend.count(&self.collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use docsift_core::{document_id, DocumentMetadata};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Wraps a `MemoryStore`, failing the first `failures` listings and
    /// counting collection creations.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
        list_calls: AtomicU32,
        create_calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures: AtomicU32::new(failures),
                list_calls: AtomicU32::new(0),
                create_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Collection("connection refused".to_string()));
            }
            self.inner.list_collections().await
        }

        async fn create_collection(
            &self,
            collection: &str,
            dimension: usize,
            distance: DistanceMetric,
        ) -> Result<(), StoreError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create_collection(collection, dimension, distance).await
        }

        async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, StoreError> {
            self.inner.collection_info(collection).await
        }

        async fn upsert(
            &self,
            collection: &str,
            points: &[VectorPoint],
            wait: bool,
        ) -> Result<(), StoreError> {
            self.inner.upsert(collection, points, wait).await
        }

        async fn search(
            &self,
            collection: &str,
            vector: &[f32],
            limit: usize,
        ) -> Result<Vec<ScoredRecord>, StoreError> {
            self.inner.search(collection, vector, limit).await
        }

        async fn scroll(
            &self,
            collection: &str,
            limit: usize,
            offset: Option<Uuid>,
        ) -> Result<ScrollPage, StoreError> {
            self.inner.scroll(collection, limit, offset).await
        }

        async fn retrieve(
            &self,
            collection: &str,
            id: Uuid,
        ) -> Result<Option<VectorPoint>, StoreError> {
            self.inner.retrieve(collection, id).await
        }

        async fn count(&self, collection: &str) -> Result<u64, StoreError> {
            self.inner.count(collection).await
        }
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(1),
        }
    }

    fn client_for(store: &Arc<FlakyStore>, attempts: u32) -> StoreClient {
        StoreClient::new(Arc::clone(store) as Arc<dyn VectorStore>, DEFAULT_COLLECTION, 3)
            .with_retry_policy(fast_retry(attempts))
    }

    fn record(filename: &str) -> DocumentRecord {
        DocumentRecord {
            id: document_id(filename),
            path: PathBuf::from("/docs").join(filename),
            filename: filename.to_string(),
            file_type: "txt".to_string(),
            content: "hello".to_string(),
            metadata: DocumentMetadata::default(),
            indexed_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_ensure_ready_creates_collection_once() {
        let store = Arc::new(FlakyStore::new(0));
        let client = client_for(&store, 5);

        client.ensure_ready().await.unwrap();
        client.ensure_ready().await.unwrap();
        client.count().await.unwrap();

        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
        let info = client.get_info().await.unwrap();
        assert_eq!(info.dimension, 3);
        assert_eq!(info.distance, DistanceMetric::Cosine);
    }

    #[tokio::test]
    async fn test_ensure_ready_reuses_existing_collection() {
        let store = Arc::new(FlakyStore::new(0));
        store
            .inner
            .create_collection(DEFAULT_COLLECTION, 3, DistanceMetric::Cosine)
            .await
            .unwrap();

        client_for(&store, 5).ensure_ready().await.unwrap();
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_ready_concurrent_callers_share_provisioning() {
        let store = Arc::new(FlakyStore::new(0));
        let client = Arc::new(client_for(&store, 5));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.ensure_ready().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ensure_ready_retries_then_succeeds() {
        let store = Arc::new(FlakyStore::new(2));
        client_for(&store, 5).ensure_ready().await.unwrap();
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_ensure_ready_exhaustion_reports_unavailable() {
        let store = Arc::new(FlakyStore::new(10));
        let client = client_for(&store, 3);

        match client.ensure_ready().await {
            Err(StoreError::Unavailable { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 3);

        // Operations surface the same failure without touching the data path
        assert!(matches!(
            client.count().await,
            Err(StoreError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_inspect_does_not_create_collection() {
        let store = Arc::new(FlakyStore::new(0));
        let client = client_for(&store, 5);

        assert!(client.inspect().await.unwrap().is_none());
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);

        client.ensure_ready().await.unwrap();
        let info = client.inspect().await.unwrap().unwrap();
        assert_eq!(info.name, DEFAULT_COLLECTION);
        assert_eq!(info.dimension, 3);
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inspect_surfaces_backend_error() {
        let store = Arc::new(FlakyStore::new(1));
        let client = client_for(&store, 5);

        assert!(matches!(
            client.inspect().await,
            Err(StoreError::Collection(_))
        ));
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upsert_search_retrieve() {
        let store = Arc::new(FlakyStore::new(0));
        let client = client_for(&store, 1);

        client.upsert(record("a.txt"), vec![1.0, 0.0, 0.0]).await.unwrap();
        client.upsert(record("b.txt"), vec![0.0, 1.0, 0.0]).await.unwrap();

        let hits = client.search(&[1.0, 0.1, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].record.filename, "a.txt");

        let point = client.retrieve(document_id("b.txt")).await.unwrap().unwrap();
        assert_eq!(point.vector, vec![0.0, 1.0, 0.0]);

        let page = client.scroll(10, None).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(page.next_offset.is_none());
    }
}
