//! In-memory store for tests and offline runs.
//!
//! This module provides a [`MemoryStore`] that keeps collections and points
//! in memory. It's useful for:
//! - Testing without a running Qdrant instance
//! - Trying the pipeline on a handful of files
//! - Unit tests that don't need persistence

use async_trait::async_trait;
use docsift_core::{
    CollectionInfo, DistanceMetric, ScoredRecord, ScrollPage, StoreError, VectorPoint, VectorStore,
};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct MemoryCollection {
    dimension: usize,
    distance: DistanceMetric,
    points: BTreeMap<Uuid, VectorPoint>,
}

/// In-memory vector store.
///
/// Search is brute force. Every metric is reported as a similarity where
/// higher is better: cosine, dot product, or negated Euclidean distance.
/// Scrolling walks points in id order.
///
/// # Example
///
/// ```rust
/// use docsift_core::{DistanceMetric, VectorStore};
/// use docsift_store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.create_collection("documents", 384, DistanceMetric::Cosine).await?;
/// assert_eq!(store.count("documents").await?, 0);
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Compute cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    fn score(distance: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
        match distance {
            DistanceMetric::Cosine => Self::cosine_similarity(a, b),
            DistanceMetric::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            DistanceMetric::Euclid => -a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }

    fn not_found(collection: &str) -> StoreError {
        StoreError::Collection(format!("collection {collection} not found"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: DistanceMetric,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(collection) {
            return Err(StoreError::Collection(format!(
                "collection {collection} already exists"
            )));
        }
        collections.insert(
            collection.to_string(),
            MemoryCollection {
                dimension,
                distance,
                points: BTreeMap::new(),
            },
        );
        debug!("MemoryStore created {} (dimension: {})", collection, dimension);
        Ok(())
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, StoreError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| Self::not_found(collection))?;
        Ok(CollectionInfo {
            name: collection.to_string(),
            points_count: entry.points.len() as u64,
            dimension: entry.dimension,
            distance: entry.distance,
            status: "green".to_string(),
        })
    }

    async fn upsert(
        &self,
        collection: &str,
        points: &[VectorPoint],
        _wait: bool,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| Self::not_found(collection))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != entry.dimension) {
            return Err(StoreError::Insert(format!(
                "vector for {} has dimension {}, collection expects {}",
                bad.id,
                bad.vector.len(),
                entry.dimension
            )));
        }
        for point in points {
            let mut point = point.clone();
            point.record.id = point.id;
            entry.points.insert(point.id, point);
        }
        debug!("Upserted {} points into {}", points.len(), collection);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| Self::not_found(collection))?;

        let mut results: Vec<(f32, &VectorPoint)> = entry
            .points
            .values()
            .map(|point| (Self::score(entry.distance, vector, &point.vector), point))
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(results
            .into_iter()
            .take(limit)
            .map(|(score, point)| ScoredRecord {
                record: point.record.clone(),
                score,
            })
            .collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        offset: Option<Uuid>,
    ) -> Result<ScrollPage, StoreError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| Self::not_found(collection))?;

        let start = offset.map_or(Bound::Unbounded, Bound::Included);
        let mut iter = entry.points.range((start, Bound::Unbounded));
        let records = iter
            .by_ref()
            .take(limit.max(1))
            .map(|(_, point)| point.record.clone())
            .collect();
        let next_offset = iter.next().map(|(id, _)| *id);

        Ok(ScrollPage {
            records,
            next_offset,
        })
    }

    async fn retrieve(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<VectorPoint>, StoreError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| Self::not_found(collection))?;
        Ok(entry.points.get(&id).cloned())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| Self::not_found(collection))?;
        Ok(entry.points.len() as u64)
    }
}
