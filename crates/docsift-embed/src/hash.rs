//! Deterministic offline embedder based on feature hashing.
//!
//! Every lower-cased word is hashed with blake3 into one signed bucket; the
//! resulting vector is L2-normalized. Texts sharing words get a positive
//! cosine similarity, which is enough for tests and air-gapped setups.

use async_trait::async_trait;
use docsift_core::{EmbedError, Embedder};

/// Feature-hashing embedder.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create an embedder producing vectors of `dimension` components.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase);

        for word in words {
            let hash = blake3::hash(word.as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "docsift-hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.vectorize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_text("Asthma follow-up").await.unwrap();
        let b = embedder.embed_text("asthma FOLLOW up").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_words_are_similar() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed_text("asthma").await.unwrap();
        let related = embedder.embed_text("patient with asthma").await.unwrap();

        assert!(cosine(&query, &related) > 0.3);
    }

    #[tokio::test]
    async fn test_no_words_yields_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let vector = embedder.embed_text("?!").await.unwrap();
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_dimension_floor() {
        assert_eq!(HashEmbedder::new(0).dimension(), 1);
        assert_eq!(HashEmbedder::default().model_name(), "docsift-hash");
    }
}
