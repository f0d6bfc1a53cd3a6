//! Embedding provider: lazy backend initialization plus vector validation.

use docsift_core::{normalize_for_embedding, EmbedError, Embedder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Front door for all embedding requests.
///
/// The backend's [`Embedder::init`] runs at most once successfully. Callers
/// racing on the first request wait for the same initialization; a failed
/// initialization is attempted again on the next call.
pub struct EmbeddingProvider {
    backend: Arc<dyn Embedder>,
    ready: OnceCell<()>,
}

impl EmbeddingProvider {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn Embedder>) -> Self {
        Self {
            backend,
            ready: OnceCell::new(),
        }
    }

    /// Model name of the backend.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Dimension every returned vector has.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    /// Whether the backend finished initializing.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    /// Initialize the backend if it has not been yet.
    ///
    /// # Errors
    ///
    /// Returns the backend's initialization error.
    pub async fn ensure_initialized(&self) -> Result<(), EmbedError> {
        self.ready
            .get_or_try_init(|| async {
                info!("Initializing embedding backend: {}", self.backend.model_name());
                self.backend.init().await.inspect_err(|e| {
                    warn!("Embedding backend initialization failed: {}", e);
                })
            })
            .await
            .map(|_| ())
    }

    /// Embed `text`.
    ///
    /// The text is trimmed and whitespace runs collapsed before it reaches
    /// the backend.
    ///
    /// # Errors
    ///
    /// `EmptyInput` for blank text, the backend's error, or a validation
    /// error when the vector has the wrong length, a non-finite component or
    /// no non-zero component.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let normalized = normalize_for_embedding(text);
        if normalized.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        self.ensure_initialized().await?;

        debug!("Embedding {} chars", normalized.len());
        let vector = self.backend.embed_text(&normalized).await?;
        validate_embedding(&vector, self.dimension())?;
        Ok(vector)
    }
}

/// Check an embedding's length, finiteness and non-zero-ness.
///
/// # Errors
///
/// `DimensionMismatch`, `NonFinite` or `ZeroVector`.
pub fn validate_embedding(vector: &[f32], expected: usize) -> Result<(), EmbedError> {
    if vector.len() != expected {
        return Err(EmbedError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
        return Err(EmbedError::NonFinite { index });
    }
    if vector.iter().all(|v| *v == 0.0) {
        return Err(EmbedError::ZeroVector);
    }
    Ok(())
}
