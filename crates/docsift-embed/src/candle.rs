//! GTE-small embedder using Candle.
//!
//! Uses thenlper/gte-small model for text embeddings:
//! - 384 dimensions
//! - 512 max tokens
//! - BERT architecture

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use docsift_core::{EmbedError, Embedder};
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Model identifier on HuggingFace Hub.
const MODEL_ID: &str = "thenlper/gte-small";

/// Embedding dimension for gte-small.
const EMBEDDING_DIM: usize = 384;

/// Maximum sequence length.
const MAX_TOKENS: usize = 512;

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
}

/// GTE-small embedder using Candle.
pub struct CandleEmbedder {
    /// Device to run inference on (CPU or CUDA)
    device: Device,
    /// Directory the hub client downloads model files into
    cache_dir: PathBuf,
    loaded: OnceCell<LoadedModel>,
}

impl CandleEmbedder {
    /// Output dimension of the model.
    pub const DIMENSION: usize = EMBEDDING_DIM;

    /// Create a new embedder; nothing is downloaded until [`Embedder::init`].
    #[must_use]
    pub fn new(cache_dir: PathBuf) -> Self {
        // Try to use CUDA if available, fallback to CPU
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        info!("CandleEmbedder using device: {:?}", device);
        Self::with_device(cache_dir, device)
    }

    /// Create with specific device.
    #[must_use]
    pub fn with_device(cache_dir: PathBuf, device: Device) -> Self {
        Self {
            device,
            cache_dir,
            loaded: OnceCell::new(),
        }
    }

    async fn loaded(&self) -> Result<&LoadedModel, EmbedError> {
        self.loaded.get_or_try_init(|| self.load()).await
    }

    /// Download model files if needed and load them into memory.
    async fn load(&self) -> Result<LoadedModel, EmbedError> {
        info!("Loading {} into {:?}", MODEL_ID, self.cache_dir);

        let api = ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .build()
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to create HF API: {e}")))?;
        let repo = api.repo(Repo::new(MODEL_ID.to_string(), RepoType::Model));

        debug!("Fetching tokenizer, config and weights...");
        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to download tokenizer: {e}")))?;
        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to download config: {e}")))?;
        let weights_path = repo
            .get("model.safetensors")
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to download weights: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to load tokenizer: {e}")))?;

        let config_str = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to read config: {e}")))?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to parse config: {e}")))?;

        // SAFETY: the safetensors file comes from the hub cache and is only
        // read through the mapping.
        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &self.device)
                .map_err(|e| EmbedError::ModelLoad(format!("Failed to load weights: {e}")))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to create BERT model: {e}")))?;

        info!("CandleEmbedder initialized successfully");
        Ok(LoadedModel { model, tokenizer })
    }

    /// Encode one text: mean pooling over the attention mask, then L2
    /// normalization.
    fn encode(&self, loaded: &LoadedModel, text: &str) -> Result<Vec<f32>, EmbedError> {
        let inference = |stage: &str| {
            let stage = stage.to_string();
            move |e: candle_core::Error| EmbedError::Inference(format!("{stage} failed: {e}"))
        };

        let encoding = loaded
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbedError::Inference(format!("Tokenization failed: {e}")))?;
        let ids: Vec<u32> = encoding.get_ids().iter().take(MAX_TOKENS).copied().collect();
        let len = ids.len();

        let input_ids =
            Tensor::from_vec(ids, (1, len), &self.device).map_err(inference("input_ids"))?;
        let token_type_ids = input_ids.zeros_like().map_err(inference("token_type_ids"))?;
        let attention_mask = input_ids.ones_like().map_err(inference("attention_mask"))?;

        let output = loaded
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(inference("Model forward"))?;

        // Every position is attended, so the masked mean is a plain mean.
        let pooled = output.mean(1).map_err(inference("mean pooling"))?;
        let norm = pooled
            .sqr()
            .and_then(|t| t.sum_keepdim(1))
            .and_then(|t| t.sqrt())
            .and_then(|t| t.clamp(1e-12, f64::MAX))
            .map_err(inference("norm"))?;
        let normalized = pooled.broadcast_div(&norm).map_err(inference("normalize"))?;

        normalized
            .get(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(inference("to_vec"))
    }
}

#[async_trait]
impl Embedder for CandleEmbedder {
    fn model_name(&self) -> &str {
        MODEL_ID
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    async fn init(&self) -> Result<(), EmbedError> {
        self.loaded().await.map(|_| ())
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let loaded = self.loaded().await?;
        self.encode(loaded, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_metadata() {
        let cache_dir = tempdir().unwrap();
        let embedder = CandleEmbedder::with_device(cache_dir.path().to_path_buf(), Device::Cpu);
        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.model_name(), "thenlper/gte-small");
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_candle_embedder() {
        let cache_dir = tempdir().unwrap();
        let embedder = CandleEmbedder::new(cache_dir.path().to_path_buf());

        embedder.init().await.unwrap();

        let embedding = embedder.embed_text("Hello world").await.unwrap();
        assert_eq!(embedding.len(), 384);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }
}
