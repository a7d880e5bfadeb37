//! Embedding service.

use crate::client::OllamaClient;
use crate::device::ComputeDevice;
use crate::error::{ModelError, ModelResult};
use crate::types::GenerateOptions;
use alexandria_config::OllamaConfig;
use async_trait::async_trait;
use tracing::{debug, info};

/// Inputs per /api/embed request.
const EMBED_REQUEST_SIZE: usize = 64;

/// Produces one fixed-dimension vector per input text, order preserved.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimension of every vector this embedder returns.
    fn dimension(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>>;
}

/// Embedder backed by an Ollama embedding model.
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dimension: usize,
    device: ComputeDevice,
}

impl OllamaEmbedder {
    /// Create an embedder without checking the server.
    pub fn new(client: OllamaClient, model: impl Into<String>, dimension: usize, device: ComputeDevice) -> Self {
        Self {
            client,
            model: model.into(),
            dimension,
            device,
        }
    }

    /// Connect to Ollama and verify the embedding model is present.
    pub async fn load(config: &OllamaConfig, device: ComputeDevice) -> ModelResult<Self> {
        if config.embedding_dimensions == 0 {
            return Err(ModelError::InvalidConfig("embedding_dimensions must be > 0".to_string()));
        }

        let client = OllamaClient::from_config(config)?;
        if !client.is_available().await {
            return Err(ModelError::ServerNotRunning {
                host: client.host().to_string(),
            });
        }
        if !client.has_model(&config.embedding_model).await? {
            return Err(ModelError::ModelNotFound {
                model: config.embedding_model.clone(),
            });
        }

        info!(
            "Embedding model ready: {} ({} dimensions)",
            config.embedding_model, config.embedding_dimensions
        );
        Ok(Self::new(client, &config.embedding_model, config.embedding_dimensions, device))
    }

    /// Unload the model from the server.
    pub async fn release(&self) -> ModelResult<()> {
        self.client.unload(&self.model).await?;
        info!("Released embedding model {}", self.model);
        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        let options = GenerateOptions::new().with_num_gpu(self.device.num_gpu());

        for batch in texts.chunks(EMBED_REQUEST_SIZE) {
            let batch_vectors = self.client.embed_batch(&self.model, batch, Some(options.clone())).await?;

            for vector in &batch_vectors {
                if vector.len() != self.dimension {
                    return Err(ModelError::DimensionMismatch {
                        expected: self.dimension,
                        actual: vector.len(),
                    });
                }
            }
            vectors.extend(batch_vectors);
        }

        debug!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }
}
