//! Ollama HTTP client.

use crate::error::{ModelError, ModelResult};
use crate::types::*;
use alexandria_config::OllamaConfig;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Client for interacting with Ollama's API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &OllamaConfig) -> ModelResult<Self> {
        Self::with_timeout(&config.host, Duration::from_secs(config.timeout_seconds))
    }

    /// Create a new client with default settings.
    pub fn new(host: impl Into<String>) -> ModelResult<Self> {
        Self::with_timeout(&host.into(), Duration::from_secs(120))
    }

    fn with_timeout(host: &str, timeout: Duration) -> ModelResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(ModelError::Http)?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check if Ollama server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List all available models.
    pub async fn list_models(&self) -> ModelResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Listing models from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::ApiError { status, message: text });
        }

        let list: ListModelsResponse = response.json().await?;
        Ok(list.models)
    }

    /// Check if a specific model is available.
    pub async fn has_model(&self, model: &str) -> ModelResult<bool> {
        let models = self.list_models().await?;
        // Check both exact match and model without tag
        Ok(models
            .iter()
            .any(|m| m.name == model || m.name.starts_with(&format!("{}:", model))))
    }

    /// Generate embeddings for a batch of texts in one request.
    pub async fn embed_batch(
        &self,
        model: &str,
        texts: &[String],
        options: Option<GenerateOptions>,
    ) -> ModelResult<Vec<Vec<f32>>> {
        debug!("Embedding {} texts with model {}", texts.len(), model);

        let request = EmbedRequest {
            model: model.to_string(),
            input: texts.to_vec(),
            truncate: Some(true),
            options,
        };

        let response = self.post_json("/api/embed", model, &request).await?;
        let embed_response: EmbedResponse = response.json().await?;

        if embed_response.embeddings.len() != texts.len() {
            return Err(ModelError::CountMismatch {
                expected: texts.len(),
                actual: embed_response.embeddings.len(),
            });
        }

        Ok(embed_response.embeddings)
    }

    /// Generate text (non-streaming).
    pub async fn generate(&self, request: GenerateRequest) -> ModelResult<GenerateResponse> {
        debug!("Generating with model {}", request.model);

        // Ensure streaming is off for this method
        let mut request = request;
        request.stream = false;

        let response = self.post_json("/api/generate", &request.model, &request).await?;
        let generate_response: GenerateResponse = response.json().await?;
        Ok(generate_response)
    }

    /// Ask the server to evict a model from memory.
    pub async fn unload(&self, model: &str) -> ModelResult<()> {
        debug!("Unloading model {}", model);
        let request = GenerateRequest::new(model, "").with_keep_alive(0);
        self.post_json("/api/generate", model, &request).await?;
        Ok(())
    }

    async fn post_json<T: Serialize + ?Sized>(&self, endpoint: &str, model: &str, body: &T) -> ModelResult<Response> {
        let url = format!("{}{}", self.host, endpoint);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            // Check for model not found
            if text.contains("not found") || status.as_u16() == 404 {
                return Err(ModelError::ModelNotFound { model: model.to_string() });
            }

            return Err(ModelError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(response)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_connect() {
            ModelError::ServerNotRunning { host: self.host.clone() }
        } else if e.is_timeout() {
            ModelError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            ModelError::Http(e)
        }
    }
}
