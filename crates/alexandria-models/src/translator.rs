//! Batched translation service.

use crate::client::OllamaClient;
use crate::device::ComputeDevice;
use crate::error::{ModelError, ModelResult};
use crate::types::{GenerateOptions, GenerateRequest};
use alexandria_config::{OllamaConfig, TranslationConfig};
use async_trait::async_trait;
use tracing::info;

/// Fixed sampling seed so repeated runs translate identically.
const DECODING_SEED: i32 = 42;

/// Translates ordered texts, returning the same number of outputs in order.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, texts: &[String]) -> ModelResult<Vec<String>>;
}

/// Decoding strategy, derived from the configured beam count.
///
/// Ollama exposes sampling rather than beam search, so a wider beam maps
/// to a slightly broader but still seeded candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoding {
    Greedy,
    Quality { num_beams: u32 },
}

impl Decoding {
    pub fn from_num_beams(num_beams: u32) -> Self {
        if num_beams <= 1 {
            Decoding::Greedy
        } else {
            Decoding::Quality { num_beams }
        }
    }

    pub fn options(&self) -> GenerateOptions {
        match self {
            Decoding::Greedy => GenerateOptions::new()
                .with_temperature(0.0)
                .with_top_k(1)
                .with_seed(DECODING_SEED),
            Decoding::Quality { num_beams } => GenerateOptions::new()
                .with_temperature(0.2)
                .with_top_k((*num_beams as i32).saturating_mul(10))
                .with_seed(DECODING_SEED),
        }
    }
}

/// Clip a text to `max_tokens * 4` characters, then to `max_tokens` whitespace tokens.
pub fn truncate_input(text: &str, max_tokens: usize) -> String {
    let clipped: String = text.chars().take(max_tokens.saturating_mul(4)).collect();

    let tokens: Vec<&str> = clipped.split_whitespace().collect();
    if tokens.len() > max_tokens {
        tokens[..max_tokens].join(" ")
    } else {
        clipped
    }
}

/// Translator backed by an Ollama instruction model.
pub struct OllamaTranslator {
    client: OllamaClient,
    model: String,
    source_language: String,
    target_language: String,
    batch_size: usize,
    max_input_tokens: usize,
    decoding: Decoding,
    device: ComputeDevice,
}

impl OllamaTranslator {
    /// Create a translator without checking the server.
    pub fn new(
        client: OllamaClient,
        model: impl Into<String>,
        config: &TranslationConfig,
        device: ComputeDevice,
    ) -> ModelResult<Self> {
        if config.batch_size == 0 {
            return Err(ModelError::InvalidConfig("translation.batch_size must be > 0".to_string()));
        }
        if config.max_input_tokens == 0 {
            return Err(ModelError::InvalidConfig(
                "translation.max_input_tokens must be > 0".to_string(),
            ));
        }

        Ok(Self {
            client,
            model: model.into(),
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            batch_size: config.batch_size,
            max_input_tokens: config.max_input_tokens,
            decoding: Decoding::from_num_beams(config.num_beams),
            device,
        })
    }

    /// Connect to Ollama and verify the translation model is present.
    pub async fn load(ollama: &OllamaConfig, config: &TranslationConfig, device: ComputeDevice) -> ModelResult<Self> {
        let client = OllamaClient::from_config(ollama)?;
        if !client.is_available().await {
            return Err(ModelError::ServerNotRunning {
                host: client.host().to_string(),
            });
        }
        if !client.has_model(&ollama.translation_model).await? {
            return Err(ModelError::ModelNotFound {
                model: ollama.translation_model.clone(),
            });
        }

        let translator = Self::new(client, &ollama.translation_model, config, device)?;
        info!(
            "Translation model ready: {} ({} -> {}, {:?})",
            translator.model, translator.source_language, translator.target_language, translator.decoding
        );
        Ok(translator)
    }

    /// Unload the model from the server.
    pub async fn release(&self) -> ModelResult<()> {
        self.client.unload(&self.model).await?;
        info!("Released translation model {}", self.model);
        Ok(())
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a professional translator of scientific papers. Translate the user's text from {} to {}. \
             Output only the translation, with no preamble or commentary.",
            self.source_language, self.target_language
        )
    }

    async fn translate_one(&self, text: &str, system: &str) -> ModelResult<String> {
        let input = truncate_input(text, self.max_input_tokens);
        if input.trim().is_empty() {
            return Ok(String::new());
        }

        let options = self
            .decoding
            .options()
            .with_num_predict(self.max_input_tokens as i32)
            .with_num_gpu(self.device.num_gpu());

        let request = GenerateRequest::new(&self.model, input)
            .with_system(system)
            .with_options(options);

        let response = self.client.generate(request).await?;
        Ok(response.response.trim().to_string())
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(&self, texts: &[String]) -> ModelResult<Vec<String>> {
        let system = self.system_prompt();
        let total_batches = texts.len().div_ceil(self.batch_size);
        let mut translations = Vec::with_capacity(texts.len());

        for (index, batch) in texts.chunks(self.batch_size).enumerate() {
            let batch_number = index + 1;
            if batch_number == 1 || batch_number % 5 == 0 || batch_number == total_batches {
                info!("Translating batch {}/{}", batch_number, total_batches);
            }

            for text in batch {
                translations.push(self.translate_one(text, &system).await?);
            }
        }

        Ok(translations)
    }
}
