//! Alexandria Models - Embedding and translation services backed by Ollama.
//!
//! The pipeline depends on the [`Embedder`] and [`Translator`] traits only.
//! [`OllamaEmbedder`] and [`OllamaTranslator`] are constructed once per run
//! with `load`, shared read-only across documents, and released at the end.

mod client;
mod device;
mod embedder;
mod error;
mod translator;
mod types;

pub use client::OllamaClient;
pub use device::ComputeDevice;
pub use embedder::{Embedder, OllamaEmbedder};
pub use error::{ModelError, ModelResult};
pub use translator::{truncate_input, Decoding, OllamaTranslator, Translator};
pub use types::*;
