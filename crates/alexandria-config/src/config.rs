//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables holding the store endpoint, in lookup order.
pub const STORE_URL_VARS: [&str; 2] = ["NEXT_PUBLIC_SUPABASE_URL", "SUPABASE_URL"];

/// Environment variable holding the store credential.
pub const STORE_KEY_VAR: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Environment variable overriding the Ollama host.
pub const OLLAMA_HOST_VAR: &str = "ALEXANDRIA_OLLAMA_HOST";

/// Load `.env.local`, then `.env`, from the working directory.
///
/// Missing files are ignored. Variables already set win.
pub fn load_dotenv() {
    for path in AppPaths::env_files(Path::new(".")) {
        if dotenvy::from_path(&path).is_ok() {
            debug!("Loaded environment from {}", path.display());
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Load configuration from the default location, then apply the environment.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        let mut config = Self::load_from(&paths.config_file)?;
        if config.store.database_path.is_none() {
            config.store.database_path = Some(paths.default_database_path());
        }
        config.apply_env(|key| std::env::var(key).ok());
        config.expand_paths();
        Ok(config)
    }

    /// Expand a leading `~` in the filesystem paths of the config.
    pub fn expand_paths(&mut self) {
        if let Some(path) = self.store.database_path.as_mut() {
            *path = shellexpand::tilde(path.as_str()).into_owned();
        }
        self.ingest.input_dir = shellexpand::tilde(&self.ingest.input_dir).into_owned();
    }

    /// Load configuration from a specific path, without environment overrides.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Override settings from environment variables supplied by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = STORE_URL_VARS.into_iter().find_map(|key| non_empty(key)) {
            self.store.url = Some(url);
        }
        if let Some(key) = non_empty(STORE_KEY_VAR) {
            self.store.service_role_key = Some(key);
        }
        if let Some(host) = non_empty(OLLAMA_HOST_VAR) {
            self.ollama.host = host;
        }
    }

    /// Check everything a run needs before any document is touched.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.backend == StoreBackend::Supabase {
            self.store.supabase_credentials()?;
        }
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunking.chunk_size must be positive".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::Invalid(
                "chunking.chunk_overlap must be smaller than chunking.chunk_size".to_string(),
            ));
        }
        if self.translation.batch_size == 0 || self.ingest.insert_batch_size == 0 {
            return Err(ConfigError::Invalid("batch sizes must be positive".to_string()));
        }
        if self.translation.num_beams == 0 {
            return Err(ConfigError::Invalid("translation.num_beams must be at least 1".to_string()));
        }
        if self.ollama.embedding_dimensions == 0 {
            return Err(ConfigError::Invalid("ollama.embedding_dimensions must be positive".to_string()));
        }
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &PathBuf) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Alexandria ingestion configuration

[store]
# "supabase" (hosted Postgres via PostgREST) or "sqlite" (local file)
backend = "supabase"
# Leave url and key empty and set NEXT_PUBLIC_SUPABASE_URL (or SUPABASE_URL)
# and SUPABASE_SERVICE_ROLE_KEY in .env.local instead.
# url = "https://<project-ref>.supabase.co"
# SQLite file for backend = "sqlite"; a leading ~ is expanded
# database_path = "~/alexandria/alexandria.db"
timeout_seconds = 60

[ollama]
host = "http://localhost:11434"
embedding_model = "all-minilm"
embedding_dimensions = 384
translation_model = "llama3.2"
timeout_seconds = 120

[extraction]
# Pages with fewer native characters than this are sent to OCR
min_chars_per_page = 50
ocr_dpi = 150
ocr_language = "eng"
# Characters of leading text scanned for title/authors/DOI
metadata_window = 10000

[chunking]
chunk_size = 600               # Characters before a size-triggered split
chunk_overlap = 100            # Minimum overlap carried into the next chunk
fallback_chars = 8000

[translation]
enabled = true
source_language = "English"
target_language = "French"
batch_size = 24
max_input_tokens = 512
# 1 = greedy (fast); >1 = slower, higher quality decoding
num_beams = 1
# auto, gpu or cpu
device = "auto"

[ingest]
input_dir = "data/pdfs"
storage_prefix = "data/pdfs"
insert_batch_size = 50
"#
        .to_string()
    }
}

/// Which destination store backs the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Supabase,
    Sqlite,
}

/// Validated endpoint and credential for the hosted store.
#[derive(Debug, Clone)]
pub struct SupabaseCredentials {
    pub url: String,
    pub service_role_key: String,
}

/// Destination store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub database_path: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Supabase,
            url: None,
            service_role_key: None,
            database_path: None,
            timeout_seconds: 60,
        }
    }
}

impl StoreConfig {
    /// Return the hosted store endpoint and credential, both required.
    pub fn supabase_credentials(&self) -> ConfigResult<SupabaseCredentials> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential(STORE_URL_VARS.join(" or ")))?;
        let key = self
            .service_role_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential(STORE_KEY_VAR.to_string()))?;

        if !url.starts_with("https://") || !url.contains(".supabase.co") {
            return Err(ConfigError::InvalidEndpoint(url.to_string()));
        }

        Ok(SupabaseCredentials {
            url: url.trim_end_matches('/').to_string(),
            service_role_key: key.to_string(),
        })
    }
}

/// Ollama model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub translation_model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            embedding_model: "all-minilm".to_string(),
            embedding_dimensions: 384,
            translation_model: "llama3.2".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Text extraction and OCR settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub min_chars_per_page: usize,
    pub ocr_dpi: u32,
    pub ocr_language: String,
    pub metadata_window: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_chars_per_page: 50,
            ocr_dpi: 150,
            ocr_language: "eng".to_string(),
            metadata_window: 10_000,
        }
    }
}

/// Section-aware chunking settings, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub fallback_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            chunk_overlap: 100,
            fallback_chars: 8000,
        }
    }
}

/// Where translation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Auto,
    Gpu,
    Cpu,
}

/// Bilingual translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub source_language: String,
    pub target_language: String,
    pub batch_size: usize,
    pub max_input_tokens: usize,
    pub num_beams: u32,
    pub device: DevicePreference,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_language: "English".to_string(),
            target_language: "French".to_string(),
            batch_size: 24,
            max_input_tokens: 512,
            num_beams: 1,
            device: DevicePreference::Auto,
        }
    }
}

/// Run-level ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub input_dir: String,
    pub storage_prefix: String,
    pub insert_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_dir: "data/pdfs".to_string(),
            storage_prefix: "data/pdfs".to_string(),
            insert_batch_size: 50,
        }
    }
}
