//! Error types for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur during ingestion.
///
/// Everything except `Config` is caught at document granularity and
/// recorded on the document row.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] alexandria_config::ConfigError),

    #[error("Extraction error for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Processing error: {0}")]
    Processing(#[from] alexandria_models::ModelError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] alexandria_db::DbError),
}
