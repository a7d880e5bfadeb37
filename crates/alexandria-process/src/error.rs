//! Error types for page rendering and OCR.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for processing operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors that can occur while rasterizing or recognizing a page.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Tool not found: {tool}. Please install it.")]
    ToolNotFound { tool: String },

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("OCR error: {0}")]
    OcrError(String),

    #[error("Invalid page number: {0}")]
    InvalidPage(u32),
}
