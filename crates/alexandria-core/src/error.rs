//! Error types for Alexandria.

use thiserror::Error;

/// Core error type for Alexandria operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
}

/// Result type alias using Alexandria's Error.
pub type Result<T> = std::result::Result<T, Error>;
