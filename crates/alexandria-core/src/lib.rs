//! Alexandria Core - Domain types shared by the ingestion pipeline.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
