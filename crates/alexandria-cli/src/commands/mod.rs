//! CLI command implementations.

pub mod config;
pub mod ingest;
pub mod init;
pub mod status;

use alexandria_config::{AppPaths, Config};
use alexandria_core::CorpusSummary;
use anyhow::{Context, Result};
use colored::Colorize;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load `.env` files and the config file, then check the result.
pub fn load_config() -> Result<Config> {
    alexandria_config::load_dotenv();
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Print corpus counts.
pub fn print_summary(summary: &CorpusSummary) {
    println!("{}", "Corpus".white().bold());
    println!("  {} Documents done: {}", "●".green(), summary.documents_done);
    println!("  {} Chunks: {}", "●".green(), summary.total_chunks);
    println!("  {} Translated chunks: {}", "●".green(), summary.translated_chunks);
}
