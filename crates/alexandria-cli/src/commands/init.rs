//! Initialize Alexandria.

use super::get_paths;
use alexandria_config::{Config, StoreBackend};
use alexandria_db::Database;
use anyhow::{Context, Result};
use colored::Colorize;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    if paths.is_initialized() {
        println!("{} Alexandria is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        return Ok(());
    }

    println!("{}", "Initializing Alexandria...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
    println!("  {} Created config: {}", "✓".green(), paths.config_file.display());

    let config = Config::load().context("Failed to load the new config")?;
    if config.store.backend == StoreBackend::Sqlite {
        let db_path = config
            .store
            .database_path
            .clone()
            .unwrap_or_else(|| paths.default_database_path());
        Database::open(&db_path).context("Failed to initialize database")?;
        println!("  {} Created database: {}", "✓".green(), db_path);
    }

    println!();
    println!("{}", "Alexandria initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Set {} and {} (or put them in .env)",
        "NEXT_PUBLIC_SUPABASE_URL".cyan(),
        "SUPABASE_SERVICE_ROLE_KEY".cyan()
    );
    println!("  2. Pull the models: {}", "ollama pull all-minilm".cyan());
    println!("  3. Ingest: {}", "alexandria ingest ./data/pdfs".cyan());

    Ok(())
}
