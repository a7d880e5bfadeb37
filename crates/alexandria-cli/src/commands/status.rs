//! Status command - corpus counts and tool availability.

use super::{load_config, print_summary};
use alexandria_db::open_store;
use alexandria_models::OllamaClient;
use anyhow::{Context, Result};
use colored::Colorize;
use tokio::runtime::Runtime;

pub fn run() -> Result<()> {
    let config = load_config()?;
    let rt = Runtime::new().context("Failed to create async runtime")?;

    println!("{}", "Alexandria Status".cyan().bold());
    println!("{}", "─".repeat(50));
    println!();

    let store = open_store(&config.store).context("Failed to open document store")?;
    match rt.block_on(store.corpus_summary()) {
        Ok(summary) => print_summary(&summary),
        Err(e) => println!("{} Corpus summary unavailable: {}", "✗".red(), e),
    }

    println!();
    println!("{}", "External Tools".white().bold());
    for (tool, available) in alexandria_process::check_dependencies() {
        if available {
            println!("  {} {}", "●".green(), tool);
        } else {
            println!("  {} {} (not found; scanned pages cannot be OCR'd)", "✗".red(), tool);
        }
    }

    println!();
    println!("{}", "Ollama".white().bold());
    let client = OllamaClient::from_config(&config.ollama).context("Failed to create Ollama client")?;
    if !rt.block_on(client.is_available()) {
        println!("  {} Server not reachable at {}", "✗".red(), client.host());
        return Ok(());
    }
    println!("  {} Server at {}", "●".green(), client.host());

    for model in [&config.ollama.embedding_model, &config.ollama.translation_model] {
        match rt.block_on(client.has_model(model)) {
            Ok(true) => println!("  {} {}", "●".green(), model),
            Ok(false) => println!("  {} {} (run 'ollama pull {}')", "○".yellow(), model, model),
            Err(e) => println!("  {} {}: {}", "✗".red(), model, e),
        }
    }

    Ok(())
}
