//! Ingest command implementation.

use super::{load_config, print_summary};
use alexandria_db::open_store;
use alexandria_ingest::{discover_pdfs, DocumentOutcome, Ingestor, Progress};
use alexandria_models::{ComputeDevice, OllamaEmbedder, OllamaTranslator};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::warn;

/// Ingest every PDF in `dir` (or the configured input directory).
pub fn run(dir: Option<PathBuf>, no_translate: bool, dry_run: bool) -> Result<()> {
    let config = load_config()?;

    let dir = dir.unwrap_or_else(|| PathBuf::from(&config.ingest.input_dir));
    if !dir.is_dir() {
        println!("{} Directory not found: {}", "Note:".yellow().bold(), dir.display());
        return Ok(());
    }

    let files = discover_pdfs(&dir).context("Failed to list input directory")?;
    if files.is_empty() {
        println!("{} No PDF files in {}", "Note:".yellow().bold(), dir.display());
        return Ok(());
    }

    println!("Found {} PDF files in {}", files.len(), dir.display());

    if dry_run {
        for path in &files {
            println!("  {}", path.display());
        }
        println!("\n{}", "Dry run - no files were ingested.".cyan());
        return Ok(());
    }

    let rt = Runtime::new().context("Failed to create async runtime")?;
    let translate = config.translation.enabled && !no_translate;
    let device = ComputeDevice::resolve(config.translation.device);

    println!("{} Loading models (device: {})", "→".cyan(), device);
    let embedder = Arc::new(
        rt.block_on(OllamaEmbedder::load(&config.ollama, device))
            .context("Failed to load embedding model")?,
    );
    println!("  {} Embedding model: {}", "✓".green(), embedder.model());
    let translator = if translate {
        let translator = rt
            .block_on(OllamaTranslator::load(&config.ollama, &config.translation, device))
            .context("Failed to load translation model")?;
        Some(Arc::new(translator))
    } else {
        None
    };

    let store = open_store(&config.store).context("Failed to open document store")?;

    let mut ingestor = Ingestor::new(&config, store, embedder.clone());
    if let Some(translator) = &translator {
        ingestor = ingestor.with_translator(translator.clone());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = rt.block_on(ingestor.ingest_paths(&files, |progress| match progress {
        Progress::Started { storage_path, .. } => pb.set_message(storage_path.to_string()),
        Progress::Finished { storage_path, outcome } => {
            match outcome {
                DocumentOutcome::Skipped => {
                    pb.println(format!("  {} {} (already ingested)", "•".dimmed(), storage_path));
                }
                DocumentOutcome::Completed {
                    chunks,
                    translated,
                    ocr_pages,
                    ..
                } => {
                    pb.println(format!(
                        "  {} {} ({} chunks, {} translated, {} OCR pages)",
                        "✓".green(),
                        storage_path,
                        chunks,
                        translated,
                        ocr_pages
                    ));
                }
                DocumentOutcome::Failed { error } => {
                    pb.println(format!("  {} {}: {}", "✗".red(), storage_path, error.dimmed()));
                }
            }
            pb.inc(1);
        }
    }));
    pb.finish_and_clear();

    println!();
    println!("{} {} documents", "Ingested:".green().bold(), report.completed);
    if report.skipped > 0 {
        println!("{} {} documents (already ingested)", "Skipped:".yellow().bold(), report.skipped);
    }
    if report.failed > 0 {
        println!("{} {} documents", "Failed:".red().bold(), report.failed);
    }
    println!(
        "  {} chunks written, {} translated",
        report.chunks_written, report.translated_chunks
    );

    println!();
    match rt.block_on(ingestor.corpus_summary()) {
        Some(summary) => print_summary(&summary),
        None => println!("{}", "Corpus summary unavailable.".dimmed()),
    }

    if let Err(e) = rt.block_on(embedder.release()) {
        warn!("Could not release embedding model: {}", e);
    }
    if let Some(translator) = &translator {
        if let Err(e) = rt.block_on(translator.release()) {
            warn!("Could not release translation model: {}", e);
        }
    }

    Ok(())
}
