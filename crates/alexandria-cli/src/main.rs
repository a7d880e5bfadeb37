//! Alexandria CLI - Ingest a folder of PDFs into a searchable corpus.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Alexandria - PDF to chunks + embeddings ingestion
#[derive(Parser)]
#[command(name = "alexandria")]
#[command(version)]
#[command(about = "Ingest PDFs into a chunked, embedded corpus", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Alexandria (create config and, for SQLite, the database)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show corpus counts and external tool availability
    Status,

    /// Ingest every PDF in a directory
    Ingest {
        /// Input directory (default: ingest.input_dir from config)
        dir: Option<PathBuf>,

        /// Skip French translation for this run
        #[arg(long)]
        no_translate: bool,

        /// List the PDFs that would be processed and exit
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("alexandria=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("alexandria=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
        },
        Commands::Status => commands::status::run(),
        Commands::Ingest {
            dir,
            no_translate,
            dry_run,
        } => commands::ingest::run(dir, no_translate, dry_run),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
