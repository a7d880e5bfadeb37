//! Configuration commands.

use super::get_paths;
use alexandria_config::Config;
use anyhow::{Context, Result};
use colored::Colorize;

/// Print the effective configuration, credential redacted.
pub fn show() -> Result<()> {
    let paths = get_paths()?;
    alexandria_config::load_dotenv();

    let mut config = Config::load().context("Failed to load configuration")?;
    if config.store.service_role_key.is_some() {
        config.store.service_role_key = Some("********".to_string());
    }

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    if paths.config_file.exists() {
        println!("{}", format!("# {}", paths.config_file.display()).dimmed());
    } else {
        println!("{}", "# defaults (no config file, run 'alexandria init')".dimmed());
    }
    println!("{}", config.to_toml_string().context("Failed to render configuration")?);

    if let Err(e) = config.validate() {
        println!("{} {}", "Warning:".yellow().bold(), e);
    }

    Ok(())
}
