//! Where Alexandria keeps its files.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment files looked up in the working directory, in load order.
pub const ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// Config and data locations following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
}

impl AppPaths {
    /// Platform directories, e.g. `~/.config/alexandria` on Linux.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("org", "alexandria", "alexandria")?;
        Some(Self::with_dirs(proj_dirs.config_dir(), proj_dirs.data_dir()))
    }

    /// Paths rooted at explicit directories.
    pub fn with_dirs(config_dir: &Path, data_dir: &Path) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            database_file: data_dir.join("alexandria.db"),
            config_dir: config_dir.to_path_buf(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    /// Create all necessary directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Whether `alexandria init` has written a config file.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }

    /// SQLite location used when `store.database_path` is unset.
    pub fn default_database_path(&self) -> String {
        self.database_file.to_string_lossy().into_owned()
    }

    /// The existing [`ENV_FILES`] inside `dir`, in load order.
    pub fn env_files(dir: &Path) -> Vec<PathBuf> {
        ENV_FILES
            .iter()
            .map(|name| dir.join(name))
            .filter(|path| path.is_file())
            .collect()
    }
}
