//! Shared helper functions for CLI commands
//!
//! Data directory and configuration resolution, plus profile arguments used
//! by more than one subcommand.

use anyhow::Context;
use clap::Args;
use fitrec_core::{error::Result, FitrecConfig, ProfileSnapshot, Sex};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "fitrec.toml";

/// Get the default data directory using XDG_DATA_HOME standard
pub fn get_default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitrec")
}

/// Config file path: explicit flag, else `<data_dir>/fitrec.toml`
pub fn config_path(data_dir: Option<&Path>, config: Option<&Path>) -> PathBuf {
    match config {
        Some(path) => path.to_path_buf(),
        None => data_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(get_default_data_dir)
            .join(CONFIG_FILE),
    }
}

/// Resolve the effective configuration
///
/// A `--data-dir` flag (or `FITREC_DATA_DIR`) wins over the file's `data_dir`.
/// Without a config file the defaults apply.
pub fn load_config(data_dir: Option<PathBuf>, config: Option<PathBuf>) -> Result<FitrecConfig> {
    let path = config_path(data_dir.as_deref(), config.as_deref());
    let explicit = config.is_some();

    let mut resolved = if path.exists() {
        debug!("Loading configuration from {}", path.display());
        FitrecConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
    } else if explicit {
        return Err(anyhow::anyhow!("Config file not found: {}", path.display()).into());
    } else {
        FitrecConfig::with_data_dir(data_dir.clone().unwrap_or_else(get_default_data_dir))
    };

    if let Some(dir) = data_dir {
        resolved.data_dir = dir;
    }
    resolved.validate()?;
    Ok(resolved)
}

/// Personal fields shared by `recommend` and `feedback`
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Age in years
    #[arg(long)]
    pub age: f64,

    /// Weight in kilograms
    #[arg(long)]
    pub weight: f64,

    /// Height in centimetres
    #[arg(long)]
    pub height: f64,

    /// male or female
    #[arg(long)]
    pub sex: Sex,
}

impl ProfileArgs {
    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot::new(self.age, self.weight, self.height, self.sex)
    }
}
