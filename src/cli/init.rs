//! Write a default configuration file

use super::helpers::{config_path, get_default_data_dir};
use fitrec_core::{error::Result, FeedbackConfig, FitrecConfig, FitrecError};
use std::path::PathBuf;

/// Handle init-config command
pub async fn handle(
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let path = config_path(data_dir.as_deref(), config.as_deref());
    if path.exists() && !force {
        return Err(FitrecError::Other(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let data_dir = data_dir.unwrap_or_else(get_default_data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut config = FitrecConfig::with_data_dir(data_dir);
    config.feedback.user_hash_salt = FeedbackConfig::random_salt();
    config.to_file(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
