// Configuration loader
// Loads settings from ~/.config/toolgate/config.toml or an explicit path

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::settings::Config;

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("toolgate").join("config.toml"))
}

/// Load configuration
///
/// An explicit path must exist. Without one, the default location is tried and
/// a missing file falls back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file not found: {}", path.display());
            }
            load_from_file(path)
        }
        None => match default_config_path() {
            Some(path) if path.exists() => load_from_file(&path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Config::default())
            }
        },
    }
}

fn load_from_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration {}", path.display()))?;

    debug!(
        "Loaded configuration from {} ({} path rules, {} command rules)",
        path.display(),
        config.auto_allowed_paths.len(),
        config.auto_execute_commands.len()
    );
    Ok(config)
}
