//! Configuration loading from TOML.
//!
//! Each device has one TOML file; the embedding decides where those live.
//! By convention they sit under the user's config directory in a `sunshade/`
//! folder, one file per `unique_id`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{Config, validation};

/// Conventional configuration directory (`~/.config/sunshade`).
pub fn default_config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not determine config directory")?;
    Ok(base.join("sunshade"))
}

/// Load and validate a device configuration from a TOML file.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    load_from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
}

/// Parse and validate a device configuration from TOML text.
pub fn load_from_str(raw: &str) -> Result<Config> {
    let config: Config = toml::from_str(raw).context("failed to parse TOML")?;
    validation::validate_config(&config)?;
    Ok(config)
}
