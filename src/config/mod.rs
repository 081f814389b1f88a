// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON), overlaid with
/// `GOSS__<SECTION>__<KEY>` environment variables.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let config: Config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("GOSS").separator("__"))
        .build()
        .with_context(|| format!("Failed to read config file {}", path.display()))?
        .try_deserialize()
        .context("Failed to parse config")?;

    config.validate()?;
    Ok(config)
}
