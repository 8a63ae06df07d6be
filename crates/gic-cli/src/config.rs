//! Loading of the analysis configuration file.

use anyhow::{Context, Result};
use gic_algo::GicConfig;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read `path` as TOML, or fall back to defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<GicConfig> {
    let Some(path) = path else {
        return Ok(GicConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config '{}'", path.display()))?;
    let config: GicConfig =
        toml::from_str(&text).with_context(|| format!("parsing config '{}'", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config '{}'", path.display()))?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}
