//! Configuration loading for the CLI
//!
//! Layers, lowest precedence first: built-in defaults, the TOML file
//! (`--config`, else `~/.config/crunch/config.toml`), then `CRUNCH__*`
//! environment variables such as `CRUNCH__TRAINER__MAX_ITERATIONS=200`.

use anyhow::{Context, Result};
use crunch_lib::ScorerConfig;
use std::path::{Path, PathBuf};

/// Load the scorer configuration
pub fn load(explicit: Option<&Path>) -> Result<ScorerConfig> {
    let mut builder = config::Config::builder();

    match explicit {
        Some(path) => {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }
        None => {
            if let Some(path) = default_config_path() {
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("CRUNCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("debug_studios"),
        )
        .build()
        .context("Failed to load configuration")?;

    settings
        .try_deserialize()
        .context("Invalid configuration")
}

/// `~/.config/crunch/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("crunch").join("config.toml"))
}
