//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Log line format for the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// CLI settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Settings {
    /// Load settings from the config file, then `CHECKCTL_*` environment variables
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::load_from_env(),
        }
    }

    /// Load settings from `path` (optional) layered under the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(false))
            .add_source(config::Environment::with_prefix("CHECKCTL"))
            .build()
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("Failed to parse settings")
    }

    fn load_from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("CHECKCTL"))
            .build()
            .context("Failed to load settings from environment")?;

        settings
            .try_deserialize()
            .context("Failed to parse settings")
    }

    /// `~/.config/checkctl/config.json`
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("checkctl").join("config.json"))
    }
}
