//! Client configuration.
//!
//! Values come from command-line flags or their environment variables, then
//! from `config.toml` in the state directory, then from built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Cli;

pub const DEFAULT_API_URL: &str = "http://localhost:8083/api";
pub const DEFAULT_DEV_LOGIN_URL: &str = "http://localhost:8083/dev-login";

const STATE_DIR: &str = ".stage0-runbook";
const CONFIG_FILE: &str = "config.toml";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// API root every authenticated endpoint is relative to.
    pub api_url: String,
    /// Development login endpoint. Not under the API root.
    pub dev_login_url: String,
    /// Directory holding the persisted session and `config.toml`.
    pub state_dir: PathBuf,
}

/// Optional settings read from `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_url: Option<String>,
    dev_login_url: Option<String>,
}

impl Config {
    /// Resolve the configuration for a parsed command line.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let state_dir = match &cli.state_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir()?,
        };
        let file = load_file_config(&state_dir.join(CONFIG_FILE))?;

        Ok(Self {
            api_url: cli
                .api_url
                .clone()
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            dev_login_url: cli
                .dev_login_url
                .clone()
                .or(file.dev_login_url)
                .unwrap_or_else(|| DEFAULT_DEV_LOGIN_URL.to_string()),
            state_dir,
        })
    }
}

fn default_state_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(STATE_DIR))
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}
