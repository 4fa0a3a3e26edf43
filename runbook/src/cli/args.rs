//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Runbook console - list, view, validate and execute runbooks
#[derive(Parser, Debug)]
#[command(name = "runbook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API root URL
    #[arg(long, global = true, env = "RUNBOOK_API_URL")]
    pub api_url: Option<String>,

    /// Development login URL (not behind the API root)
    #[arg(long, global = true, env = "RUNBOOK_DEV_LOGIN_URL")]
    pub dev_login_url: Option<String>,

    /// Directory holding the session and config.toml (default: ~/.stage0-runbook)
    #[arg(long, global = true, env = "RUNBOOK_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in through the development login endpoint
    Login {
        /// Subject to sign in as
        #[arg(long)]
        subject: Option<String>,

        /// Role to request (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Path to continue to after signing in (e.g. /runbook/deploy.md)
        #[arg(long)]
        redirect: Option<String>,

        /// Sign out first, even if a valid session exists
        #[arg(long)]
        force: bool,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the current session
    Status,

    /// List runbooks
    List,

    /// Show a runbook's content
    Show {
        /// Runbook file name
        filename: String,
    },

    /// Show required, available and missing environment variables
    Env {
        /// Runbook file name
        filename: String,
    },

    /// Validate a runbook without running it
    Validate {
        /// Runbook file name
        filename: String,

        /// Environment override as KEY=VALUE (repeatable)
        #[arg(short = 'e', long = "env", value_parser = parse_env_var)]
        env: Vec<(String, String)>,
    },

    /// Execute a runbook
    Execute {
        /// Runbook file name
        filename: String,

        /// Environment override as KEY=VALUE (repeatable)
        #[arg(short = 'e', long = "env", value_parser = parse_env_var)]
        env: Vec<(String, String)>,
    },

    /// Open a view by path, e.g. /runbooks or /runbook/deploy.md
    Open {
        /// View path
        path: String,
    },
}

/// Parse a `KEY=VALUE` pair. The value may be empty or contain `=`.
fn parse_env_var(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
