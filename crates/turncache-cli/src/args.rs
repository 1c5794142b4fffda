//! CLI argument definitions using clap
//!
//! - turncache shell              # Interactive cache shell
//! - turncache simulate           # Drive turns through the orchestrator
//! - turncache config show/init   # Inspect or create settings
//! - turncache doctor             # Health checks

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "turncache")]
#[command(about = "Turncache - write-through session message cache with summarization")]
#[command(version)]
pub struct Cli {
    /// Path to a settings file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "TURNCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory of the file-backed durable store
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose output (debug logging)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive shell over the cache and durable store
    Shell,

    /// Run user/assistant turns through the orchestrator and report triggers
    Simulate {
        /// Session to write to
        #[arg(long, default_value = "demo")]
        session: String,

        /// Number of user/assistant turn pairs
        #[arg(long, default_value_t = 12)]
        turns: usize,

        /// Delete the session before starting
        #[arg(long)]
        fresh: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check cache, durable store and settings health
    Doctor,
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Display effective settings
    Show {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Write a settings file with defaults
    Init {
        /// Path for the new settings file
        #[arg(long, default_value = "turncache.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Toml,
}
