//! Turncache command-line interface
//!
//! Drives the session cache and durable store from a terminal:
//!
//! - `turncache shell` opens an interactive shell over one process-local cache
//! - `turncache simulate` records turns and shows when summarization fires
//! - `turncache config` prints or creates settings
//! - `turncache doctor` runs health checks
//!
//! The cache lives only as long as the process; the durable store persists
//! under the configured data directory, so a new process exercises restoration.

mod args;
mod commands;
mod console;
mod logging;
mod router;
mod runtime;

use args::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    router::route(cli).await
}
