//! Command routing logic for CLI

use crate::args::{Cli, Commands, ConfigAction};
use crate::console::CliConsole;
use crate::logging::init_logging;
use crate::runtime::{Runtime, resolve_settings};
use crate::commands;
use anyhow::Result;
use turncache_core::LoggingConfig;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> Result<()> {
    // `config init` must work even when the current settings do not load
    if let Commands::Config {
        action: ConfigAction::Init { path, force },
    } = &cli.command
    {
        init_logging(&LoggingConfig::default(), cli.verbose)?;
        return commands::config::init(path, *force).await;
    }

    let settings = match resolve_settings(cli.config.as_deref(), cli.data_dir.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Doctor reports bad settings instead of bailing out
            if matches!(cli.command, Commands::Doctor) {
                init_logging(&LoggingConfig::default(), cli.verbose)?;
                return commands::doctor::doctor(Err(e), cli.verbose).await;
            }
            return Err(e);
        }
    };
    init_logging(&settings.logging, cli.verbose)?;

    match cli.command {
        Commands::Config {
            action: ConfigAction::Show { format },
        } => commands::config::show(&settings, format),
        Commands::Config { .. } => Ok(()),
        Commands::Doctor => commands::doctor::doctor(Ok(settings), cli.verbose).await,
        Commands::Shell => {
            let runtime = Runtime::start(settings).await?;
            let result = commands::shell::run(&runtime, cli.verbose).await;
            runtime.shutdown().await;
            result
        }
        Commands::Simulate {
            session,
            turns,
            fresh,
        } => {
            let runtime = Runtime::start(settings).await?;
            let result = commands::simulate::run(&runtime, &session, turns, fresh).await;
            if let Err(e) = &result {
                CliConsole::new(cli.verbose).error(&format!("Simulation failed: {e}"));
            }
            runtime.shutdown().await;
            result
        }
    }
}
