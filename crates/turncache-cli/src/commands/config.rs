//! Settings commands

use crate::args::OutputFormat;
use crate::console::CliConsole;
use anyhow::{Context, Result, bail};
use std::path::Path;
use turncache_core::CacheSettings;

/// Render settings in the requested format
pub fn render(settings: &CacheSettings, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(settings)?,
        OutputFormat::Toml => toml::to_string_pretty(settings)?,
    };
    Ok(rendered)
}

/// Print the effective settings (defaults, file, environment, flags)
pub fn show(settings: &CacheSettings, format: OutputFormat) -> Result<()> {
    println!("{}", render(settings, format)?);
    Ok(())
}

/// Write a settings file holding the defaults
pub async fn init(path: &Path, force: bool) -> Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Settings Initialization");

    if path.exists() && !force {
        console.info("Use --force to overwrite");
        bail!("Settings file already exists: {}", path.display());
    }

    let body = render(&CacheSettings::default(), OutputFormat::Toml)?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write settings file {}", path.display()))?;

    console.success(&format!("Created settings file: {}", path.display()));
    console.info("Edit message_limit and keep_last to tune summarization");
    Ok(())
}
