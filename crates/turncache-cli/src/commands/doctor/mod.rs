//! Health checks for settings, storage and the cache pool

mod checks;
mod types;

use types::{CheckResult, CheckStatus};

use crate::console::CliConsole;
use crate::runtime::Runtime;
use anyhow::Result;
use colored::*;
use turncache_core::CacheSettings;

/// Run all checks and print a report. Never fails on a failed check.
pub async fn doctor(settings: Result<CacheSettings>, verbose: bool) -> Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Turncache Health Check");
    println!();

    let mut results = Vec::new();
    match settings {
        Ok(settings) => {
            results.push(CheckResult::pass(
                "Settings",
                format!(
                    "Loaded (message_limit={}, keep_last={})",
                    settings.message_limit, settings.keep_last
                ),
            ));
            results.extend(checks::check_thresholds(&settings));
            results.push(checks::check_data_dir(&settings.durable.data_dir).await);

            match Runtime::start(settings).await {
                Ok(runtime) => {
                    results.push(checks::check_pool(&runtime.cache.health_check().await));
                    results.push(checks::check_durable(runtime.durable.as_ref()).await);
                    runtime.shutdown().await;
                }
                Err(e) => results.push(
                    CheckResult::fail("Cache Pool", format!("Startup failed: {e:#}"))
                        .with_hint("Run with -v for details"),
                ),
            }
        }
        Err(e) => results.push(
            CheckResult::fail("Settings", format!("{e:#}"))
                .with_hint("Run 'turncache config init' to create a settings file"),
        ),
    }

    let mut pass_count = 0;
    let mut warn_count = 0;
    let mut fail_count = 0;
    for check in &results {
        println!("{} {} - {}", check.icon(), check.name.bold(), check.message);
        if let Some(hint) = &check.hint {
            println!("    {} {}", "→".dimmed(), hint.dimmed());
        }
        match check.status {
            CheckStatus::Pass => pass_count += 1,
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
        }
    }

    println!();
    console.print_separator();
    println!(
        "Summary: {} passed, {} warnings, {} failed",
        pass_count.to_string().green(),
        warn_count.to_string().yellow(),
        fail_count.to_string().red()
    );
    println!();
    if fail_count > 0 {
        console.error("Some checks failed. Please fix the issues above.");
    } else if warn_count > 0 {
        console.warn("Some checks have warnings. Consider addressing them.");
    } else {
        console.success("All checks passed.");
    }
    if verbose {
        CliConsole::new(verbose).info("Set RUST_LOG=turncache_core=trace for backend traces");
    }
    Ok(())
}
