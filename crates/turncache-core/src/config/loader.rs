//! Settings loading: defaults, then an optional file, then environment
//!
//! Environment variables use the `TURNCACHE__` prefix with `__` as the
//! nesting separator, e.g. `TURNCACHE__POOL__MAX_CONNECTIONS=20`.

use super::settings::CacheSettings;
use crate::error::{CacheError, CacheResult};
use config::{Config, Environment, File};
use std::path::Path;
use tracing::debug;

/// Environment prefix for settings overrides
pub const ENV_PREFIX: &str = "TURNCACHE";

/// Load settings from an optional file plus the process environment.
///
/// A `.env` file in the working directory is read first if present.
pub fn load_settings(path: Option<&Path>) -> CacheResult<CacheSettings> {
    let _ = dotenv::dotenv();
    load_settings_with_env(path, environment_source())
}

fn environment_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

pub(crate) fn load_settings_with_env(
    path: Option<&Path>,
    env: Environment,
) -> CacheResult<CacheSettings> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(CacheError::config(format!(
                "Settings file not found: {}",
                path.display()
            )));
        }
        debug!(path = %path.display(), "Loading settings file");
        builder = builder.add_source(File::from(path));
    }

    let settings: CacheSettings = builder.add_source(env).build()?.try_deserialize()?;
    settings.validate()?;

    debug!(
        message_limit = settings.message_limit,
        keep_last = settings.keep_last,
        timeout = ?settings.operation_timeout,
        "Settings loaded"
    );
    Ok(settings)
}
