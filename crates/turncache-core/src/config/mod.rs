//! Configuration management for the session cache

mod loader;
mod logging_config;
mod settings;

pub use loader::{ENV_PREFIX, load_settings};
pub use logging_config::LoggingConfig;
pub use settings::{
    CacheSettings, DEFAULT_MESSAGE_LIMIT, DEFAULT_OPERATION_TIMEOUT, DurableConfig, PoolConfig,
};
