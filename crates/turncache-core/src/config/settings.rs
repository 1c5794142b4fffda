//! Process-wide cache settings
//!
//! Threshold parameters are deployment configuration, not session state, and
//! stay constant for the lifetime of a process.

use super::logging_config::LoggingConfig;
use crate::error::{CacheError, CacheResult};
use crate::recovery::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default message count at which summarization is signaled
pub const DEFAULT_MESSAGE_LIMIT: i64 = 10;

/// Default per-operation timeout against the cache backend
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum concurrent borrows of the backend
    pub max_connections: u32,
    /// How long an operation may wait for a free connection
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(2),
        }
    }
}

/// Durable store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurableConfig {
    /// Directory holding one sub-directory per session
    pub data_dir: PathBuf,
}

impl Default for DurableConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("turncache")
            .join("sessions");
        Self { data_dir }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Count at which `needs_summarization` becomes true; `<= 0` disables it
    pub message_limit: i64,
    /// Messages retained after a trim
    pub keep_last: i64,
    /// Timeout applied to every backend operation
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
    /// Key namespace prefix
    pub key_prefix: String,
    pub pool: PoolConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
    pub durable: DurableConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            message_limit: DEFAULT_MESSAGE_LIMIT,
            keep_last: DEFAULT_MESSAGE_LIMIT / 2,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            key_prefix: "session".to_string(),
            pool: PoolConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
            durable: DurableConfig::default(),
        }
    }
}

impl CacheSettings {
    pub fn with_message_limit(mut self, limit: i64) -> Self {
        self.message_limit = limit;
        self
    }

    pub fn with_keep_last(mut self, keep_last: i64) -> Self {
        self.keep_last = keep_last;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.durable.data_dir = dir.into();
        self
    }

    /// Reject settings the cache cannot run with.
    ///
    /// A non-positive `message_limit` is accepted: it disables summarization.
    pub fn validate(&self) -> CacheResult<()> {
        if self.operation_timeout.is_zero() {
            return Err(CacheError::config("operation_timeout must be greater than zero"));
        }
        if self.pool.max_connections == 0 {
            return Err(CacheError::config("pool.max_connections must be at least 1"));
        }
        if self.pool.acquire_timeout.is_zero() {
            return Err(CacheError::config("pool.acquire_timeout must be greater than zero"));
        }
        if self.key_prefix.is_empty() || self.key_prefix.contains(':') {
            return Err(CacheError::config(
                "key_prefix must be non-empty and must not contain ':'",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(CacheError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}
