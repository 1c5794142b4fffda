//! Core error type for cache operations

use thiserror::Error;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Generic message shown to end users. Internal detail never crosses the
/// system boundary.
const USER_RETRYABLE_MESSAGE: &str =
    "The conversation service is temporarily unavailable. Please try again.";
const USER_FATAL_MESSAGE: &str = "The request could not be completed.";

/// Main error type for the session cache
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Backing cache store unreachable or timed out
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
        context: Option<String>,
    },

    /// Operation attempted before the connection pool was established
    #[error("Not initialized: {component}")]
    NotInitialized { component: String },

    /// Caller passed an argument the operation cannot act on
    #[error("Invalid argument: {field}: {message}")]
    InvalidArgument { field: String, message: String },

    /// Durable store failure
    #[error("Durable store error: {message}")]
    Durable {
        message: String,
        context: Option<String>,
    },

    /// Encoding or decoding of a stored record failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// External summarization step failed
    #[error("Summarization error: {message}")]
    Summarization { message: String },
}

impl CacheError {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::StorageUnavailable { .. } => "CACHE_STORAGE_UNAVAILABLE",
            Self::NotInitialized { .. } => "CACHE_NOT_INITIALIZED",
            Self::InvalidArgument { .. } => "CACHE_INVALID_ARGUMENT",
            Self::Durable { .. } => "CACHE_DURABLE_ERROR",
            Self::Serialization { .. } => "CACHE_SERIALIZATION_ERROR",
            Self::Config { .. } => "CACHE_CONFIG_ERROR",
            Self::Summarization { .. } => "CACHE_SUMMARIZATION_ERROR",
        }
    }

    /// Whether a bounded retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. } | Self::Durable { .. })
    }

    /// Message safe to show an end user
    pub fn user_message(&self) -> &'static str {
        if self.is_retryable() || matches!(self, Self::NotInitialized { .. }) {
            USER_RETRYABLE_MESSAGE
        } else {
            USER_FATAL_MESSAGE
        }
    }

    /// Attached context, if any
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::StorageUnavailable { context, .. } | Self::Durable { context, .. } => {
                context.as_deref()
            }
            _ => None,
        }
    }
}

/// Extension trait for attaching context to storage results
pub trait ResultExt<T> {
    /// Attach context to a `StorageUnavailable` or `Durable` error
    fn context<C: std::fmt::Display>(self, context: C) -> CacheResult<T>;
}

impl<T> ResultExt<T> for CacheResult<T> {
    fn context<C: std::fmt::Display>(self, ctx: C) -> CacheResult<T> {
        self.map_err(|e| match e {
            CacheError::StorageUnavailable { message, .. } => CacheError::StorageUnavailable {
                message,
                context: Some(ctx.to_string()),
            },
            CacheError::Durable { message, .. } => CacheError::Durable {
                message,
                context: Some(ctx.to_string()),
            },
            other => other,
        })
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<config::ConfigError> for CacheError {
    fn from(err: config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}
