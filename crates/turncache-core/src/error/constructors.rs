//! Constructor methods for CacheError

use super::types::CacheError;

impl CacheError {
    /// Create a storage-unavailable error
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            context: None,
        }
    }

    /// Create a storage-unavailable error with context
    pub fn storage_unavailable_with_context(
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a not-initialized error for the named component
    pub fn not_initialized(component: impl Into<String>) -> Self {
        Self::NotInitialized {
            component: component.into(),
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a durable store error
    pub fn durable(message: impl Into<String>) -> Self {
        Self::Durable {
            message: message.into(),
            context: None,
        }
    }

    /// Create a durable store error with context
    pub fn durable_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Durable {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a summarization error
    pub fn summarization(message: impl Into<String>) -> Self {
        Self::Summarization {
            message: message.into(),
        }
    }
}
