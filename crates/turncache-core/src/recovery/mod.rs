//! Error recovery: backoff schedule and bounded retry

pub mod backoff;
pub mod retry;

pub use backoff::Backoff;
pub use retry::{RetryConfig, RetryPolicy};
