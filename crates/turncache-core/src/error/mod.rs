//! Error types for the session cache
//!
//! Storage-layer faults propagate unchanged to the orchestration layer. The
//! variants separate transient backend trouble (`StorageUnavailable`) from
//! startup-ordering bugs (`NotInitialized`) so callers can pick a retry
//! policy without string matching.

mod constructors;
mod types;

pub use types::{CacheError, CacheResult, ResultExt};
