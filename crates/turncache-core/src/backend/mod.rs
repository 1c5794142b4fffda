//! Key-value backend abstraction for the session cache
//!
//! The backend models the small subset of Redis-like operations the cache
//! needs: list append/range/length/trim, string get/set, delete and exists.
//! Implementations must make each single-key operation atomic.

mod keys;
mod memory;

pub use keys::CacheKeys;
pub use memory::MemoryBackend;

use crate::error::CacheResult;
use async_trait::async_trait;
use std::fmt;

/// Result of an atomic keep-last trim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTrim {
    /// Elements removed from the head of the list
    pub removed: usize,
    /// Elements left in the list
    pub remaining: usize,
}

impl ListTrim {
    pub fn trimmed(&self) -> bool {
        self.removed > 0
    }
}

/// Storage operations the cache store is built on
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Short backend name for logs and health output
    fn name(&self) -> &str;

    /// Whether the backend already serializes concurrent operations on one key.
    ///
    /// When false, callers add their own per-session mutual exclusion around
    /// append-then-check sequences.
    fn serializes_per_key(&self) -> bool {
        true
    }

    /// Liveness probe
    async fn ping(&self) -> CacheResult<()>;

    /// Append to the tail of a list, returning the new length
    async fn rpush(&self, key: &str, value: String) -> CacheResult<usize>;

    /// Inclusive range with Redis index semantics (negative counts from the end)
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> CacheResult<Vec<String>>;

    /// List length; zero for a missing key
    async fn llen(&self, key: &str) -> CacheResult<usize>;

    /// Keep only the last `keep_last` elements if the list is longer.
    ///
    /// The length check and the trim happen as one atomic step.
    async fn trim_keep_last(&self, key: &str, keep_last: usize) -> CacheResult<ListTrim>;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> CacheResult<()>;

    /// Delete keys, returning how many existed
    async fn del(&self, keys: &[String]) -> CacheResult<usize>;

    /// Count how many of `keys` exist
    async fn exists(&self, keys: &[String]) -> CacheResult<usize>;

    /// Release backend resources; later calls may fail
    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Resolve an inclusive Redis-style range against a list of length `len`.
///
/// Returns the half-open `[start, end)` slice bounds, or `None` when the
/// range selects nothing.
pub(crate) fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len_i = len as isize;
    let normalize = |idx: isize| if idx < 0 { len_i + idx } else { idx };

    let start = normalize(start).max(0);
    let stop = normalize(stop).min(len_i - 1);

    if start > stop || start >= len_i {
        return None;
    }
    Some((start as usize, stop as usize + 1))
}
