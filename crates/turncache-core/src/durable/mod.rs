//! Durable store: the source of truth for every session
//!
//! The durable store keeps an unbounded append log per session and at most
//! one summary row. The cache is a lossy accelerator in front of it.

mod jsonl;
mod memory;

pub use jsonl::JsonlDurableStore;
pub use memory::MemoryDurableStore;

use crate::error::CacheResult;
use crate::types::{CachedMessage, Role, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as recorded in the durable log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableMessage {
    pub message_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl DurableMessage {
    pub(crate) fn record(message: &CachedMessage) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            role: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp.unwrap_or_else(Utc::now),
        }
    }

    pub fn to_cached(&self) -> CachedMessage {
        CachedMessage::new(self.role, self.content.clone()).with_timestamp(self.timestamp)
    }
}

/// The durable summary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableSummary {
    pub summary: String,
    pub last_updated: DateTime<Utc>,
    /// Length of the durable log when the summary was written
    pub message_count: usize,
}

/// Persistence contract for the source-of-truth store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Append a message, returning its id
    async fn append(&self, session: &SessionId, message: &CachedMessage) -> CacheResult<String>;

    /// Messages in `[from, to)` by log position, oldest first; `None` reads to the end
    async fn read_range(
        &self,
        session: &SessionId,
        from: usize,
        to: Option<usize>,
    ) -> CacheResult<Vec<DurableMessage>>;

    async fn message_count(&self, session: &SessionId) -> CacheResult<usize>;

    async fn get_summary(&self, session: &SessionId) -> CacheResult<Option<String>>;

    async fn set_summary(&self, session: &SessionId, text: &str) -> CacheResult<()>;

    /// Remove the log and summary; succeeds for unknown sessions
    async fn delete_session(&self, session: &SessionId) -> CacheResult<()>;
}

/// Clamp a half-open range to a log of `len` entries
pub(crate) fn clamp_range(len: usize, from: usize, to: Option<usize>) -> std::ops::Range<usize> {
    let end = to.unwrap_or(len).min(len);
    let start = from.min(end);
    start..end
}
