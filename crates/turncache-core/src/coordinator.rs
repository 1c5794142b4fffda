//! Summarization signals and the summary write path
//!
//! The coordinator does not decide whether to summarize. It turns policy
//! results into signals for the orchestration layer and is the single place
//! a finished summary is written into the cache summary slot.

use crate::error::CacheResult;
use crate::store::CacheStore;
use crate::types::SessionId;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Why a summarization signal was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// An append reached the message limit
    Append,
    /// A trim left the session at or above the message limit
    Trim,
    /// An append found the session still above the limit, unsummarized
    Overdue,
}

/// A request to the orchestration layer to summarize a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummarizationSignal {
    pub session_id: SessionId,
    pub count: usize,
    pub source: SignalSource,
}

#[derive(Debug, Clone)]
pub struct SummarizationCoordinator {
    store: Arc<CacheStore>,
}

impl SummarizationCoordinator {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Build a signal when `needs_summarization` is set
    pub fn signal(
        &self,
        session: &SessionId,
        count: usize,
        needs_summarization: bool,
        source: SignalSource,
    ) -> Option<SummarizationSignal> {
        needs_summarization.then(|| {
            info!(session = %session, count, ?source, "Summarization signaled");
            SummarizationSignal {
                session_id: session.clone(),
                count,
                source,
            }
        })
    }

    /// Record a finished summary, overwriting any previous value
    pub async fn store(&self, session: &SessionId, summary: &str) -> CacheResult<()> {
        self.store.set_summary(session, summary).await?;
        info!(session = %session, chars = summary.chars().count(), "Summary stored");
        Ok(())
    }

    pub async fn current(&self, session: &SessionId) -> CacheResult<Option<String>> {
        self.store.get_summary(session).await
    }
}
