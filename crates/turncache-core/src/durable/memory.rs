//! In-memory durable store for tests and single-process demos

use super::{DurableMessage, DurableStore, DurableSummary, clamp_range};
use crate::error::{CacheError, CacheResult};
use crate::types::{CachedMessage, SessionId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct SessionLog {
    messages: Vec<DurableMessage>,
    summary: Option<DurableSummary>,
}

#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    sessions: RwLock<HashMap<SessionId, SessionLog>>,
    unavailable: AtomicBool,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while unavailable every call fails
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub async fn summary_record(&self, session: &SessionId) -> Option<DurableSummary> {
        self.sessions
            .read()
            .await
            .get(session)
            .and_then(|log| log.summary.clone())
    }

    fn check(&self, op: &str) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::durable_with_context(
                "durable store unreachable",
                op.to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn append(&self, session: &SessionId, message: &CachedMessage) -> CacheResult<String> {
        self.check("append")?;
        let record = DurableMessage::record(message);
        let id = record.message_id.clone();
        self.sessions
            .write()
            .await
            .entry(session.clone())
            .or_default()
            .messages
            .push(record);
        Ok(id)
    }

    async fn read_range(
        &self,
        session: &SessionId,
        from: usize,
        to: Option<usize>,
    ) -> CacheResult<Vec<DurableMessage>> {
        self.check("read_range")?;
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session)
            .map(|log| log.messages[clamp_range(log.messages.len(), from, to)].to_vec())
            .unwrap_or_default())
    }

    async fn message_count(&self, session: &SessionId) -> CacheResult<usize> {
        self.check("message_count")?;
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session).map(|log| log.messages.len()).unwrap_or(0))
    }

    async fn get_summary(&self, session: &SessionId) -> CacheResult<Option<String>> {
        self.check("get_summary")?;
        Ok(self.summary_record(session).await.map(|row| row.summary))
    }

    async fn set_summary(&self, session: &SessionId, text: &str) -> CacheResult<()> {
        self.check("set_summary")?;
        let mut sessions = self.sessions.write().await;
        let log = sessions.entry(session.clone()).or_default();
        log.summary = Some(DurableSummary {
            summary: text.to_string(),
            last_updated: Utc::now(),
            message_count: log.messages.len(),
        });
        Ok(())
    }

    async fn delete_session(&self, session: &SessionId) -> CacheResult<()> {
        self.check("delete_session")?;
        self.sessions.write().await.remove(session);
        Ok(())
    }
}
