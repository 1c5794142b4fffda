//! Restoring cache state from the durable store after a cache miss
//!
//! Only the summary is restored. The message list repopulates from new
//! traffic; replaying the durable log would defeat the cache's bound.

use crate::durable::DurableStore;
use crate::error::CacheResult;
use crate::service::SessionCacheService;
use crate::types::SessionId;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Cache state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// At least one message or a summary is cached
    CachePresent,
    /// Neither messages nor a summary are cached
    CacheEmpty,
}

/// What a reconcile pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreOutcome {
    /// Cache already had state; nothing was read from the durable store
    AlreadyPresent,
    /// The durable summary was written into the cache
    SummaryRestored { durable_messages: usize },
    /// The session exists durably but has no summary yet
    NoSummary { durable_messages: usize },
    /// The durable store has never seen this session
    UnknownSession,
}

impl RestoreOutcome {
    pub fn restored(&self) -> bool {
        matches!(self, Self::SummaryRestored { .. })
    }
}

pub struct RestorationReconciler {
    cache: Arc<SessionCacheService>,
    durable: Arc<dyn DurableStore>,
}

impl RestorationReconciler {
    pub fn new(cache: Arc<SessionCacheService>, durable: Arc<dyn DurableStore>) -> Self {
        Self { cache, durable }
    }

    pub async fn state(&self, session: &SessionId) -> CacheResult<CacheState> {
        Ok(if self.cache.session_exists(session).await? {
            CacheState::CachePresent
        } else {
            CacheState::CacheEmpty
        })
    }

    /// Move an empty cache entry to `CachePresent` when the durable store
    /// holds a summary for the session.
    ///
    /// Safe to run concurrently: every writer stores the same durable value.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn reconcile(&self, session: &SessionId) -> CacheResult<RestoreOutcome> {
        if self.state(session).await? == CacheState::CachePresent {
            return Ok(RestoreOutcome::AlreadyPresent);
        }

        let durable_messages = self.durable.message_count(session).await?;
        if durable_messages == 0 {
            debug!("Session unknown to durable store");
            return Ok(RestoreOutcome::UnknownSession);
        }

        match self.durable.get_summary(session).await? {
            Some(summary) => {
                self.cache.set_summary(session, &summary).await?;
                info!(durable_messages, "Restored session summary from durable store");
                Ok(RestoreOutcome::SummaryRestored { durable_messages })
            }
            None => {
                debug!(durable_messages, "Durable session has no summary to restore");
                Ok(RestoreOutcome::NoSummary { durable_messages })
            }
        }
    }
}
