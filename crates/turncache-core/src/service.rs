//! Session cache interface exposed to the orchestration layer

use crate::backend::CacheKeys;
use crate::config::CacheSettings;
use crate::coordinator::{SignalSource, SummarizationCoordinator, SummarizationSignal};
use crate::error::CacheResult;
use crate::guard::ConsistencyGuard;
use crate::policy::CachePolicy;
use crate::pool::{CachePool, PoolHealth};
use crate::store::CacheStore;
use crate::types::{CachedMessage, SessionId};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of adding a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddMessageOutcome {
    pub count: usize,
    /// Set on the append that reached the message limit
    pub needs_summarization: bool,
    /// Set on re-armed counts above the limit, for sessions whose
    /// summarization did not complete
    pub summarization_overdue: bool,
}

/// Result of trimming a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrimOutcome {
    pub trimmed: bool,
    pub count: usize,
    /// Recomputed from the post-trim count
    pub needs_summarization: bool,
}

#[derive(Debug)]
pub struct SessionCacheService {
    store: Arc<CacheStore>,
    policy: CachePolicy,
    guard: ConsistencyGuard,
    coordinator: SummarizationCoordinator,
}

impl SessionCacheService {
    pub fn new(pool: Arc<CachePool>, settings: &CacheSettings) -> Self {
        let policy = CachePolicy::from_settings(settings);
        if policy.trim_recrosses_threshold() {
            warn!(
                message_limit = policy.message_limit(),
                keep_last = policy.keep_last(),
                "keep_last is not below message_limit; trims will keep signaling summarization"
            );
        }

        let guard = ConsistencyGuard::new(policy, pool.serializes_per_key());
        let store = Arc::new(CacheStore::new(pool, CacheKeys::new(&settings.key_prefix)));
        let coordinator = SummarizationCoordinator::new(store.clone());

        Self {
            store,
            policy,
            guard,
            coordinator,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &SummarizationCoordinator {
        &self.coordinator
    }

    pub async fn add_message(
        &self,
        session: &SessionId,
        message: &CachedMessage,
    ) -> CacheResult<AddMessageOutcome> {
        let _lock = self.guard.exclusive(session).await;
        let count = self.store.append(session, message).await?;
        let needs_summarization = self.guard.signal_for_append(count);
        let summarization_overdue = self.guard.overdue_for_append(count);

        Ok(AddMessageOutcome {
            count,
            needs_summarization,
            summarization_overdue,
        })
    }

    /// Signal for an add outcome, for callers that dispatch summarization
    pub fn append_signal(
        &self,
        session: &SessionId,
        outcome: &AddMessageOutcome,
    ) -> Option<SummarizationSignal> {
        let (raised, source) = if outcome.summarization_overdue {
            (true, SignalSource::Overdue)
        } else {
            (outcome.needs_summarization, SignalSource::Append)
        };
        self.coordinator.signal(session, outcome.count, raised, source)
    }

    /// Signal for a trim outcome
    pub fn trim_signal(&self, session: &SessionId, outcome: &TrimOutcome) -> Option<SummarizationSignal> {
        self.coordinator.signal(
            session,
            outcome.count,
            outcome.needs_summarization,
            SignalSource::Trim,
        )
    }

    pub async fn get_messages(
        &self,
        session: &SessionId,
        limit: Option<usize>,
    ) -> CacheResult<Vec<CachedMessage>> {
        self.store.read(session, limit).await
    }

    pub async fn get_count(&self, session: &SessionId) -> CacheResult<usize> {
        self.store.count(session).await
    }

    /// Trim to `keep_last`, or to the configured value when `None`
    pub async fn trim(&self, session: &SessionId, keep_last: Option<i64>) -> CacheResult<TrimOutcome> {
        let keep_last = keep_last.unwrap_or(self.policy.keep_last());
        let _lock = self.guard.exclusive(session).await;
        let report = self.store.trim(session, keep_last).await?;
        let needs_summarization = self.guard.signal_for_trim(&report);

        debug!(
            session = %session,
            keep_last,
            trimmed = report.trimmed,
            count = report.count,
            "Trim finished"
        );
        Ok(TrimOutcome {
            trimmed: report.trimmed,
            count: report.count,
            needs_summarization,
        })
    }

    pub async fn set_summary(&self, session: &SessionId, text: &str) -> CacheResult<()> {
        self.coordinator.store(session, text).await
    }

    pub async fn get_summary(&self, session: &SessionId) -> CacheResult<Option<String>> {
        self.coordinator.current(session).await
    }

    pub async fn clear_session(&self, session: &SessionId) -> CacheResult<()> {
        self.store.clear(session).await?;
        self.guard.forget(session);
        Ok(())
    }

    /// True when the cache holds messages or a summary for the session
    pub async fn session_exists(&self, session: &SessionId) -> CacheResult<bool> {
        self.store.exists(session).await
    }

    pub async fn health_check(&self) -> PoolHealth {
        self.store.pool().health().await
    }
}
