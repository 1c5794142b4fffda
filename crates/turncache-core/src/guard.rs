//! Consistency rules around concurrent appends and trims
//!
//! The summarization trigger is derived from the count returned by the
//! append itself, so at most one caller observes each threshold crossing.
//! When the backend does not serialize operations per key, the guard also
//! holds a per-session lock around the append-then-check sequence.

use crate::policy::CachePolicy;
use crate::store::TrimReport;
use crate::types::SessionId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

#[derive(Debug)]
pub struct ConsistencyGuard {
    policy: CachePolicy,
    session_locks: Option<DashMap<SessionId, Arc<Mutex<()>>>>,
}

impl ConsistencyGuard {
    /// `backend_serializes_per_key = false` enables in-process session locks
    pub fn new(policy: CachePolicy, backend_serializes_per_key: bool) -> Self {
        Self {
            policy,
            session_locks: (!backend_serializes_per_key).then(DashMap::new),
        }
    }

    pub fn uses_session_locks(&self) -> bool {
        self.session_locks.is_some()
    }

    /// Take the session lock if in-process serialization is enabled.
    ///
    /// The returned guard must be held until the append result has been
    /// evaluated.
    pub async fn exclusive(&self, session: &SessionId) -> Option<OwnedMutexGuard<()>> {
        let locks = self.session_locks.as_ref()?;
        let lock = locks
            .entry(session.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        trace!(session = %session, "Waiting for session lock");
        Some(lock.lock_owned().await)
    }

    /// Summarization trigger for the count an append returned
    pub fn signal_for_append(&self, count: usize) -> bool {
        self.policy.is_threshold_crossing(count)
    }

    /// Re-armed trigger for a session still above the limit after a missed
    /// summarization; never set on the crossing itself
    pub fn overdue_for_append(&self, count: usize) -> bool {
        self.policy.is_overdue(count)
    }

    /// Summarization state after a trim, recomputed from the post-trim count
    pub fn signal_for_trim(&self, report: &TrimReport) -> bool {
        self.policy.needs_summarization(report.count)
    }

    /// Drop the session lock entry if nobody is holding or waiting on it
    pub fn forget(&self, session: &SessionId) {
        if let Some(locks) = &self.session_locks {
            locks.remove_if(session, |_, lock| Arc::strong_count(lock) == 1);
        }
    }

    pub fn tracked_sessions(&self) -> usize {
        self.session_locks.as_ref().map(|locks| locks.len()).unwrap_or(0)
    }
}
