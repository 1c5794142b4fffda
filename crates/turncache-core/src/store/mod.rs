//! Session-scoped storage primitives
//!
//! [`CacheStore`] owns the key layout and message encoding. Trims are gated
//! by [`crate::policy::trim_eligible`]; summarization thresholds stay with
//! the callers that hold a [`crate::policy::CachePolicy`].

mod codec;

#[cfg(test)]
mod tests;

use crate::backend::{CacheKeys, ListTrim};
use crate::error::{CacheResult, ResultExt};
use crate::policy::trim_eligible;
use crate::pool::CachePool;
use crate::types::{CachedMessage, SessionId};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Outcome of [`CacheStore::trim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimReport {
    pub trimmed: bool,
    /// Length of the list after the trim ran
    pub count: usize,
}

impl From<ListTrim> for TrimReport {
    fn from(trim: ListTrim) -> Self {
        Self {
            trimmed: trim.trimmed(),
            count: trim.remaining,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    pool: Arc<CachePool>,
    keys: CacheKeys,
}

impl CacheStore {
    pub fn new(pool: Arc<CachePool>, keys: CacheKeys) -> Self {
        Self { pool, keys }
    }

    pub fn pool(&self) -> &Arc<CachePool> {
        &self.pool
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    /// Append to the tail of the session's list and return the new length
    /// as reported by the same backend call.
    #[instrument(skip(self, message), fields(session = %session))]
    pub async fn append(&self, session: &SessionId, message: &CachedMessage) -> CacheResult<usize> {
        let key = self.keys.messages(session);
        let encoded = codec::encode(message)?;

        let count = self
            .pool
            .run("append", |b| async move { b.rpush(&key, encoded).await })
            .await
            .context(format!("append to {session}"))?;

        debug!(count, role = %message.role, "Message appended");
        Ok(count)
    }

    /// Read messages oldest-first.
    ///
    /// With `Some(n)` for `n > 0` only the newest `n` are returned;
    /// `None` or `Some(0)` returns the whole list.
    pub async fn read(
        &self,
        session: &SessionId,
        limit: Option<usize>,
    ) -> CacheResult<Vec<CachedMessage>> {
        let key = self.keys.messages(session);
        let start = match limit {
            Some(n) if n > 0 => -(n.min(isize::MAX as usize) as isize),
            _ => 0,
        };

        let raw = {
            let key = key.clone();
            self.pool
                .run("read", |b| async move { b.lrange(&key, start, -1).await })
                .await
                .context(format!("read {session}"))?
        };

        Ok(codec::decode_all(&key, raw))
    }

    /// Live list length from the backend; zero for unknown sessions
    pub async fn count(&self, session: &SessionId) -> CacheResult<usize> {
        let key = self.keys.messages(session);
        self.pool
            .run("count", |b| async move { b.llen(&key).await })
            .await
            .context(format!("count {session}"))
    }

    /// Keep only the newest `keep_last` messages.
    ///
    /// Sessions that are not [`trim_eligible`] (non-positive `keep_last`, or
    /// no more than `keep_last` messages) are left alone and report their
    /// current count. Eligible trims run as one atomic backend operation, so
    /// appends racing the check are never lost.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn trim(&self, session: &SessionId, keep_last: i64) -> CacheResult<TrimReport> {
        let count = self.count(session).await?;
        if !trim_eligible(count, keep_last) {
            debug!(keep_last, count, "Nothing to trim");
            return Ok(TrimReport {
                trimmed: false,
                count,
            });
        }

        let key = self.keys.messages(session);
        let keep = usize::try_from(keep_last).unwrap_or(usize::MAX);
        let trim = self
            .pool
            .run("trim", |b| async move { b.trim_keep_last(&key, keep).await })
            .await
            .context(format!("trim {session}"))?;

        Ok(trim.into())
    }

    pub async fn get_summary(&self, session: &SessionId) -> CacheResult<Option<String>> {
        let key = self.keys.summary(session);
        self.pool
            .run("get_summary", |b| async move { b.get(&key).await })
            .await
            .context(format!("get summary {session}"))
    }

    /// Overwrite the session summary
    pub async fn set_summary(&self, session: &SessionId, text: &str) -> CacheResult<()> {
        let key = self.keys.summary(session);
        let value = text.to_string();
        self.pool
            .run("set_summary", |b| async move { b.set(&key, value).await })
            .await
            .context(format!("set summary {session}"))
    }

    /// Remove the message list and summary in one backend call
    #[instrument(skip(self), fields(session = %session))]
    pub async fn clear(&self, session: &SessionId) -> CacheResult<()> {
        let keys = self.keys.all(session).to_vec();
        let removed = self
            .pool
            .run("clear", |b| async move { b.del(&keys).await })
            .await
            .context(format!("clear {session}"))?;

        debug!(removed, "Session cleared");
        Ok(())
    }

    /// True when the cache holds messages or a summary for the session
    pub async fn exists(&self, session: &SessionId) -> CacheResult<bool> {
        let keys = self.keys.all(session).to_vec();
        let found = self
            .pool
            .run("exists", |b| async move { b.exists(&keys).await })
            .await
            .context(format!("exists {session}"))?;
        Ok(found > 0)
    }
}
