//! Conversation orchestration over the durable store and the session cache
//!
//! Writes go to the durable store first, then to the cache. Reads come from
//! the cache, restore the summary on a miss, and fall back to the durable
//! store when the cache cannot be reached.

mod context;
mod summarizer;


pub use context::{ContextSource, ConversationContext};
pub use summarizer::{ExtractiveSummarizer, Summarizer, format_conversation};

use crate::coordinator::SummarizationSignal;
use crate::durable::{DurableMessage, DurableStore};
use crate::error::{CacheError, CacheResult};
use crate::recovery::{RetryConfig, RetryPolicy};
use crate::restore::{RestorationReconciler, RestoreOutcome};
use crate::service::{AddMessageOutcome, SessionCacheService};
use crate::types::{CachedMessage, SessionId};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// What happened to the summarization step of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummarizationStatus {
    NotNeeded,
    Completed {
        /// Messages fed to the summarizer
        summarized: usize,
        /// Messages left in the cache after the trim
        retained: usize,
        summary_chars: usize,
        /// Post-trim count is still at or above the limit
        still_needed: bool,
    },
    /// Summarization failed; existing cache and durable state were kept
    Failed { error: String },
}

/// Result of recording one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReceipt {
    pub message_id: String,
    /// `None` when the cache write failed and the session cache was invalidated
    pub cache: Option<AddMessageOutcome>,
    pub summarization: SummarizationStatus,
}

/// `keep_last` plus every message appended after a snapshot of
/// `snapshot_len` messages was taken
fn retained_after_summary(keep_last: i64, snapshot_len: usize, current: usize) -> i64 {
    let appended_since = current.saturating_sub(snapshot_len);
    keep_last.saturating_add(i64::try_from(appended_since).unwrap_or(i64::MAX))
}

pub struct ConversationOrchestrator {
    cache: Arc<SessionCacheService>,
    durable: Arc<dyn DurableStore>,
    summarizer: Arc<dyn Summarizer>,
    reconciler: RestorationReconciler,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl ConversationOrchestrator {
    pub fn new(
        cache: Arc<SessionCacheService>,
        durable: Arc<dyn DurableStore>,
        summarizer: Arc<dyn Summarizer>,
        retry: RetryConfig,
    ) -> Self {
        let reconciler = RestorationReconciler::new(cache.clone(), durable.clone());
        Self {
            cache,
            durable,
            summarizer,
            reconciler,
            retry: RetryPolicy::new(retry),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cache(&self) -> &Arc<SessionCacheService> {
        &self.cache
    }

    pub fn durable(&self) -> &Arc<dyn DurableStore> {
        &self.durable
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop waiting in retry backoffs
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Persist a turn and update the cache, summarizing when the turn reaches
    /// the message limit.
    ///
    /// Appends are never retried so a message is stored at most once.
    #[instrument(skip(self, message), fields(session = %session, role = %message.role))]
    pub async fn record_turn(
        &self,
        session: &SessionId,
        message: CachedMessage,
    ) -> CacheResult<TurnReceipt> {
        let message = message.stamped();
        let message_id = self.durable.append(session, &message).await?;

        let outcome = match self.cache.add_message(session, &message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Cache append failed after durable write, invalidating session cache");
                self.invalidate(session).await;
                return Ok(TurnReceipt {
                    message_id,
                    cache: None,
                    summarization: SummarizationStatus::NotNeeded,
                });
            }
        };

        let summarization = match self.cache.append_signal(session, &outcome) {
            Some(signal) => self.summarize(&signal).await,
            None => SummarizationStatus::NotNeeded,
        };

        Ok(TurnReceipt {
            message_id,
            cache: Some(outcome),
            summarization,
        })
    }

    /// Run the summarize, store, trim sequence for a signaled session.
    ///
    /// Failures are reported in the status; nothing is trimmed unless the
    /// new summary was stored in both stores.
    pub async fn summarize(&self, signal: &SummarizationSignal) -> SummarizationStatus {
        match self.run_summarization(&signal.session_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    session = %signal.session_id,
                    count = signal.count,
                    error = %e,
                    "Summarization failed, keeping existing cache state"
                );
                SummarizationStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn run_summarization(&self, session: &SessionId) -> CacheResult<SummarizationStatus> {
        let cancel = Some(&self.cancel);
        let messages = self
            .retry
            .execute(
                "cache.get_messages",
                move || self.cache.get_messages(session, None),
                cancel,
            )
            .await?;
        let previous = self
            .retry
            .execute("cache.get_summary", move || self.cache.get_summary(session), cancel)
            .await?;

        let summary = self
            .summarizer
            .summarize(previous.as_deref(), &messages)
            .await
            .map_err(|e| {
                if matches!(e, CacheError::Summarization { .. }) {
                    e
                } else {
                    CacheError::summarization(e.to_string())
                }
            })?;

        let text = summary.as_str();
        self.retry
            .execute(
                "durable.set_summary",
                move || self.durable.set_summary(session, text),
                cancel,
            )
            .await?;
        self.retry
            .execute("cache.set_summary", move || self.cache.set_summary(session, text), cancel)
            .await?;

        // Only messages in the summarized snapshot may be dropped; anything
        // appended while the summarizer ran is kept on top of keep_last.
        let keep_last = self.cache.policy().keep_last();
        let keep = if keep_last > 0 {
            let current = self
                .retry
                .execute("cache.get_count", move || self.cache.get_count(session), cancel)
                .await?;
            Some(retained_after_summary(keep_last, messages.len(), current))
        } else {
            None
        };

        // Keep-last trims are idempotent, so retrying is safe.
        let trim = self
            .retry
            .execute("cache.trim", move || self.cache.trim(session, keep), cancel)
            .await?;
        if let Some(signal) = self.cache.trim_signal(session, &trim) {
            warn!(
                session = %session,
                count = signal.count,
                "Session still at or above the message limit after trim"
            );
        }

        info!(
            session = %session,
            summarized = messages.len(),
            retained = trim.count,
            "Session summarized"
        );
        Ok(SummarizationStatus::Completed {
            summarized: messages.len(),
            retained: trim.count,
            summary_chars: summary.chars().count(),
            still_needed: trim.needs_summarization,
        })
    }

    /// Summary and cached messages for the next model call.
    ///
    /// An empty cache triggers summary restoration. If the cache cannot be
    /// read after retries the context is rebuilt from the durable store.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn load_context(&self, session: &SessionId) -> CacheResult<ConversationContext> {
        let cached = self
            .retry
            .execute(
                "cache.load_context",
                move || self.read_cache_context(session),
                Some(&self.cancel),
            )
            .await;

        match cached {
            Ok(context) => Ok(context),
            Err(e) => {
                if matches!(e, CacheError::NotInitialized { .. }) {
                    error!(error = %e, "Cache used before initialization, serving from durable store");
                } else {
                    warn!(error = %e, "Cache read failed, serving from durable store");
                }
                self.durable_context(session).await
            }
        }
    }

    async fn read_cache_context(&self, session: &SessionId) -> CacheResult<ConversationContext> {
        let messages = self.cache.get_messages(session, None).await?;
        let summary = self.cache.get_summary(session).await?;
        if !messages.is_empty() || summary.is_some() {
            return Ok(ConversationContext::from_cache(summary, messages, None));
        }

        let outcome = self.reconciler.reconcile(session).await?;
        let summary = match outcome {
            RestoreOutcome::SummaryRestored { .. } => self.cache.get_summary(session).await?,
            _ => None,
        };
        Ok(ConversationContext::from_cache(summary, messages, Some(&outcome)))
    }

    async fn durable_context(&self, session: &SessionId) -> CacheResult<ConversationContext> {
        let cancel = Some(&self.cancel);
        let count = self
            .retry
            .execute("durable.message_count", move || self.durable.message_count(session), cancel)
            .await?;

        let window = self.cache.policy().message_limit();
        let from = if window > 0 {
            count.saturating_sub(usize::try_from(window).unwrap_or(usize::MAX))
        } else {
            0
        };

        let messages = self
            .retry
            .execute(
                "durable.read_range",
                move || self.durable.read_range(session, from, None),
                cancel,
            )
            .await?;
        let summary = self
            .retry
            .execute("durable.get_summary", move || self.durable.get_summary(session), cancel)
            .await?;

        Ok(ConversationContext {
            summary,
            messages: messages.iter().map(DurableMessage::to_cached).collect(),
            source: ContextSource::Durable,
        })
    }

    /// Full durable history of a session. Restores the cached summary as a
    /// side effect when the cache is empty.
    pub async fn history(&self, session: &SessionId) -> CacheResult<Vec<DurableMessage>> {
        let messages = self
            .retry
            .execute(
                "durable.read_range",
                move || self.durable.read_range(session, 0, None),
                Some(&self.cancel),
            )
            .await?;

        if !messages.is_empty() {
            if let Err(e) = self.reconciler.reconcile(session).await {
                warn!(session = %session, error = %e, "Summary restoration failed");
            }
        }
        Ok(messages)
    }

    pub async fn restore(&self, session: &SessionId) -> CacheResult<RestoreOutcome> {
        self.reconciler.reconcile(session).await
    }

    /// Delete a session from the durable store, then from the cache.
    ///
    /// Both steps are idempotent; on error the caller can simply retry.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn delete_session(&self, session: &SessionId) -> CacheResult<()> {
        let cancel = Some(&self.cancel);
        self.retry
            .execute(
                "durable.delete_session",
                move || self.durable.delete_session(session),
                cancel,
            )
            .await?;
        self.retry
            .execute("cache.clear_session", move || self.cache.clear_session(session), cancel)
            .await?;
        info!("Session deleted");
        Ok(())
    }

    async fn invalidate(&self, session: &SessionId) {
        let result = self
            .retry
            .execute(
                "cache.clear_session",
                move || self.cache.clear_session(session),
                Some(&self.cancel),
            )
            .await;
        if let Err(e) = result {
            error!(session = %session, error = %e, "Failed to invalidate session cache");
        }
    }
}
