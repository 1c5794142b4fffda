//! Turncache Core Library
//!
//! A bounded, write-through message cache for conversational sessions. The
//! cache sits in front of a durable store, signals when a session has grown
//! long enough to summarize, trims it to a recent window afterwards and
//! restores summaries after cache loss.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod durable;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod policy;
pub mod pool;
pub mod recovery;
pub mod restore;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use backend::{CacheBackend, CacheKeys, MemoryBackend};
pub use config::{CacheSettings, LoggingConfig, load_settings};
pub use coordinator::{SignalSource, SummarizationCoordinator, SummarizationSignal};
pub use durable::{DurableMessage, DurableStore, JsonlDurableStore, MemoryDurableStore};
pub use error::{CacheError, CacheResult, ResultExt};
pub use guard::ConsistencyGuard;
pub use orchestrator::{
    ContextSource, ConversationContext, ConversationOrchestrator, ExtractiveSummarizer,
    SummarizationStatus, Summarizer, TurnReceipt, format_conversation,
};
pub use policy::CachePolicy;
pub use pool::{CachePool, PoolHealth};
pub use recovery::{RetryConfig, RetryPolicy};
pub use restore::{CacheState, RestorationReconciler, RestoreOutcome};
pub use service::{AddMessageOutcome, SessionCacheService, TrimOutcome};
pub use store::{CacheStore, TrimReport};
pub use types::{CachedMessage, Role, SessionId};
