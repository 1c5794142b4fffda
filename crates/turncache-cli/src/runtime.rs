//! Process-wide components, built once at startup and torn down on exit

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use turncache_core::{
    CachePool, CacheSettings, ConversationOrchestrator, ExtractiveSummarizer, JsonlDurableStore,
    MemoryBackend, SessionCacheService, load_settings,
};

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// Load settings and apply command-line overrides
pub fn resolve_settings(config: Option<&Path>, data_dir: Option<&Path>) -> Result<CacheSettings> {
    let config = config.map(expand_path);
    let mut settings =
        load_settings(config.as_deref()).context("Failed to load turncache settings")?;
    if let Some(dir) = data_dir {
        settings.durable.data_dir = expand_path(dir);
    }
    Ok(settings)
}

pub struct Runtime {
    pub settings: CacheSettings,
    pub pool: Arc<CachePool>,
    pub cache: Arc<SessionCacheService>,
    pub durable: Arc<JsonlDurableStore>,
    pub orchestrator: ConversationOrchestrator,
}

impl Runtime {
    /// Connect the cache pool and open the durable store
    pub async fn start(settings: CacheSettings) -> Result<Self> {
        let pool = CachePool::connect(&settings, Arc::new(MemoryBackend::new()))
            .await
            .context("Failed to connect cache pool")?;
        let cache = Arc::new(SessionCacheService::new(pool.clone(), &settings));
        let durable = Arc::new(JsonlDurableStore::new(&settings.durable.data_dir));
        let orchestrator = ConversationOrchestrator::new(
            cache.clone(),
            durable.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            settings.retry.clone(),
        );

        info!(
            data_dir = %settings.durable.data_dir.display(),
            message_limit = settings.message_limit,
            keep_last = settings.keep_last,
            "Runtime started"
        );
        Ok(Self {
            settings,
            pool,
            cache,
            durable,
            orchestrator,
        })
    }

    pub async fn shutdown(self) {
        self.orchestrator.shutdown();
        self.pool.close().await;
    }
}
