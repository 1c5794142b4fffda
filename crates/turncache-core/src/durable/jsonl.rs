//! File-backed durable store
//!
//! Layout:
//! ```text
//! <data_dir>/
//!   <session>/
//!     messages.jsonl
//!     summary.json
//! ```

use super::{DurableMessage, DurableStore, DurableSummary, clamp_range};
use crate::error::{CacheError, CacheResult};
use crate::types::{CachedMessage, SessionId};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const MESSAGES_FILE: &str = "messages.jsonl";
const SUMMARY_FILE: &str = "summary.json";

fn io_error(action: &str, path: &Path, e: std::io::Error) -> CacheError {
    CacheError::durable_with_context(format!("Failed to {}: {}", action, e), path.display().to_string())
}

/// Directory name for a session id. Characters outside `[A-Za-z0-9_-]` are
/// percent-encoded so ids can never escape the data directory.
fn dir_name(session: &SessionId) -> String {
    let mut name = String::with_capacity(session.as_str().len());
    for byte in session.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    name
}

/// Sessions as directories of JSONL logs.
///
/// Message counts are parsed from the log once per session and then kept
/// current by this instance's appends, so counting never rereads the log.
/// Only one instance should write a given data directory.
#[derive(Debug)]
pub struct JsonlDurableStore {
    base_path: PathBuf,
    write_locks: DashMap<SessionId, Arc<Mutex<()>>>,
    counts: DashMap<SessionId, usize>,
}

impl JsonlDurableStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_locks: DashMap::new(),
            counts: DashMap::new(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.base_path.join(dir_name(session))
    }

    fn messages_path(&self, session: &SessionId) -> PathBuf {
        self.session_dir(session).join(MESSAGES_FILE)
    }

    fn summary_path(&self, session: &SessionId) -> PathBuf {
        self.session_dir(session).join(SUMMARY_FILE)
    }

    fn write_lock(&self, session: &SessionId) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(session.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn ensure_session_dir(&self, session: &SessionId) -> CacheResult<()> {
        let dir = self.session_dir(session);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create session directory", &dir, e))
    }

    async fn load_messages(&self, session: &SessionId) -> CacheResult<Vec<DurableMessage>> {
        let path = self.messages_path(session);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("open messages file", &path, e)),
        };

        let mut lines = BufReader::new(file).lines();
        let mut messages = Vec::new();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| io_error("read messages file", &path, e))?
        {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DurableMessage>(&line) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    warn!(
                        session = %session,
                        error = %e,
                        line = %line.chars().take(50).collect::<String>(),
                        "Skipping unparseable durable message"
                    );
                }
            }
        }
        Ok(messages)
    }

    /// Message count, loading it from the log on first use. The caller must
    /// hold the session write lock.
    async fn count_locked(&self, session: &SessionId) -> CacheResult<usize> {
        if let Some(count) = self.counts.get(session) {
            return Ok(*count);
        }
        let count = self.load_messages(session).await?.len();
        self.counts.insert(session.clone(), count);
        debug!(session = %session, count, "Durable message count loaded");
        Ok(count)
    }

    /// Read the full summary row
    pub async fn summary_record(&self, session: &SessionId) -> CacheResult<Option<DurableSummary>> {
        let path = self.summary_path(session);
        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read summary file", &path, e)),
        };
        let row = serde_json::from_str(&json)?;
        Ok(Some(row))
    }
}

#[async_trait]
impl DurableStore for JsonlDurableStore {
    async fn append(&self, session: &SessionId, message: &CachedMessage) -> CacheResult<String> {
        let lock = self.write_lock(session);
        let _guard = lock.lock().await;
        self.ensure_session_dir(session).await?;

        let record = DurableMessage::record(message);
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let path = self.messages_path(session);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error("open messages file", &path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| io_error("write message", &path, e))?;
        file.flush()
            .await
            .map_err(|e| io_error("flush messages file", &path, e))?;

        if let Some(mut count) = self.counts.get_mut(session) {
            *count += 1;
        }

        debug!(session = %session, message_id = %record.message_id, "Durable message appended");
        Ok(record.message_id)
    }

    async fn read_range(
        &self,
        session: &SessionId,
        from: usize,
        to: Option<usize>,
    ) -> CacheResult<Vec<DurableMessage>> {
        let mut messages = self.load_messages(session).await?;
        let range = clamp_range(messages.len(), from, to);
        messages.truncate(range.end);
        Ok(messages.split_off(range.start))
    }

    async fn message_count(&self, session: &SessionId) -> CacheResult<usize> {
        if let Some(count) = self.counts.get(session) {
            return Ok(*count);
        }
        let lock = self.write_lock(session);
        let _guard = lock.lock().await;
        self.count_locked(session).await
    }

    async fn get_summary(&self, session: &SessionId) -> CacheResult<Option<String>> {
        Ok(self.summary_record(session).await?.map(|row| row.summary))
    }

    async fn set_summary(&self, session: &SessionId, text: &str) -> CacheResult<()> {
        let lock = self.write_lock(session);
        let _guard = lock.lock().await;
        self.ensure_session_dir(session).await?;

        let row = DurableSummary {
            summary: text.to_string(),
            last_updated: Utc::now(),
            message_count: self.count_locked(session).await?,
        };
        let json = serde_json::to_string_pretty(&row)?;

        // Write then rename so readers never see a partial summary.
        let path = self.summary_path(session);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| io_error("write summary file", &tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("replace summary file", &path, e))?;

        debug!(session = %session, message_count = row.message_count, "Durable summary saved");
        Ok(())
    }

    async fn delete_session(&self, session: &SessionId) -> CacheResult<()> {
        let lock = self.write_lock(session);
        let guard = lock.lock().await;

        let dir = self.session_dir(session);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => info!(session = %session, "Deleted durable session"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(session = %session, "Durable session already absent");
            }
            Err(e) => return Err(io_error("delete session directory", &dir, e)),
        }

        self.counts.remove(session);
        drop(guard);
        self.write_locks
            .remove_if(session, |_, lock| Arc::strong_count(lock) <= 2);
        Ok(())
    }
}
