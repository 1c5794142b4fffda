//! Summarization step used when a session reaches its message limit

use crate::error::CacheResult;
use crate::types::CachedMessage;
use async_trait::async_trait;

/// Render messages as a `Role: content` transcript, one turn per line
pub fn format_conversation(messages: &[CachedMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Produces a new summary from the previous summary and the cached window.
///
/// Implementations usually call an LLM; the cache only needs the text back.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        previous: Option<&str>,
        messages: &[CachedMessage],
    ) -> CacheResult<String>;
}

/// Deterministic summarizer that keeps the opening of each turn.
///
/// Used where no model is available (tests, the CLI simulator).
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    max_chars_per_turn: usize,
    max_chars: usize,
}

impl ExtractiveSummarizer {
    pub fn new() -> Self {
        Self {
            max_chars_per_turn: 80,
            max_chars: 2000,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    fn clip(text: &str, max: usize) -> String {
        if text.chars().count() <= max {
            return text.to_string();
        }
        let mut clipped: String = text.chars().take(max.saturating_sub(3)).collect();
        clipped.push_str("...");
        clipped
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(
        &self,
        previous: Option<&str>,
        messages: &[CachedMessage],
    ) -> CacheResult<String> {
        let mut lines = Vec::with_capacity(messages.len() + 1);
        if let Some(previous) = previous.filter(|p| !p.trim().is_empty()) {
            lines.push(previous.to_string());
        }
        for message in messages {
            lines.push(format!(
                "{}: {}",
                message.role.label(),
                Self::clip(message.content.trim(), self.max_chars_per_turn)
            ));
        }

        let summary = lines.join("\n");
        let total = summary.chars().count();
        if total <= self.max_chars {
            return Ok(summary);
        }
        // Keep the most recent part when over budget.
        Ok(summary.chars().skip(total - self.max_chars).collect())
    }
}
