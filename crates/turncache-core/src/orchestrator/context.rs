//! Conversation context assembled for a model call

use crate::restore::RestoreOutcome;
use crate::types::CachedMessage;
use serde::Serialize;

/// Where the context was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Cache,
    /// Cache was empty and the summary was restored from the durable store
    Restored,
    /// Cache was unavailable; read from the durable store directly
    Durable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationContext {
    pub summary: Option<String>,
    pub messages: Vec<CachedMessage>,
    pub source: ContextSource,
}

impl ConversationContext {
    pub(crate) fn from_cache(
        summary: Option<String>,
        messages: Vec<CachedMessage>,
        restore: Option<&RestoreOutcome>,
    ) -> Self {
        let source = match restore {
            Some(outcome) if outcome.restored() => ContextSource::Restored,
            _ => ContextSource::Cache,
        };
        Self {
            summary,
            messages,
            source,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.messages.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.source == ContextSource::Durable
    }

    /// Append the summary, if any, to a base system prompt
    pub fn system_prompt(&self, base: &str) -> String {
        match &self.summary {
            Some(summary) => format!("{base}\n\nPrevious conversation summary: {summary}"),
            None => base.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_includes_summary() {
        let context = ConversationContext {
            summary: Some("likes tea".to_string()),
            messages: Vec::new(),
            source: ContextSource::Cache,
        };
        assert_eq!(
            context.system_prompt("Be helpful."),
            "Be helpful.\n\nPrevious conversation summary: likes tea"
        );
    }

    #[test]
    fn test_source_from_restore_outcome() {
        let restored = RestoreOutcome::SummaryRestored { durable_messages: 2 };
        let context = ConversationContext::from_cache(Some("x".into()), Vec::new(), Some(&restored));
        assert_eq!(context.source, ContextSource::Restored);

        let context = ConversationContext::from_cache(None, Vec::new(), None);
        assert_eq!(context.source, ContextSource::Cache);
        assert!(context.is_empty());
    }
}
