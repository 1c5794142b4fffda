//! Key layout: `{prefix}:{session_id}:messages` and `{prefix}:{session_id}:summary`

use crate::types::SessionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn messages(&self, session: &SessionId) -> String {
        format!("{}:{}:messages", self.prefix, session)
    }

    pub fn summary(&self, session: &SessionId) -> String {
        format!("{}:{}:summary", self.prefix, session)
    }

    /// Both keys owned by a session
    pub fn all(&self, session: &SessionId) -> [String; 2] {
        [self.messages(session), self.summary(session)]
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new("session")
    }
}
