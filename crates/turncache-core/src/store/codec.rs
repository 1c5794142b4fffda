//! JSON encoding of cached messages

use crate::error::CacheResult;
use crate::types::CachedMessage;
use tracing::warn;

pub(crate) fn encode(message: &CachedMessage) -> CacheResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode list entries oldest-first, skipping entries that fail to parse
pub(crate) fn decode_all(key: &str, raw: Vec<String>) -> Vec<CachedMessage> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_str(&entry) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(key, index, error = %e, "Skipping undecodable cached message");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_encoded_shape() {
        let encoded = encode(&CachedMessage::user("hi")).unwrap();
        assert_eq!(encoded, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn test_decode_skips_garbage() {
        let raw = vec![
            r#"{"role":"user","content":"a"}"#.to_string(),
            "not json".to_string(),
            r#"{"role":"assistant","content":"b"}"#.to_string(),
        ];
        let messages = decode_all("k", raw);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
    }
}
