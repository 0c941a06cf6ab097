//! `threadId:updatedAt` keys used for de-duplication and acknowledgment.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::RawNotification;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositeKeyError {
    #[error("invalid composite key '{raw}': expected <threadId>:<updatedAt>")]
    MissingSeparator { raw: String },
    #[error("invalid composite key {raw:?}: control characters are not allowed")]
    ControlCharacter { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Unit of acknowledgment: a thread id qualified by the activity timestamp.
///
/// Equality is plain string equality, so a reused thread id with a newer
/// `updated_at` is a distinct key.
pub struct CompositeKey(String);

impl CompositeKey {
    pub fn new(thread_id: &str, updated_at: &str) -> Self {
        Self(format!("{thread_id}:{updated_at}"))
    }

    pub fn for_notification(notification: &RawNotification) -> Self {
        Self::new(&notification.id, &notification.updated_at)
    }

    /// Accepts the literal `threadId:updatedAt` form; the first `:` must
    /// follow at least one character. Line breaks and other control
    /// characters are rejected so one key is always one journal line.
    pub fn parse(raw: &str) -> Result<Self, CompositeKeyError> {
        if raw.chars().any(char::is_control) {
            return Err(CompositeKeyError::ControlCharacter {
                raw: raw.to_string(),
            });
        }
        match raw.find(':') {
            Some(index) if index > 0 => Ok(Self(raw.to_string())),
            _ => Err(CompositeKeyError::MissingSeparator {
                raw: raw.to_string(),
            }),
        }
    }

    pub fn thread_id(&self) -> &str {
        self.0
            .split_once(':')
            .map(|(thread_id, _)| thread_id)
            .unwrap_or(self.0.as_str())
    }

    pub fn updated_at(&self) -> &str {
        self.0
            .split_once(':')
            .map(|(_, updated_at)| updated_at)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{CompositeKey, CompositeKeyError};

    #[test]
    fn unit_parse_splits_on_first_colon_only() {
        let key = CompositeKey::parse("1001:2026-02-01T11:30:00.000Z").expect("valid key");
        assert_eq!(key.thread_id(), "1001");
        assert_eq!(key.updated_at(), "2026-02-01T11:30:00.000Z");
        assert_eq!(key.as_str(), "1001:2026-02-01T11:30:00.000Z");
    }

    #[test]
    fn unit_parse_rejects_missing_or_leading_separator() {
        for raw in ["invalid-key", ":2026-02-01T11:30:00.000Z", ""] {
            let error = CompositeKey::parse(raw).expect_err("invalid key");
            assert_eq!(
                error,
                CompositeKeyError::MissingSeparator {
                    raw: raw.to_string()
                }
            );
        }
    }

    #[test]
    fn unit_parse_rejects_line_breaks_and_control_characters() {
        for raw in ["1001:a\n2002:b", "1001:a\r\n", "1001:\u{0}a", "10\t01:a"] {
            let error = CompositeKey::parse(raw).expect_err("control character");
            assert_eq!(
                error,
                CompositeKeyError::ControlCharacter {
                    raw: raw.to_string()
                }
            );
        }
    }

    #[test]
    fn regression_same_thread_with_newer_timestamp_is_a_distinct_key() {
        let older = CompositeKey::new("1001", "2026-02-01T11:30:00Z");
        let newer = CompositeKey::new("1001", "2026-02-01T12:00:00Z");
        assert_ne!(older, newer);
        assert_eq!(older.thread_id(), newer.thread_id());
        assert_eq!(older, CompositeKey::new("1001", "2026-02-01T11:30:00Z"));
    }
}
