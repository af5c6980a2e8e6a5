//! Caller-chosen string keys.
//!
//! Two kinds of identity in Clockwork are strings chosen by the
//! application, not generated ids:
//!
//! - [`AbortKey`] names an in-flight request slot. Issuing a second
//!   request under the same key supersedes the first ("latest wins");
//!   an explicit cancel effect targets the same key.
//! - [`SubscriptionKey`] is a standing effect's identity across
//!   reconciliation cycles. Two subscriptions with equal keys are the
//!   same subscription, even if their closures differ.
//!
//! Both are thin newtypes so the two namespaces cannot be mixed up at
//! call sites.

use serde::{Deserialize, Serialize};

/// Key naming an in-flight request slot for supersede/cancel.
///
/// # Example
///
/// ```
/// use clockwork_types::AbortKey;
///
/// let key = AbortKey::new("search");
/// assert_eq!(key.as_str(), "search");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbortKey(String);

impl AbortKey {
    /// Creates a key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbortKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AbortKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for AbortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a standing subscription across reconciliation cycles.
///
/// Unchanged keys are not restarted when the subscription list is
/// recomputed; only keys that appear or disappear cause starts/stops.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    /// Creates a key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubscriptionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SubscriptionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_key_equality_is_by_string() {
        assert_eq!(AbortKey::new("a"), AbortKey::from("a"));
        assert_ne!(AbortKey::new("a"), AbortKey::new("b"));
    }

    #[test]
    fn subscription_key_equality_is_by_string() {
        assert_eq!(
            SubscriptionKey::new("tick"),
            SubscriptionKey::from("tick".to_string())
        );
    }

    #[test]
    fn serde_is_transparent() {
        let key = AbortKey::new("search");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"search\"");

        let back: SubscriptionKey = serde_json::from_str("\"tick\"").unwrap();
        assert_eq!(back, SubscriptionKey::new("tick"));
    }

    #[test]
    fn display_round_trips() {
        let key = SubscriptionKey::new("frames");
        assert_eq!(key.to_string(), "frames");
    }
}
