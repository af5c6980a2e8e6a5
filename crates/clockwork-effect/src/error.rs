//! Effect outcome errors.
//!
//! These are *payloads*, not exceptions: the execution service builds an
//! [`EffectError`] and feeds it through the effect's caller-supplied
//! error mapping, so failures arrive at the update function as ordinary
//! messages.
//!
//! # Error Code Convention
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EffectError::Http`] | `EFFECT_HTTP` | Yes |
//! | [`EffectError::Timeout`] | `EFFECT_TIMEOUT` | Yes |
//! | [`EffectError::Compute`] | `EFFECT_COMPUTE` | No |
//! | [`EffectError::UnknownTarget`] | `EFFECT_UNKNOWN_TARGET` | No |

use clockwork_types::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failure outcome of an effect.
///
/// Serializable so applications can store it in their model verbatim
/// (and therefore in the message log).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum EffectError {
    /// The network request failed (transport error or non-success status).
    #[error("http request failed{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Http {
        /// HTTP status code, if a response was received.
        status: Option<u16>,
        /// Human-readable failure description.
        message: String,
    },

    /// The operation exceeded its configured timeout.
    ///
    /// Always delivered: a timeout shares the abort path with a
    /// voluntary cancellation but, unlike one, is guaranteed to surface.
    #[error("timed out after {after_ms}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        after_ms: u64,
    },

    /// The offloaded computation failed or its unit panicked.
    #[error("computation on '{target}' failed: {message}")]
    Compute {
        /// Pool target the task was submitted to.
        target: String,
        /// Failure description (task error or panic summary).
        message: String,
    },

    /// No compute function is registered for the requested target.
    ///
    /// Delivered synchronously at submission so the caller is never
    /// left unanswered.
    #[error("no compute target registered under '{target}'")]
    UnknownTarget {
        /// The unregistered target name.
        target: String,
    },
}

impl ErrorCode for EffectError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http { .. } => "EFFECT_HTTP",
            Self::Timeout { .. } => "EFFECT_TIMEOUT",
            Self::Compute { .. } => "EFFECT_COMPUTE",
            Self::UnknownTarget { .. } => "EFFECT_UNKNOWN_TARGET",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Network conditions change; retry may succeed.
            Self::Http { .. } | Self::Timeout { .. } => true,
            // A failing task or missing registration won't fix itself.
            Self::Compute { .. } | Self::UnknownTarget { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_types::assert_error_codes;

    #[test]
    fn codes_follow_convention() {
        assert_error_codes(
            &[
                EffectError::Http {
                    status: Some(500),
                    message: "boom".into(),
                },
                EffectError::Timeout { after_ms: 100 },
                EffectError::Compute {
                    target: "hash".into(),
                    message: "panicked".into(),
                },
                EffectError::UnknownTarget {
                    target: "missing".into(),
                },
            ],
            "EFFECT_",
        );
    }

    #[test]
    fn recoverability() {
        assert!(EffectError::Timeout { after_ms: 5 }.is_recoverable());
        assert!(!EffectError::UnknownTarget {
            target: "x".into()
        }
        .is_recoverable());
    }

    #[test]
    fn display_includes_status() {
        let err = EffectError::Http {
            status: Some(404),
            message: "not found".into(),
        };
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn serde_roundtrip() {
        let err = EffectError::Compute {
            target: "hash".into(),
            message: "stack overflow".into(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: EffectError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
