//! Engine errors.
//!
//! These are the fatal kind: a failed invariant or a state that cannot
//! survive canonical serialization aborts the current drain instead of
//! committing a corrupt model. Effect failures never appear here; they
//! are delivered as ordinary messages through the effect's error
//! mapping.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EngineError::Invariant`] | `ENGINE_INVARIANT` | No |
//! | [`EngineError::NotCanonical`] | `ENGINE_STATE_NOT_CANONICAL` | No |
//! | [`EngineError::Serialization`] | `ENGINE_SERIALIZATION` | No |

use clockwork_program::InvariantViolation;
use clockwork_types::ErrorCode;
use thiserror::Error;

/// Fatal error surfacing out of [`dispatch`](super::Engine::dispatch).
///
/// The drain is aborted with unprocessed messages left in the queue;
/// resilience beyond that is the update function's responsibility.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A caller invariant failed on a freshly produced model.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    /// A freshly produced model did not survive a canonical
    /// serialization round-trip.
    ///
    /// Raised only in consistency-check mode. Usually means part of the
    /// model is skipped or reshaped by its serde representation, so the
    /// committed state and its persisted form would disagree.
    #[error("state failed canonical round-trip: {detail}")]
    NotCanonical {
        /// What differed.
        detail: String,
    },

    /// The model could not be serialized at all.
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Invariant(_) => "ENGINE_INVARIANT",
            Self::NotCanonical { .. } => "ENGINE_STATE_NOT_CANONICAL",
            Self::Serialization(_) => "ENGINE_SERIALIZATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        // All three mean the program itself is wrong; retrying the
        // dispatch cannot help.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_types::assert_error_code;

    #[test]
    fn codes_follow_convention() {
        assert_error_code(
            &EngineError::Invariant(InvariantViolation::new("x")),
            "ENGINE_",
        );
        assert_error_code(
            &EngineError::NotCanonical {
                detail: "field dropped".into(),
            },
            "ENGINE_",
        );
    }

    #[test]
    fn invariant_converts() {
        let err: EngineError = InvariantViolation::new("count negative").into();
        assert_eq!(err.code(), "ENGINE_INVARIANT");
        assert!(err.to_string().contains("count negative"));
    }
}
