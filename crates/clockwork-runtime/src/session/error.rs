//! Storage errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`StorageError::NotFound`] | `STORAGE_NOT_FOUND` | No |
//! | [`StorageError::Io`] | `STORAGE_IO` | Yes |
//! | [`StorageError::Serialization`] | `STORAGE_SERIALIZATION` | No |
//! | [`StorageError::VersionMismatch`] | `STORAGE_VERSION_MISMATCH` | No |

use clockwork_types::ErrorCode;
use thiserror::Error;

/// Session storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No session stored under the id.
    #[error("session '{0}' not found")]
    NotFound(String),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored form could not be produced or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored form uses an unsupported format version.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Version this build reads and writes.
        expected: u32,
        /// Version found in the stored form.
        actual: u32,
    },
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "STORAGE_NOT_FOUND",
            Self::Io(_) => "STORAGE_IO",
            Self::Serialization(_) => "STORAGE_SERIALIZATION",
            Self::VersionMismatch { .. } => "STORAGE_VERSION_MISMATCH",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Transient filesystem conditions may clear; the rest require a
        // different id or a fresh session.
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_types::assert_error_code;

    #[test]
    fn codes_follow_convention() {
        assert_error_code(&StorageError::NotFound("x".into()), "STORAGE_");
        assert_error_code(
            &StorageError::VersionMismatch {
                expected: 1,
                actual: 9,
            },
            "STORAGE_",
        );
    }

    #[test]
    fn io_is_recoverable() {
        let err = StorageError::Io(std::io::Error::other("disk full"));
        assert!(err.is_recoverable());
        assert!(!StorageError::NotFound("x".into()).is_recoverable());
    }
}
