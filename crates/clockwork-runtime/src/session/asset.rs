//! The stored session shape.

use super::error::StorageError;
use clockwork_program::{MsgLogEntry, Program};
use clockwork_types::canonical;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Current session format version.
pub const SESSION_VERSION: u32 = 1;

/// The engine's atomic `{log, snapshot}` pair.
///
/// Both sides are read under one lock, so the snapshot is exactly the
/// state the log produces from the replay base.
pub struct ReplayableState<P: Program> {
    /// The message log, oldest first.
    pub log: Vec<MsgLogEntry<P::Msg>>,
    /// The committed state the log ends at.
    pub snapshot: Arc<P::Model>,
}

impl<P: Program> ReplayableState<P> {
    /// Converts the pair into its stored form under an id.
    #[must_use]
    pub fn to_asset(&self, id: impl Into<String>) -> SessionAsset<P::Model, P::Msg> {
        SessionAsset::new(id, self.log.clone(), (*self.snapshot).clone())
    }
}

/// Versioned persisted form of a session.
///
/// Serializes to canonical JSON (sorted object keys), so equal sessions
/// produce byte-identical files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Model: Serialize, M: Serialize",
    deserialize = "Model: Deserialize<'de>, M: Deserialize<'de>"
))]
pub struct SessionAsset<Model, M> {
    /// Format version; readers reject mismatches.
    pub version: u32,
    /// Caller-chosen session id.
    pub id: String,
    /// When the asset was produced, Unix milliseconds.
    pub saved_at_ms: i64,
    /// The message log, oldest first.
    pub log: Vec<MsgLogEntry<M>>,
    /// The state the log ends at.
    pub snapshot: Model,
}

impl<Model, M> SessionAsset<Model, M>
where
    Model: Serialize + DeserializeOwned,
    M: Serialize + DeserializeOwned,
{
    /// Creates an asset stamped with the current wall clock.
    #[must_use]
    pub fn new(id: impl Into<String>, log: Vec<MsgLogEntry<M>>, snapshot: Model) -> Self {
        Self {
            version: SESSION_VERSION,
            id: id.into(),
            saved_at_ms: chrono::Utc::now().timestamp_millis(),
            log,
            snapshot,
        }
    }

    /// Checks the format version.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::VersionMismatch` for foreign versions.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.version != SESSION_VERSION {
            return Err(StorageError::VersionMismatch {
                expected: SESSION_VERSION,
                actual: self.version,
            });
        }
        Ok(())
    }

    /// Serializes to canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the model or a message
    /// cannot be represented as JSON.
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(canonical::to_canonical_string(self)?)
    }

    /// Parses and version-checks a stored form.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` on malformed input and
    /// `StorageError::VersionMismatch` on foreign versions.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let asset: Self = serde_json::from_str(json)?;
        asset.validate()?;
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Model {
        count: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Msg {
        Bump,
    }

    fn asset() -> SessionAsset<Model, Msg> {
        SessionAsset::new(
            "s1",
            vec![MsgLogEntry::new(Msg::Bump, 10)],
            Model { count: 1 },
        )
    }

    #[test]
    fn json_roundtrip() {
        let asset = asset();
        let json = asset.to_json().unwrap();
        let back = SessionAsset::<Model, Msg>::from_json(&json).unwrap();

        assert_eq!(back.id, "s1");
        assert_eq!(back.log, asset.log);
        assert_eq!(back.snapshot, asset.snapshot);
    }

    #[test]
    fn stored_form_is_canonical() {
        let asset = asset();
        let a = asset.to_json().unwrap();
        let b = asset.to_json().unwrap();
        assert_eq!(a, b);
        // Sorted keys: "id" precedes "log" precedes "snapshot".
        let id_pos = a.find("\"id\"").unwrap();
        let log_pos = a.find("\"log\"").unwrap();
        let snap_pos = a.find("\"snapshot\"").unwrap();
        assert!(id_pos < log_pos && log_pos < snap_pos);
    }

    #[test]
    fn foreign_version_rejected() {
        let mut asset = asset();
        asset.version = 99;
        let json = serde_json::to_string(&asset).unwrap();

        let result = SessionAsset::<Model, Msg>::from_json(&json);
        assert!(matches!(
            result,
            Err(StorageError::VersionMismatch { actual: 99, .. })
        ));
    }

    #[test]
    fn malformed_json_rejected() {
        let result = SessionAsset::<Model, Msg>::from_json("{not json");
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
