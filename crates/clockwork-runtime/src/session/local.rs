//! Local file-based session storage.
//!
//! Sessions are stored as one JSON file per id:
//!
//! ```text
//! ~/.clockwork/sessions/
//! ├── main.json
//! ├── scratch.json
//! └── ...
//! ```

use super::asset::SessionAsset;
use super::error::StorageError;
use super::store::SessionStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local file-based session store.
///
/// The default backend, suitable for single-machine use.
///
/// # Features
///
/// - One canonical JSON document per session
/// - Atomic writes (write to temp, then rename)
/// - Automatic directory creation
///
/// # Example
///
/// ```no_run
/// use clockwork_runtime::session::{LocalFileStore, SessionStore, SessionAsset};
/// use std::path::PathBuf;
///
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// # struct Model;
/// # #[derive(Debug, Clone, Serialize, Deserialize)]
/// # enum Msg {}
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalFileStore::new(PathBuf::from("~/.clockwork/sessions"))?;
///
/// let asset: SessionAsset<Model, Msg> = SessionAsset::new("main", vec![], Model);
/// store.save(&asset).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    /// Base directory for session files.
    base_path: PathBuf,
}

impl LocalFileStore {
    /// Creates a new local file store.
    ///
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        let expanded = expand_tilde(&base_path);

        if !expanded.exists() {
            std::fs::create_dir_all(&expanded)?;
        }

        Ok(Self {
            base_path: expanded,
        })
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Returns the file path for a session id.
    fn session_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{id}.json"))
    }

    /// Returns a temporary file path for atomic writes.
    fn temp_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!(".{id}.json.tmp"))
    }
}

impl<Model, M> SessionStore<Model, M> for LocalFileStore
where
    Model: Serialize + DeserializeOwned + Send + Sync + 'static,
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn save(&self, asset: &SessionAsset<Model, M>) -> Result<(), StorageError> {
        let json = asset.to_json()?;
        let path = self.session_path(&asset.id);
        let temp_path = self.temp_path(&asset.id);

        // Write to temp file first, then rename (atomic on most
        // filesystems).
        fs::write(&temp_path, &json).await?;
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<SessionAsset<Model, M>, StorageError> {
        let path = self.session_path(id);

        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        let json = fs::read_to_string(&path).await?;
        SessionAsset::from_json(&json)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let path = self.session_path(id);

        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        fs::remove_file(&path).await?;
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.session_path(id).exists())
    }
}

/// Expands `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.to_path_buf()
}

/// Returns the default session storage path.
#[must_use]
pub fn default_session_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".clockwork")
        .join("sessions")
}
