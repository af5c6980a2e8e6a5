//! Storage abstraction.
//!
//! The [`SessionStore`] trait defines the interface for session
//! persistence, allowing pluggable backends (local file, remote,
//! in-memory for tests).

use super::asset::SessionAsset;
use super::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Session storage abstraction.
///
/// Implementations must be thread-safe (`Send + Sync`) for use across
/// async tasks.
///
/// # Design Principles
///
/// - **Async**: all operations are async for I/O efficiency
/// - **Atomic**: a failed save must never corrupt a previous save
/// - **Format-agnostic**: the store sees one canonical JSON document
///   per session; nothing beyond that shape is imposed
pub trait SessionStore<Model, M>: Send + Sync
where
    Model: Serialize + DeserializeOwned + Send + Sync + 'static,
    M: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Saves a session asset, overwriting any previous save under the
    /// same id.
    fn save(
        &self,
        asset: &SessionAsset<Model, M>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Loads a session asset by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    fn load(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<SessionAsset<Model, M>, StorageError>> + Send;

    /// Deletes a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Checks if a session exists.
    fn exists(&self, id: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;
}
