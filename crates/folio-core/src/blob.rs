//! Key/value blob storage for precomputed artifacts.
//!
//! Cached view models and other non-event-sourced artifacts live here, on the
//! same storage engine as the aggregate store. The interface is deliberately
//! minimal: get and upsert, no delete.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

/// Flat key/value store for JSON blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Loads the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BlobNotFound`] if the key is absent — callers
    /// either know the key exists or handle the error.
    async fn get_raw(&self, key: &str) -> Result<serde_json::Value, StorageError>;

    /// Upserts the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NullBlob`] if `value` is JSON null: storing
    /// null is a programming error, not a delete signal.
    async fn save_raw(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError>;
}

/// Typed convenience layer over [`BlobStore`].
#[async_trait]
pub trait TypedBlobStore: BlobStore {
    /// Loads and decodes the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BlobNotFound`] for an absent key, or
    /// [`StorageError::Serialization`] if the stored value does not decode
    /// to `T`.
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, StorageError> {
        let value = self.get_raw(key).await?;
        serde_json::from_value(value)
            .map_err(|e| StorageError::Serialization(format!("blob {key}: {e}")))
    }

    /// Encodes and upserts a value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NullBlob`] if `value` serializes to JSON null
    /// (e.g. an `Option::None`), or [`StorageError::Serialization`] if
    /// encoding fails.
    async fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)
            .map_err(|e| StorageError::Serialization(format!("blob {key}: {e}")))?;
        self.save_raw(key, value).await
    }
}

#[async_trait]
impl<S: BlobStore + ?Sized> TypedBlobStore for S {}
