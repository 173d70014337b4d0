//! Simple per-user append-only list storage.
//!
//! Used for artifacts that are append-and-read-back but not event-sourced,
//! such as login logs. Entries come back in insertion order.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::ids::UserId;

/// Append-only list of JSON entries per user.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Appends one entry to the user's list.
    async fn push(&self, user_id: &UserId, entry: serde_json::Value) -> Result<(), StorageError>;

    /// Returns all of the user's entries in insertion order.
    async fn entries(&self, user_id: &UserId) -> Result<Vec<serde_json::Value>, StorageError>;
}
