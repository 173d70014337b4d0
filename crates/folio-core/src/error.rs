//! Storage error taxonomy.

use thiserror::Error;

use crate::ids::{AggregateId, EntityType};

/// Errors surfaced by the aggregate store, the blob store and the list store.
///
/// "Aggregate does not exist" is deliberately absent: an empty stream is a
/// normal state and single-aggregate lookups return `Option::None` for it.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A concurrent writer appended to the same aggregate stream first.
    /// Retryable: reload the aggregate and repeat the mutate-save cycle.
    #[error(
        "version conflict on {entity_type} stream {aggregate_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        /// Entity type of the contested stream.
        entity_type: EntityType,
        /// Aggregate whose stream was contested.
        aggregate_id: AggregateId,
        /// The version the writer loaded.
        expected: i64,
        /// The version actually found in the store.
        actual: i64,
    },

    /// The backing storage medium could not be reached.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    /// A stored payload could not be decoded to its declared event type.
    /// Represents unreadable history and is never silently dropped.
    #[error("stored event could not be decoded: {0}")]
    Serialization(String),

    /// No blob exists under the requested key.
    #[error("no blob stored under key {0}")]
    BlobNotFound(String),

    /// A null value was passed to a blob save. Deletion is not expressed by
    /// storing null; this is a programming error at the call site.
    #[error("refusing to store a null value under blob key {0}")]
    NullBlob(String),
}
