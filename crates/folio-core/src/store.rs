//! Aggregate store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::aggregate::AggregateRoot;
use crate::error::StorageError;
use crate::event::DomainEvent;
use crate::ids::{AggregateId, EntityType, UserId};

/// Stored representation of a domain event.
#[derive(Debug, Clone)]
pub struct StoredEventRecord {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Entity type the stream is partitioned by.
    pub entity_type: EntityType,
    /// Owner of the stream.
    pub user_id: UserId,
    /// Aggregate this event belongs to.
    pub aggregate_id: AggregateId,
    /// Position within the aggregate's stream, contiguous from 1.
    pub version: i64,
    /// Stable event tag for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Durable, ordered, append-only storage of event streams.
///
/// Streams are keyed by `(entity_type, user_id)`; grouping an owner's stream
/// by aggregate id yields each individual aggregate instance. Implementations
/// hold no caches of stream contents, so every read observes the latest
/// committed state.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Loads all stored events across all of the owner's aggregates of the
    /// given entity type, in append order (version order within each
    /// aggregate).
    async fn stored_events(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
    ) -> Result<Vec<StoredEventRecord>, StorageError>;

    /// Appends a batch of new events to one aggregate's stream.
    ///
    /// `expected_version` is the number of events the writer observed when it
    /// loaded the aggregate; the records must carry the contiguous versions
    /// `expected_version + 1 ..`. The append is atomic — either the whole
    /// batch becomes durable or none of it does — and a successful non-empty
    /// append forwards the stored records to the outbox. An empty batch is a
    /// no-op that touches neither the store nor the outbox.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::VersionConflict`] if another writer got there
    /// first, or [`StorageError::Unavailable`] if the backing medium cannot
    /// be reached. A failed append never notifies the outbox.
    async fn append_events(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
        aggregate_id: &AggregateId,
        expected_version: i64,
        records: &[StoredEventRecord],
    ) -> Result<(), StorageError>;

    /// Removes every stored event for one aggregate instance.
    async fn delete_aggregate(
        &self,
        entity_type: EntityType,
        aggregate_id: &AggregateId,
        user_id: &UserId,
    ) -> Result<(), StorageError>;

    /// Removes an owner's entire stream for the given entity type.
    async fn delete_aggregates(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
    ) -> Result<(), StorageError>;

    /// Performs a trivial read against the backing store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the store is unreachable.
    async fn health_check(&self) -> Result<(), StorageError>;
}

/// Converts a domain event into its stored representation.
pub fn to_record<E: DomainEvent>(event: &E, entity_type: EntityType) -> StoredEventRecord {
    let meta = event.metadata();
    StoredEventRecord {
        event_id: meta.event_id,
        entity_type,
        user_id: meta.user_id,
        aggregate_id: meta.aggregate_id.clone(),
        version: meta.version,
        event_type: event.event_type().to_owned(),
        payload: event.to_payload(),
        occurred_at: meta.occurred_at,
    }
}

/// Rebuilds event metadata from a stored record.
#[must_use]
pub fn metadata_from_record(record: &StoredEventRecord) -> crate::event::EventMetadata {
    crate::event::EventMetadata {
        event_id: record.event_id,
        aggregate_id: record.aggregate_id.clone(),
        user_id: record.user_id,
        version: record.version,
        occurred_at: record.occurred_at,
    }
}

/// Converts an aggregate's pending events into stored records ready for
/// [`AggregateStore::append_events`].
pub fn pending_records<A: AggregateRoot>(
    aggregate: &A,
    entity_type: EntityType,
) -> Vec<StoredEventRecord> {
    aggregate
        .pending_events()
        .iter()
        .map(|event| to_record(event, entity_type))
        .collect()
}

/// Decodes a stored payload into a context's event kind enum.
///
/// # Errors
///
/// Returns [`StorageError::Serialization`] if the payload does not match the
/// declared event type — unreadable history is surfaced, never skipped.
pub fn decode_kind<K: DeserializeOwned>(record: &StoredEventRecord) -> Result<K, StorageError> {
    serde_json::from_value(record.payload.clone()).map_err(|e| {
        StorageError::Serialization(format!(
            "event {} (type {}): {e}",
            record.event_id, record.event_type
        ))
    })
}
