//! In-memory implementations of the storage contracts.
//!
//! Used by tests and local development. Each store is an explicit instance
//! that callers construct and inject — there is no process-wide state, so
//! tests never leak into each other.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use folio_core::blob::BlobStore;
use folio_core::error::StorageError;
use folio_core::ids::{AggregateId, EntityType, UserId};
use folio_core::list::ListStore;
use folio_core::publish::{EventPublisher, NullPublisher};
use folio_core::store::{AggregateStore, StoredEventRecord};

type StreamKey = (EntityType, UserId);

/// In-memory aggregate store keeping owner streams in a hash map.
///
/// Version checking and the append itself happen under a single write lock,
/// so a multi-event batch is atomic: it is either fully visible or not at
/// all.
#[derive(Clone)]
pub struct InMemoryAggregateStore {
    streams: Arc<RwLock<HashMap<StreamKey, Vec<StoredEventRecord>>>>,
    publisher: Arc<dyn EventPublisher>,
}

impl InMemoryAggregateStore {
    /// Creates a store with no downstream consumers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_publisher(Arc::new(NullPublisher))
    }

    /// Creates a store that notifies `publisher` after each durable append.
    #[must_use]
    pub fn with_publisher(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            streams: Arc::new(RwLock::new(HashMap::new())),
            publisher,
        }
    }

    fn aggregate_version(stream: &[StoredEventRecord], aggregate_id: &AggregateId) -> i64 {
        stream
            .iter()
            .filter(|record| record.aggregate_id == *aggregate_id)
            .map(|record| record.version)
            .max()
            .unwrap_or(0)
    }
}

impl Default for InMemoryAggregateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AggregateStore for InMemoryAggregateStore {
    async fn stored_events(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
    ) -> Result<Vec<StoredEventRecord>, StorageError> {
        let streams = self.streams.read().expect("in-memory store lock poisoned");
        Ok(streams
            .get(&(entity_type, *user_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
        aggregate_id: &AggregateId,
        expected_version: i64,
        records: &[StoredEventRecord],
    ) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }

        {
            let mut streams = self.streams.write().expect("in-memory store lock poisoned");
            let stream = streams.entry((entity_type, *user_id)).or_default();

            let actual = Self::aggregate_version(stream, aggregate_id);
            if actual != expected_version {
                tracing::debug!(
                    %entity_type,
                    %aggregate_id,
                    expected_version,
                    actual,
                    "version mismatch, rejecting append"
                );
                return Err(StorageError::VersionConflict {
                    entity_type,
                    aggregate_id: aggregate_id.clone(),
                    expected: expected_version,
                    actual,
                });
            }

            let mut next = expected_version;
            for record in records {
                next += 1;
                debug_assert_eq!(
                    record.version, next,
                    "append batch must carry contiguous versions"
                );
                debug_assert_eq!(record.aggregate_id, *aggregate_id);
            }

            stream.extend(records.iter().cloned());
        }

        tracing::debug!(
            %entity_type,
            %aggregate_id,
            events_appended = records.len(),
            "events appended to stream"
        );
        self.publisher.publish(records).await
    }

    async fn delete_aggregate(
        &self,
        entity_type: EntityType,
        aggregate_id: &AggregateId,
        user_id: &UserId,
    ) -> Result<(), StorageError> {
        let mut streams = self.streams.write().expect("in-memory store lock poisoned");
        if let Some(stream) = streams.get_mut(&(entity_type, *user_id)) {
            stream.retain(|record| record.aggregate_id != *aggregate_id);
        }
        Ok(())
    }

    async fn delete_aggregates(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
    ) -> Result<(), StorageError> {
        let mut streams = self.streams.write().expect("in-memory store lock poisoned");
        streams.remove(&(entity_type, *user_id));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        let streams = self.streams.read().expect("in-memory store lock poisoned");
        drop(streams);
        Ok(())
    }
}

/// In-memory blob store.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl InMemoryBlobStore {
    /// Creates an empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get_raw(&self, key: &str) -> Result<serde_json::Value, StorageError> {
        let blobs = self.blobs.read().expect("in-memory blob lock poisoned");
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::BlobNotFound(key.to_owned()))
    }

    async fn save_raw(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        if value.is_null() {
            return Err(StorageError::NullBlob(key.to_owned()));
        }
        let mut blobs = self.blobs.write().expect("in-memory blob lock poisoned");
        blobs.insert(key.to_owned(), value);
        Ok(())
    }
}

/// In-memory per-user list store.
#[derive(Clone, Default)]
pub struct InMemoryListStore {
    lists: Arc<RwLock<HashMap<UserId, Vec<serde_json::Value>>>>,
}

impl InMemoryListStore {
    /// Creates an empty list store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn push(&self, user_id: &UserId, entry: serde_json::Value) -> Result<(), StorageError> {
        let mut lists = self.lists.write().expect("in-memory list lock poisoned");
        lists.entry(*user_id).or_default().push(entry);
        Ok(())
    }

    async fn entries(&self, user_id: &UserId) -> Result<Vec<serde_json::Value>, StorageError> {
        let lists = self.lists.read().expect("in-memory list lock poisoned");
        Ok(lists.get(user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::blob::TypedBlobStore;

    #[tokio::test]
    async fn blob_get_of_absent_key_is_not_found() {
        let blobs = InMemoryBlobStore::new();

        let result = blobs.get_raw("portfolio-view:u1").await;

        assert!(matches!(result, Err(StorageError::BlobNotFound(_))));
    }

    #[tokio::test]
    async fn blob_save_upserts() {
        let blobs = InMemoryBlobStore::new();

        blobs
            .save("net-worth:u1", &serde_json::json!({"total": "100"}))
            .await
            .unwrap();
        blobs
            .save("net-worth:u1", &serde_json::json!({"total": "250"}))
            .await
            .unwrap();

        let value: serde_json::Value = blobs.get("net-worth:u1").await.unwrap();
        assert_eq!(value["total"], "250");
    }

    #[tokio::test]
    async fn blob_save_rejects_null() {
        let blobs = InMemoryBlobStore::new();

        let result = blobs.save_raw("net-worth:u1", serde_json::Value::Null).await;

        assert!(matches!(result, Err(StorageError::NullBlob(_))));
    }

    #[tokio::test]
    async fn list_entries_keep_insertion_order_per_user() {
        let lists = InMemoryListStore::new();
        let user_a = UserId::new();
        let user_b = UserId::new();

        lists.push(&user_a, serde_json::json!({"n": 1})).await.unwrap();
        lists.push(&user_a, serde_json::json!({"n": 2})).await.unwrap();
        lists.push(&user_b, serde_json::json!({"n": 9})).await.unwrap();

        let entries = lists.entries(&user_a).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["n"], 1);
        assert_eq!(entries[1]["n"], 2);
        assert_eq!(lists.entries(&user_b).await.unwrap().len(), 1);
    }
}
