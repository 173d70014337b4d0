//! Test stores — mock `AggregateStore` implementations for tests.

use async_trait::async_trait;

use folio_core::error::StorageError;
use folio_core::ids::{AggregateId, EntityType, UserId};
use folio_core::store::{AggregateStore, StoredEventRecord};

/// An aggregate store whose every operation fails with
/// [`StorageError::Unavailable`]. Useful for testing error-handling paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingAggregateStore;

fn unavailable() -> StorageError {
    StorageError::Unavailable("connection refused".to_owned())
}

#[async_trait]
impl AggregateStore for FailingAggregateStore {
    async fn stored_events(
        &self,
        _entity_type: EntityType,
        _user_id: &UserId,
    ) -> Result<Vec<StoredEventRecord>, StorageError> {
        Err(unavailable())
    }

    async fn append_events(
        &self,
        _entity_type: EntityType,
        _user_id: &UserId,
        _aggregate_id: &AggregateId,
        _expected_version: i64,
        _records: &[StoredEventRecord],
    ) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn delete_aggregate(
        &self,
        _entity_type: EntityType,
        _aggregate_id: &AggregateId,
        _user_id: &UserId,
    ) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn delete_aggregates(
        &self,
        _entity_type: EntityType,
        _user_id: &UserId,
    ) -> Result<(), StorageError> {
        Err(unavailable())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        Err(unavailable())
    }
}
