//! `PostgreSQL` implementations of the storage contracts.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use folio_core::blob::BlobStore;
use folio_core::error::StorageError;
use folio_core::ids::{AggregateId, EntityType, UserId};
use folio_core::list::ListStore;
use folio_core::publish::{EventPublisher, NullPublisher};
use folio_core::store::{AggregateStore, StoredEventRecord};

/// PostgreSQL-backed aggregate store.
///
/// Appends run inside a transaction: the current stream version is checked
/// in-transaction, and the `(entity_type, user_id, aggregate_id, version)`
/// unique constraint catches the writer that loses a race the check could
/// not see. The outbox is notified only after `COMMIT` returns.
#[derive(Clone)]
pub struct PgAggregateStore {
    pool: PgPool,
    publisher: Arc<dyn EventPublisher>,
}

impl PgAggregateStore {
    /// Creates a store with no downstream consumers.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_publisher(pool, Arc::new(NullPublisher))
    }

    /// Creates a store that notifies `publisher` after each committed append.
    #[must_use]
    pub fn with_publisher(pool: PgPool, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { pool, publisher }
    }

    /// Connects using the `DATABASE_URL` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the variable is unset or the
    /// database cannot be reached.
    pub async fn connect() -> Result<Self, StorageError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| StorageError::Unavailable("DATABASE_URL is not set".to_owned()))?;
        let pool = PgPool::connect(&url).await.map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool, for wiring sibling stores.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_error(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::TypeNotFound { .. } => {
            StorageError::Serialization(e.to_string())
        }
        other => StorageError::Unavailable(other.to_string()),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

async fn current_version(
    executor: impl sqlx::PgExecutor<'_>,
    entity_type: EntityType,
    user_id: &UserId,
    aggregate_id: &AggregateId,
) -> Result<i64, StorageError> {
    let version: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(version) FROM aggregate_events
         WHERE entity_type = $1 AND user_id = $2 AND aggregate_id = $3",
    )
    .bind(entity_type.as_str())
    .bind(user_id.as_uuid())
    .bind(aggregate_id.as_str())
    .fetch_one(executor)
    .await
    .map_err(map_sqlx_error)?;
    Ok(version.unwrap_or(0))
}

fn row_to_record(row: &PgRow) -> Result<StoredEventRecord, StorageError> {
    let entity_tag: String = row.try_get("entity_type").map_err(map_sqlx_error)?;
    Ok(StoredEventRecord {
        event_id: row.try_get("event_id").map_err(map_sqlx_error)?,
        entity_type: EntityType::from_str(&entity_tag)?,
        user_id: UserId::from(
            row.try_get::<uuid::Uuid, _>("user_id")
                .map_err(map_sqlx_error)?,
        ),
        aggregate_id: AggregateId::from(
            row.try_get::<String, _>("aggregate_id")
                .map_err(map_sqlx_error)?,
        ),
        version: row.try_get("version").map_err(map_sqlx_error)?,
        event_type: row.try_get("event_type").map_err(map_sqlx_error)?,
        payload: row.try_get("payload").map_err(map_sqlx_error)?,
        occurred_at: row.try_get("occurred_at").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl AggregateStore for PgAggregateStore {
    async fn stored_events(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
    ) -> Result<Vec<StoredEventRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT event_id, entity_type, user_id, aggregate_id, version, event_type, payload, occurred_at
             FROM aggregate_events
             WHERE entity_type = $1 AND user_id = $2
             ORDER BY position",
        )
        .bind(entity_type.as_str())
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_record).collect()
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

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let actual = current_version(&mut *tx, entity_type, user_id, aggregate_id).await?;
        if actual != expected_version {
            return Err(StorageError::VersionConflict {
                entity_type,
                aggregate_id: aggregate_id.clone(),
                expected: expected_version,
                actual,
            });
        }

        for record in records {
            let insert = sqlx::query(
                "INSERT INTO aggregate_events
                 (event_id, entity_type, user_id, aggregate_id, version, event_type, payload, occurred_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(record.event_id)
            .bind(entity_type.as_str())
            .bind(user_id.as_uuid())
            .bind(aggregate_id.as_str())
            .bind(record.version)
            .bind(&record.event_type)
            .bind(&record.payload)
            .bind(record.occurred_at)
            .execute(&mut *tx)
            .await;

            if let Err(e) = insert {
                if is_unique_violation(&e) {
                    // A concurrent writer committed between our check and
                    // this insert. Roll back and report the stream's real
                    // version.
                    drop(tx);
                    let actual =
                        current_version(&self.pool, entity_type, user_id, aggregate_id).await?;
                    return Err(StorageError::VersionConflict {
                        entity_type,
                        aggregate_id: aggregate_id.clone(),
                        expected: expected_version,
                        actual,
                    });
                }
                return Err(map_sqlx_error(e));
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;

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
        sqlx::query(
            "DELETE FROM aggregate_events
             WHERE entity_type = $1 AND user_id = $2 AND aggregate_id = $3",
        )
        .bind(entity_type.as_str())
        .bind(user_id.as_uuid())
        .bind(aggregate_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_aggregates(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
    ) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM aggregate_events WHERE entity_type = $1 AND user_id = $2")
            .bind(entity_type.as_str())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// PostgreSQL-backed blob store.
#[derive(Clone)]
pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    /// Creates a blob store on an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn get_raw(&self, key: &str) -> Result<serde_json::Value, StorageError> {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM blobs WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        value.ok_or_else(|| StorageError::BlobNotFound(key.to_owned()))
    }

    async fn save_raw(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        if value.is_null() {
            return Err(StorageError::NullBlob(key.to_owned()));
        }
        sqlx::query(
            "INSERT INTO blobs (key, value, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(&value)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// PostgreSQL-backed per-user list store.
#[derive(Clone)]
pub struct PgListStore {
    pool: PgPool,
}

impl PgListStore {
    /// Creates a list store on an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListStore for PgListStore {
    async fn push(&self, user_id: &UserId, entry: serde_json::Value) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO user_lists (user_id, entry) VALUES ($1, $2)")
            .bind(user_id.as_uuid())
            .bind(&entry)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn entries(&self, user_id: &UserId) -> Result<Vec<serde_json::Value>, StorageError> {
        sqlx::query_scalar("SELECT entry FROM user_lists WHERE user_id = $1 ORDER BY position")
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}
