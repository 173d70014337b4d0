//! Event store database schema.

use sqlx::PgPool;

use folio_core::error::StorageError;

/// SQL to create the aggregate events table.
///
/// The unique constraint on `(entity_type, user_id, aggregate_id, version)`
/// is the backstop for concurrent writers: the loser of a race fails the
/// constraint and surfaces as a version conflict.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS aggregate_events (
    position        BIGSERIAL PRIMARY KEY,
    event_id        UUID NOT NULL UNIQUE,
    entity_type     VARCHAR(32) NOT NULL,
    user_id         UUID NOT NULL,
    aggregate_id    VARCHAR(255) NOT NULL,
    version         BIGINT NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    payload         JSONB NOT NULL,
    occurred_at     TIMESTAMPTZ NOT NULL,
    UNIQUE (entity_type, user_id, aggregate_id, version)
);

CREATE INDEX IF NOT EXISTS idx_aggregate_events_stream
    ON aggregate_events (entity_type, user_id, position);
";

/// SQL to create the blobs table.
pub const CREATE_BLOBS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS blobs (
    key         VARCHAR(255) PRIMARY KEY,
    value       JSONB NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

/// SQL to create the per-user lists table.
pub const CREATE_USER_LISTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS user_lists (
    position    BIGSERIAL PRIMARY KEY,
    user_id     UUID NOT NULL,
    entry       JSONB NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_user_lists_user_id
    ON user_lists (user_id, position);
";

/// Creates every table the stores need, if absent.
///
/// # Errors
///
/// Returns [`StorageError::Unavailable`] if the database cannot be reached.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    for statement in [
        CREATE_EVENTS_TABLE,
        CREATE_BLOBS_TABLE,
        CREATE_USER_LISTS_TABLE,
    ] {
        sqlx::raw_sql(statement)
            .execute(pool)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
    }
    Ok(())
}
