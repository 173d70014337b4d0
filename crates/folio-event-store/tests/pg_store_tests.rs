//! Integration tests for the PostgreSQL-backed stores.
//!
//! These need a live database; run them with `DATABASE_URL` pointing at a
//! scratch PostgreSQL instance:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/folio_test cargo test -p folio-event-store -- --ignored
//! ```

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use folio_core::blob::{BlobStore, TypedBlobStore};
use folio_core::error::StorageError;
use folio_core::ids::{AggregateId, EntityType, UserId};
use folio_core::list::ListStore;
use folio_core::store::{AggregateStore, StoredEventRecord};
use folio_event_store::postgres::{PgAggregateStore, PgBlobStore, PgListStore};
use folio_event_store::schema;

async fn connect() -> PgAggregateStore {
    let store = PgAggregateStore::connect()
        .await
        .expect("DATABASE_URL must point at a reachable PostgreSQL instance");
    schema::ensure_schema(store.pool()).await.unwrap();
    store
}

fn make_record(user_id: UserId, aggregate_id: &str, version: i64) -> StoredEventRecord {
    StoredEventRecord {
        event_id: Uuid::new_v4(),
        entity_type: EntityType::OwnedStock,
        user_id,
        aggregate_id: AggregateId::from(aggregate_id),
        version,
        event_type: "stock.purchased".to_owned(),
        payload: serde_json::json!({"type": "stock.purchased", "quantity": "10", "price": "2.10"}),
        occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set DATABASE_URL)"]
async fn append_and_load_round_trip() {
    let store = connect().await;
    let user_id = UserId::new();
    let aggregate_id = AggregateId::from("AMD");
    let records = vec![make_record(user_id, "AMD", 1), make_record(user_id, "AMD", 2)];

    store
        .append_events(EntityType::OwnedStock, &user_id, &aggregate_id, 0, &records)
        .await
        .unwrap();

    let loaded = store
        .stored_events(EntityType::OwnedStock, &user_id)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].event_id, records[0].event_id);
    assert_eq!(loaded[0].version, 1);
    assert_eq!(loaded[1].version, 2);
    assert_eq!(loaded[0].payload, records[0].payload);
    assert_eq!(
        loaded[0].occurred_at.timestamp_micros(),
        records[0].occurred_at.timestamp_micros()
    );
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set DATABASE_URL)"]
async fn stale_expected_version_is_rejected() {
    let store = connect().await;
    let user_id = UserId::new();
    let aggregate_id = AggregateId::from("AMD");

    store
        .append_events(
            EntityType::OwnedStock,
            &user_id,
            &aggregate_id,
            0,
            &[make_record(user_id, "AMD", 1), make_record(user_id, "AMD", 2)],
        )
        .await
        .unwrap();

    let result = store
        .append_events(
            EntityType::OwnedStock,
            &user_id,
            &aggregate_id,
            0,
            &[make_record(user_id, "AMD", 1)],
        )
        .await;

    match result {
        Err(StorageError::VersionConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 2);
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set DATABASE_URL)"]
async fn concurrent_saves_produce_exactly_one_winner() {
    let store = connect().await;
    let user_id = UserId::new();
    let aggregate_id = AggregateId::from("AMD");

    let first_records = [make_record(user_id, "AMD", 1)];
    let second_records = [make_record(user_id, "AMD", 1)];
    let first = store.append_events(
        EntityType::OwnedStock,
        &user_id,
        &aggregate_id,
        0,
        &first_records,
    );
    let second = store.append_events(
        EntityType::OwnedStock,
        &user_id,
        &aggregate_id,
        0,
        &second_records,
    );

    let (first, second) = tokio::join!(first, second);

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one writer must win");

    let loaded = store
        .stored_events(EntityType::OwnedStock, &user_id)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].version, 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set DATABASE_URL)"]
async fn delete_aggregate_removes_only_that_aggregate() {
    let store = connect().await;
    let user_id = UserId::new();

    store
        .append_events(
            EntityType::OwnedStock,
            &user_id,
            &AggregateId::from("AMD"),
            0,
            &[make_record(user_id, "AMD", 1)],
        )
        .await
        .unwrap();
    store
        .append_events(
            EntityType::OwnedStock,
            &user_id,
            &AggregateId::from("MSFT"),
            0,
            &[make_record(user_id, "MSFT", 1)],
        )
        .await
        .unwrap();

    store
        .delete_aggregate(EntityType::OwnedStock, &AggregateId::from("AMD"), &user_id)
        .await
        .unwrap();

    let loaded = store
        .stored_events(EntityType::OwnedStock, &user_id)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].aggregate_id.as_str(), "MSFT");
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set DATABASE_URL)"]
async fn delete_aggregates_removes_the_whole_owner_stream() {
    let store = connect().await;
    let user_id = UserId::new();

    store
        .append_events(
            EntityType::OwnedStock,
            &user_id,
            &AggregateId::from("AMD"),
            0,
            &[make_record(user_id, "AMD", 1)],
        )
        .await
        .unwrap();

    store
        .delete_aggregates(EntityType::OwnedStock, &user_id)
        .await
        .unwrap();

    assert!(
        store
            .stored_events(EntityType::OwnedStock, &user_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set DATABASE_URL)"]
async fn health_check_succeeds_against_live_database() {
    let store = connect().await;
    store.health_check().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set DATABASE_URL)"]
async fn blob_store_upserts_and_rejects_null() {
    let store = connect().await;
    let blobs = PgBlobStore::new(store.pool().clone());
    let key = format!("view:{}", Uuid::new_v4());

    blobs
        .save(&key, &serde_json::json!({"total": "31.00"}))
        .await
        .unwrap();
    blobs
        .save(&key, &serde_json::json!({"total": "52.50"}))
        .await
        .unwrap();

    let value: serde_json::Value = blobs.get(&key).await.unwrap();
    assert_eq!(value["total"], "52.50");

    let result = blobs.save_raw(&key, serde_json::Value::Null).await;
    assert!(matches!(result, Err(StorageError::NullBlob(_))));

    let missing = blobs.get_raw("no-such-key").await;
    assert!(matches!(missing, Err(StorageError::BlobNotFound(_))));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance (set DATABASE_URL)"]
async fn list_store_appends_in_order() {
    let store = connect().await;
    let lists = PgListStore::new(store.pool().clone());
    let user_id = UserId::new();

    lists
        .push(&user_id, serde_json::json!({"n": 1}))
        .await
        .unwrap();
    lists
        .push(&user_id, serde_json::json!({"n": 2}))
        .await
        .unwrap();

    let entries = lists.entries(&user_id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["n"], 1);
    assert_eq!(entries[1]["n"], 2);
}
