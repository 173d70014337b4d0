//! Integration tests for the outbox delivery guarantee.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use folio_core::ids::{AggregateId, EntityType, UserId};
use folio_core::publish::{EventPublisher, EventSubscriber};
use folio_core::store::{AggregateStore, StoredEventRecord};
use folio_event_store::memory::InMemoryAggregateStore;
use folio_event_store::outbox::{Outbox, OutboxConfig};
use folio_test_support::{CountingSubscriber, FlakySubscriber};

fn make_record(user_id: UserId, version: i64) -> StoredEventRecord {
    StoredEventRecord {
        event_id: Uuid::new_v4(),
        entity_type: EntityType::Alert,
        user_id,
        aggregate_id: AggregateId::from("AMD"),
        version,
        event_type: "alert.created".to_owned(),
        payload: serde_json::json!({"type": "alert.created", "ticker": "AMD"}),
        occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    }
}

fn fast_retries() -> OutboxConfig {
    OutboxConfig {
        max_attempts: 3,
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        queue_capacity: 16,
    }
}

#[tokio::test]
async fn delivers_each_batch_to_every_subscriber() {
    // Arrange
    let first = Arc::new(CountingSubscriber::new("search-indexer"));
    let second = Arc::new(CountingSubscriber::new("notifier"));
    let outbox = Outbox::new(vec![
        Arc::clone(&first) as Arc<dyn EventSubscriber>,
        Arc::clone(&second) as Arc<dyn EventSubscriber>,
    ]);
    let user_id = UserId::new();
    let records = vec![make_record(user_id, 1), make_record(user_id, 2)];

    // Act
    outbox.publish(&records).await.unwrap();
    outbox.flush().await;

    // Assert
    let expected: Vec<Uuid> = records.iter().map(|r| r.event_id).collect();
    assert_eq!(first.received(), expected);
    assert_eq!(second.received(), expected);
    assert!(outbox.dead_letters().is_empty());
}

#[tokio::test]
async fn subscriber_that_crashes_once_still_receives_the_batch() {
    // A downstream consumer that fails its first delivery and recovers must
    // eventually observe every event — at-least-once.
    let flaky = Arc::new(FlakySubscriber::new("projection-builder", 1));
    let outbox = Outbox::with_config(
        vec![Arc::clone(&flaky) as Arc<dyn EventSubscriber>],
        fast_retries(),
    );
    let user_id = UserId::new();
    let records = vec![make_record(user_id, 1)];

    outbox.publish(&records).await.unwrap();
    outbox.flush().await;

    assert_eq!(flaky.attempts(), 2, "one failure, one successful retry");
    assert_eq!(flaky.received(), vec![records[0].event_id]);
    assert!(outbox.dead_letters().is_empty());
}

#[tokio::test]
async fn exhausted_retries_dead_letter_the_batch() {
    let broken = Arc::new(FlakySubscriber::new("broken-indexer", u32::MAX));
    let outbox = Outbox::with_config(
        vec![Arc::clone(&broken) as Arc<dyn EventSubscriber>],
        fast_retries(),
    );
    let user_id = UserId::new();
    let records = vec![make_record(user_id, 1)];

    outbox.publish(&records).await.unwrap();
    outbox.flush().await;

    assert_eq!(broken.attempts(), 3);
    let dead = outbox.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].subscriber, "broken-indexer");
    assert_eq!(dead[0].events.len(), 1);
    assert_eq!(dead[0].events[0].event_id, records[0].event_id);
}

#[tokio::test]
async fn successful_subscribers_are_not_reinvoked_during_retries() {
    let healthy = Arc::new(CountingSubscriber::new("healthy"));
    let flaky = Arc::new(FlakySubscriber::new("flaky", 1));
    let outbox = Outbox::with_config(
        vec![
            Arc::clone(&healthy) as Arc<dyn EventSubscriber>,
            Arc::clone(&flaky) as Arc<dyn EventSubscriber>,
        ],
        fast_retries(),
    );
    let user_id = UserId::new();
    let records = vec![make_record(user_id, 1)];

    outbox.publish(&records).await.unwrap();
    outbox.flush().await;

    // The healthy subscriber saw the batch exactly once even though the
    // flaky one forced a retry round.
    assert_eq!(healthy.received().len(), 1);
    assert_eq!(flaky.attempts(), 2);
}

#[tokio::test]
async fn empty_batch_is_ignored() {
    let subscriber = Arc::new(CountingSubscriber::new("indexer"));
    let outbox = Outbox::new(vec![Arc::clone(&subscriber) as Arc<dyn EventSubscriber>]);

    outbox.publish(&[]).await.unwrap();
    outbox.flush().await;

    assert!(subscriber.received().is_empty());
}

#[tokio::test]
async fn shutdown_drains_queued_batches() {
    let subscriber = Arc::new(CountingSubscriber::new("indexer"));
    let outbox = Outbox::new(vec![Arc::clone(&subscriber) as Arc<dyn EventSubscriber>]);
    let user_id = UserId::new();
    let records = vec![make_record(user_id, 1)];

    outbox.publish(&records).await.unwrap();
    outbox.shutdown().await;

    assert_eq!(subscriber.received(), vec![records[0].event_id]);
}

#[tokio::test]
async fn save_through_store_reaches_recovering_subscriber() {
    // End to end: a save against the store, a subscriber that crashes on the
    // first delivery, and the guarantee that the events still arrive.
    let flaky = Arc::new(FlakySubscriber::new("notifier", 1));
    let outbox = Arc::new(Outbox::with_config(
        vec![Arc::clone(&flaky) as Arc<dyn EventSubscriber>],
        fast_retries(),
    ));
    let store =
        InMemoryAggregateStore::with_publisher(Arc::clone(&outbox) as Arc<dyn EventPublisher>);
    let user_id = UserId::new();
    let records = vec![make_record(user_id, 1)];

    store
        .append_events(
            EntityType::Alert,
            &user_id,
            &AggregateId::from("AMD"),
            0,
            &records,
        )
        .await
        .unwrap();
    outbox.flush().await;

    assert_eq!(flaky.received(), vec![records[0].event_id]);
}
