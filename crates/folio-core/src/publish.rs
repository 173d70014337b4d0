//! Publisher and subscriber boundaries for newly committed events.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::store::StoredEventRecord;

/// Error type subscribers report delivery failures with.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Receives batches of freshly committed events from the store.
///
/// The aggregate store calls this once per successful non-empty append, after
/// the append is durable. The outbox is the production implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hands a batch of newly stored events over for downstream delivery.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the batch could not be
    /// accepted at all (e.g. the outbox worker has shut down). Downstream
    /// delivery failures are not reported here; they are retried and
    /// dead-lettered inside the publisher.
    async fn publish(&self, events: &[StoredEventRecord]) -> Result<(), StorageError>;
}

/// A downstream consumer of committed events (search indexer, notification
/// sender, projection builder).
///
/// Delivery is at-least-once: implementations must be idempotent, keyed by
/// `event_id`.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Stable name used in logs and dead-letter bookkeeping.
    fn name(&self) -> &str;

    /// Processes one batch of committed events.
    ///
    /// # Errors
    ///
    /// Any error causes the batch to be retried for this subscriber.
    async fn handle_events(&self, events: &[StoredEventRecord]) -> Result<(), SubscriberError>;
}

/// Publisher that discards every batch. Wired into stores that have no
/// downstream consumers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

#[async_trait]
impl EventPublisher for NullPublisher {
    async fn publish(&self, _events: &[StoredEventRecord]) -> Result<(), StorageError> {
        Ok(())
    }
}
