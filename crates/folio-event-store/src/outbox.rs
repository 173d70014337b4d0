//! Outbox — at-least-once delivery of committed events to subscribers.
//!
//! Stores hand freshly committed batches to [`Outbox::publish`], which
//! enqueues them and returns; a background worker delivers each batch to
//! every registered subscriber, retrying failures with exponential backoff.
//! A batch that exhausts its attempts for a subscriber is dead-lettered and
//! logged, never silently dropped. Delivery outcomes are invisible to the
//! append path: a slow or failing subscriber degrades to retries, not to
//! failed saves.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use folio_core::error::StorageError;
use folio_core::publish::{EventPublisher, EventSubscriber};
use folio_core::store::StoredEventRecord;

/// Delivery tuning for the outbox worker.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Delivery attempts per subscriber before a batch is dead-lettered.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles per attempt.
    pub base_backoff: Duration,
    /// Upper bound on the backoff between retries.
    pub max_backoff: Duration,
    /// Bounded queue depth between the append path and the worker.
    pub queue_capacity: usize,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(5),
            queue_capacity: 256,
        }
    }
}

/// A batch that could not be delivered to one subscriber within the
/// configured attempts.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// Subscriber that kept failing.
    pub subscriber: String,
    /// The undelivered events.
    pub events: Vec<StoredEventRecord>,
    /// The final delivery error.
    pub error: String,
}

/// At-least-once event delivery to registered subscribers.
pub struct Outbox {
    sender: mpsc::Sender<Vec<StoredEventRecord>>,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
    worker: JoinHandle<()>,
}

impl Outbox {
    /// Spawns an outbox worker delivering to `subscribers` with default
    /// tuning.
    #[must_use]
    pub fn new(subscribers: Vec<Arc<dyn EventSubscriber>>) -> Self {
        Self::with_config(subscribers, OutboxConfig::default())
    }

    /// Spawns an outbox worker delivering to `subscribers`.
    #[must_use]
    pub fn with_config(subscribers: Vec<Arc<dyn EventSubscriber>>, config: OutboxConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let pending = Arc::new(AtomicUsize::new(0));
        let drained = Arc::new(Notify::new());
        let dead_letters = Arc::new(Mutex::new(Vec::new()));

        let worker = tokio::spawn(run_worker(
            receiver,
            subscribers,
            config,
            Arc::clone(&pending),
            Arc::clone(&drained),
            Arc::clone(&dead_letters),
        ));

        Self {
            sender,
            pending,
            drained,
            dead_letters,
            worker,
        }
    }

    /// Waits until every enqueued batch has finished delivery (or been
    /// dead-lettered). Used by graceful shutdown and deterministic tests.
    pub async fn flush(&self) {
        while self.pending.load(Ordering::Acquire) > 0 {
            let notified = self.drained.notified();
            if self.pending.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }
    }

    /// Drains the queue and stops the worker.
    pub async fn shutdown(self) {
        self.flush().await;
        let Self { sender, worker, .. } = self;
        drop(sender);
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "outbox worker did not shut down cleanly");
        }
    }

    /// Returns the batches that exhausted their delivery attempts.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for Outbox {
    async fn publish(&self, events: &[StoredEventRecord]) -> Result<(), StorageError> {
        if events.is_empty() {
            return Ok(());
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(events.to_vec()).await.is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(StorageError::Unavailable(
                "outbox worker has shut down".to_owned(),
            ));
        }
        Ok(())
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Vec<StoredEventRecord>>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
    config: OutboxConfig,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
) {
    while let Some(batch) = receiver.recv().await {
        deliver_batch(&subscribers, &config, &dead_letters, &batch).await;
        if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            drained.notify_waiters();
        }
    }
}

async fn deliver_batch(
    subscribers: &[Arc<dyn EventSubscriber>],
    config: &OutboxConfig,
    dead_letters: &Mutex<Vec<DeadLetter>>,
    batch: &[StoredEventRecord],
) {
    // Subscribers that already succeeded are not re-invoked on later
    // attempts; at-least-once still holds because consumers dedupe on
    // event_id.
    let mut remaining: Vec<&Arc<dyn EventSubscriber>> = subscribers.iter().collect();
    let mut backoff = config.base_backoff;

    for attempt in 1..=config.max_attempts {
        let mut failed = Vec::new();

        for subscriber in remaining {
            match subscriber.handle_events(batch).await {
                Ok(()) => {}
                Err(e) if attempt == config.max_attempts => {
                    tracing::error!(
                        subscriber = subscriber.name(),
                        attempts = attempt,
                        events = batch.len(),
                        error = %e,
                        "outbox delivery exhausted retries; dead-lettering batch"
                    );
                    dead_letters
                        .lock()
                        .expect("dead-letter lock poisoned")
                        .push(DeadLetter {
                            subscriber: subscriber.name().to_owned(),
                            events: batch.to_vec(),
                            error: e.to_string(),
                        });
                }
                Err(e) => {
                    tracing::warn!(
                        subscriber = subscriber.name(),
                        attempt,
                        error = %e,
                        "outbox delivery failed; retrying with backoff"
                    );
                    failed.push(subscriber);
                }
            }
        }

        if failed.is_empty() {
            return;
        }
        remaining = failed;

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(config.max_backoff);
    }
}
