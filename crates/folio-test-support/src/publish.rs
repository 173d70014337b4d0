//! Test publishers and subscribers for outbox and store wiring.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use folio_core::error::StorageError;
use folio_core::publish::{EventPublisher, EventSubscriber, SubscriberError};
use folio_core::store::StoredEventRecord;

/// A publisher that records every batch handed to it and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<Vec<StoredEventRecord>>>,
}

impl RecordingPublisher {
    /// Creates an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<Vec<StoredEventRecord>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, events: &[StoredEventRecord]) -> Result<(), StorageError> {
        self.batches.lock().unwrap().push(events.to_vec());
        Ok(())
    }
}

/// A subscriber that fails its first `failures` attempts and succeeds
/// afterwards. Simulates a downstream consumer that crashes mid-delivery and
/// recovers.
#[derive(Debug)]
pub struct FlakySubscriber {
    name: String,
    failures: u32,
    attempts: AtomicU32,
    received: Mutex<Vec<Uuid>>,
}

impl FlakySubscriber {
    /// Creates a subscriber that fails the first `failures` deliveries.
    #[must_use]
    pub fn new(name: impl Into<String>, failures: u32) -> Self {
        Self {
            name: name.into(),
            failures,
            attempts: AtomicU32::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Total delivery attempts observed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Event ids from successfully handled batches, in delivery order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn received(&self) -> Vec<Uuid> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSubscriber for FlakySubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_events(&self, events: &[StoredEventRecord]) -> Result<(), SubscriberError> {
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        if attempt <= self.failures {
            return Err(format!("simulated crash on attempt {attempt}").into());
        }
        let mut received = self.received.lock().unwrap();
        received.extend(events.iter().map(|record| record.event_id));
        Ok(())
    }
}

/// A subscriber that always succeeds and records what it saw.
#[derive(Debug, Default)]
pub struct CountingSubscriber {
    name: String,
    received: Mutex<Vec<Uuid>>,
}

impl CountingSubscriber {
    /// Creates a counting subscriber.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Event ids from handled batches, in delivery order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn received(&self) -> Vec<Uuid> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSubscriber for CountingSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle_events(&self, events: &[StoredEventRecord]) -> Result<(), SubscriberError> {
        let mut received = self.received.lock().unwrap();
        received.extend(events.iter().map(|record| record.event_id));
        Ok(())
    }
}
