//! Shared test mocks and utilities for the Folio storage core.

mod clock;
mod publish;
mod store;

pub use clock::FixedClock;
pub use publish::{CountingSubscriber, FlakySubscriber, RecordingPublisher};
pub use store::FailingAggregateStore;
