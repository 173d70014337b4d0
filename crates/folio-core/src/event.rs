//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{AggregateId, UserId};

/// Metadata attached to every domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier. Downstream consumers dedupe on this.
    pub event_id: Uuid,
    /// Aggregate/stream this event belongs to.
    pub aggregate_id: AggregateId,
    /// Owner of the stream.
    pub user_id: UserId,
    /// Position within the aggregate's stream, starting at 1.
    pub version: i64,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the stable event tag (used for serialization routing).
    ///
    /// Tags are explicit dotted strings such as `stock.purchased`, never Rust
    /// type names, so that renaming or moving a type cannot orphan stored
    /// history.
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    fn to_payload(&self) -> serde_json::Value;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;
}
