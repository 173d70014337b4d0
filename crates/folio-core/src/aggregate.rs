//! Aggregate root abstraction.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::event::DomainEvent;
use crate::ids::{AggregateId, UserId};
use crate::store::StoredEventRecord;

/// Trait for aggregate roots that reconstitute from event history.
///
/// An aggregate's state is a deterministic fold of its ordered event stream:
/// replay calls [`apply`](Self::apply) once per stored event, and command
/// methods raise new events into the pending list rather than mutating state
/// directly. [`version`](Self::version) counts only persisted events; pending
/// events are folded in by [`mark_committed`](Self::mark_committed) once the
/// store has accepted them.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> &AggregateId;

    /// Returns the owner of this aggregate's stream.
    fn user_id(&self) -> UserId;

    /// Returns the current version (number of persisted events applied).
    fn version(&self) -> i64;

    /// Applies an event, mutating internal state and advancing the version.
    fn apply(&mut self, event: &Self::Event);

    /// Returns events raised since the last load that are not yet persisted.
    fn pending_events(&self) -> &[Self::Event];

    /// Removes and returns the pending events.
    fn take_pending(&mut self) -> Vec<Self::Event>;

    /// Folds the pending events into state after a successful append.
    fn mark_committed(&mut self) {
        for event in self.take_pending() {
            self.apply(&event);
        }
    }
}

/// Splits an owner's full entity-type stream into per-aggregate streams.
///
/// Grouping preserves the order in which each aggregate first appears as well
/// as the version order of the events inside each group. This is the lookup
/// strategy the repositories build on: read the whole owner stream, group by
/// aggregate id, replay each group independently. Cost is O(owner's total
/// event count) per lookup, which is acceptable at personal-portfolio scale;
/// past that, the growth path is a secondary index, not a contract change.
#[must_use]
pub fn group_by_aggregate(
    records: Vec<StoredEventRecord>,
) -> Vec<(AggregateId, Vec<StoredEventRecord>)> {
    let mut order: Vec<AggregateId> = Vec::new();
    let mut groups: HashMap<AggregateId, Vec<StoredEventRecord>> = HashMap::new();

    for record in records {
        match groups.entry(record.aggregate_id.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().push(record),
            Entry::Vacant(entry) => {
                order.push(entry.key().clone());
                entry.insert(vec![record]);
            }
        }
    }

    order
        .into_iter()
        .map(|id| {
            let events = groups.remove(&id).unwrap_or_default();
            (id, events)
        })
        .collect()
}
