//! Aggregate roots for the alerts context.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use folio_core::aggregate::AggregateRoot;
use folio_core::clock::Clock;
use folio_core::event::EventMetadata;
use folio_core::ids::{AggregateId, UserId};

use super::events::{
    AlertCreated, AlertDirection, AlertEvent, AlertEventKind, AlertThresholdChanged, AlertTriggered,
};
use crate::error::AlertsError;

/// The aggregate root for a price alert, keyed by ticker.
#[derive(Debug)]
pub struct StockAlert {
    id: AggregateId,
    user_id: UserId,
    version: i64,
    created: bool,
    direction: AlertDirection,
    threshold: Decimal,
    trigger_count: u32,
    last_triggered_at: Option<DateTime<Utc>>,
    last_trigger_price: Option<Decimal>,
    pending_events: Vec<AlertEvent>,
}

impl StockAlert {
    /// Creates an empty alert aggregate for `ticker`.
    #[must_use]
    pub fn new(ticker: &str, user_id: UserId) -> Self {
        Self {
            id: AggregateId::from(ticker),
            user_id,
            version: 0,
            created: false,
            direction: AlertDirection::Above,
            threshold: Decimal::ZERO,
            trigger_count: 0,
            last_triggered_at: None,
            last_trigger_price: None,
            pending_events: Vec::new(),
        }
    }

    /// The ticker symbol the alert watches.
    #[must_use]
    pub fn ticker(&self) -> &str {
        self.id.as_str()
    }

    /// Which side of the threshold fires.
    #[must_use]
    pub fn direction(&self) -> AlertDirection {
        self.direction
    }

    /// Current price threshold.
    #[must_use]
    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// How many times the alert has fired.
    #[must_use]
    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    /// When the alert last fired, if ever.
    #[must_use]
    pub fn last_triggered_at(&self) -> Option<DateTime<Utc>> {
        self.last_triggered_at
    }

    /// The price the alert last fired at, if ever.
    #[must_use]
    pub fn last_trigger_price(&self) -> Option<Decimal> {
        self.last_trigger_price
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_version(&self) -> i64 {
        self.version + self.pending_events.len() as i64 + 1
    }

    fn raise(&mut self, kind: AlertEventKind, clock: &dyn Clock) {
        let event = AlertEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                aggregate_id: self.id.clone(),
                user_id: self.user_id,
                version: self.next_version(),
                occurred_at: clock.now(),
            },
            kind,
        };
        self.pending_events.push(event);
    }

    /// Creates the alert with an initial direction and threshold.
    ///
    /// # Errors
    ///
    /// Returns `AlertsError::Validation` if the alert already exists or the
    /// threshold is not positive.
    pub fn create(
        &mut self,
        direction: AlertDirection,
        threshold: Decimal,
        clock: &dyn Clock,
    ) -> Result<(), AlertsError> {
        if self.created {
            return Err(AlertsError::Validation(format!(
                "alert for {} already exists",
                self.ticker()
            )));
        }
        if threshold <= Decimal::ZERO {
            return Err(AlertsError::Validation(
                "alert threshold must be positive".to_owned(),
            ));
        }
        self.raise(
            AlertEventKind::Created(AlertCreated {
                ticker: self.ticker().to_owned(),
                direction,
                threshold,
            }),
            clock,
        );
        Ok(())
    }

    /// Moves the alert's threshold.
    ///
    /// # Errors
    ///
    /// Returns `AlertsError::Validation` if the alert does not exist yet or
    /// the threshold is not positive.
    pub fn change_threshold(
        &mut self,
        threshold: Decimal,
        clock: &dyn Clock,
    ) -> Result<(), AlertsError> {
        if !self.created {
            return Err(AlertsError::Validation(format!(
                "no alert exists for {}",
                self.ticker()
            )));
        }
        if threshold <= Decimal::ZERO {
            return Err(AlertsError::Validation(
                "alert threshold must be positive".to_owned(),
            ));
        }
        self.raise(
            AlertEventKind::ThresholdChanged(AlertThresholdChanged { threshold }),
            clock,
        );
        Ok(())
    }

    /// Records that the watched price crossed the threshold.
    ///
    /// # Errors
    ///
    /// Returns `AlertsError::Validation` if the alert does not exist yet.
    pub fn trigger(&mut self, price: Decimal, clock: &dyn Clock) -> Result<(), AlertsError> {
        if !self.created {
            return Err(AlertsError::Validation(format!(
                "no alert exists for {}",
                self.ticker()
            )));
        }
        self.raise(AlertEventKind::Triggered(AlertTriggered { price }), clock);
        Ok(())
    }
}

impl AggregateRoot for StockAlert {
    type Event = AlertEvent;

    fn aggregate_id(&self) -> &AggregateId {
        &self.id
    }

    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            AlertEventKind::Created(payload) => {
                self.created = true;
                self.direction = payload.direction;
                self.threshold = payload.threshold;
            }
            AlertEventKind::ThresholdChanged(payload) => {
                self.threshold = payload.threshold;
            }
            AlertEventKind::Triggered(payload) => {
                self.trigger_count += 1;
                self.last_triggered_at = Some(event.metadata.occurred_at);
                self.last_trigger_price = Some(payload.price);
            }
        }
        self.version += 1;
    }

    fn pending_events(&self) -> &[Self::Event] {
        &self.pending_events
    }

    fn take_pending(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.pending_events)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use folio_core::event::DomainEvent;
    use folio_test_support::FixedClock;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    #[test]
    fn create_raises_alert_created_with_version_one() {
        // Arrange
        let user_id = UserId::new();
        let mut alert = StockAlert::new("AMD", user_id);
        let clock = clock();

        // Act
        alert
            .create(AlertDirection::Above, dec("150"), &clock)
            .unwrap();

        // Assert
        let events = alert.pending_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "alert.created");
        assert_eq!(events[0].metadata.version, 1);

        alert.mark_committed();
        assert_eq!(alert.threshold(), dec("150"));
        assert_eq!(alert.direction(), AlertDirection::Above);
    }

    #[test]
    fn create_twice_is_rejected() {
        let user_id = UserId::new();
        let mut alert = StockAlert::new("AMD", user_id);
        let clock = clock();
        alert
            .create(AlertDirection::Above, dec("150"), &clock)
            .unwrap();
        alert.mark_committed();

        let result = alert.create(AlertDirection::Below, dec("100"), &clock);

        assert!(matches!(result, Err(AlertsError::Validation(_))));
    }

    #[test]
    fn trigger_before_create_is_rejected() {
        let user_id = UserId::new();
        let mut alert = StockAlert::new("AMD", user_id);
        let clock = clock();

        let result = alert.trigger(dec("151"), &clock);

        assert!(matches!(result, Err(AlertsError::Validation(_))));
    }

    #[test]
    fn triggering_updates_count_price_and_timestamp() {
        let user_id = UserId::new();
        let mut alert = StockAlert::new("AMD", user_id);
        let clock = clock();
        alert
            .create(AlertDirection::Above, dec("150"), &clock)
            .unwrap();
        alert.mark_committed();

        alert.trigger(dec("151.25"), &clock).unwrap();
        alert.mark_committed();

        assert_eq!(alert.trigger_count(), 1);
        assert_eq!(alert.last_trigger_price(), Some(dec("151.25")));
        assert_eq!(alert.last_triggered_at(), Some(clock.0));
        assert_eq!(alert.version(), 2);
    }
}
