//! Domain events for the alerts context.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use folio_core::event::{DomainEvent, EventMetadata};

/// Which side of the threshold fires the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    /// Fire when the price rises above the threshold.
    Above,
    /// Fire when the price falls below the threshold.
    Below,
}

/// Emitted when an alert is created for a ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCreated {
    /// Ticker symbol the alert watches.
    pub ticker: String,
    /// Which side of the threshold fires.
    pub direction: AlertDirection,
    /// Price threshold.
    pub threshold: Decimal,
}

/// Emitted when the alert's threshold is moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholdChanged {
    /// The new price threshold.
    pub threshold: Decimal,
}

/// Emitted when the watched price crosses the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertTriggered {
    /// The price that crossed the threshold.
    pub price: Decimal,
}

/// Event payload variants for price alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlertEventKind {
    /// An alert was created.
    #[serde(rename = "alert.created")]
    Created(AlertCreated),
    /// The threshold was moved.
    #[serde(rename = "alert.threshold_changed")]
    ThresholdChanged(AlertThresholdChanged),
    /// The price crossed the threshold.
    #[serde(rename = "alert.triggered")]
    Triggered(AlertTriggered),
}

impl AlertEventKind {
    pub(crate) const fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "alert.created",
            Self::ThresholdChanged(_) => "alert.threshold_changed",
            Self::Triggered(_) => "alert.triggered",
        }
    }
}

/// Domain event envelope for price alerts.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: AlertEventKind,
}

impl DomainEvent for AlertEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("AlertEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
