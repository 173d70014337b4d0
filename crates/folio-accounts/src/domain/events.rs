//! Domain events for the accounts context.

use serde::{Deserialize, Serialize};

use folio_core::event::{DomainEvent, EventMetadata};

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    /// The free tier.
    Free,
    /// The paid tier.
    Premium,
}

/// Emitted when an account is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreated {
    /// Email address the account was registered with.
    pub email: String,
    /// Display name shown in the UI.
    pub display_name: String,
}

/// Emitted when the account's email address is verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountVerified {
    /// The verified email address.
    pub email: String,
}

/// Emitted when the account changes subscription tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionChanged {
    /// The new plan.
    pub plan: SubscriptionPlan,
}

/// Event payload variants for user accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AccountEventKind {
    /// The account was created.
    #[serde(rename = "account.created")]
    Created(AccountCreated),
    /// The email address was verified.
    #[serde(rename = "account.verified")]
    Verified(AccountVerified),
    /// The subscription tier changed.
    #[serde(rename = "account.subscription_changed")]
    SubscriptionChanged(SubscriptionChanged),
}

impl AccountEventKind {
    pub(crate) const fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "account.created",
            Self::Verified(_) => "account.verified",
            Self::SubscriptionChanged(_) => "account.subscription_changed",
        }
    }
}

/// Domain event envelope for user accounts.
#[derive(Debug, Clone)]
pub struct AccountEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: AccountEventKind,
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("AccountEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
