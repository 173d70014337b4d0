//! Aggregate roots for the accounts context.

use uuid::Uuid;

use folio_core::aggregate::AggregateRoot;
use folio_core::clock::Clock;
use folio_core::event::EventMetadata;
use folio_core::ids::{AggregateId, UserId};

use super::events::{
    AccountCreated, AccountEvent, AccountEventKind, AccountVerified, SubscriptionChanged,
    SubscriptionPlan,
};
use crate::error::AccountsError;

/// The aggregate root for a user account.
///
/// An account's stream is keyed by the user's own id, so each owner has at
/// most one aggregate of this type.
#[derive(Debug)]
pub struct UserAccount {
    id: AggregateId,
    user_id: UserId,
    version: i64,
    created: bool,
    email: String,
    display_name: String,
    verified: bool,
    plan: SubscriptionPlan,
    pending_events: Vec<AccountEvent>,
}

impl UserAccount {
    /// Creates an empty account aggregate for `user_id`.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: AggregateId::from(user_id),
            user_id,
            version: 0,
            created: false,
            email: String::new(),
            display_name: String::new(),
            verified: false,
            plan: SubscriptionPlan::Free,
            pending_events: Vec::new(),
        }
    }

    /// Email address on the account.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Display name on the account.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the email address has been verified.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Current subscription tier.
    #[must_use]
    pub fn plan(&self) -> SubscriptionPlan {
        self.plan
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_version(&self) -> i64 {
        self.version + self.pending_events.len() as i64 + 1
    }

    fn raise(&mut self, kind: AccountEventKind, clock: &dyn Clock) {
        let event = AccountEvent {
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

    /// Creates the account with its registration details.
    ///
    /// # Errors
    ///
    /// Returns `AccountsError::Validation` if the account already exists or
    /// the email address is obviously malformed.
    pub fn create(
        &mut self,
        email: String,
        display_name: String,
        clock: &dyn Clock,
    ) -> Result<(), AccountsError> {
        if self.created {
            return Err(AccountsError::Validation(
                "account already exists".to_owned(),
            ));
        }
        if !email.contains('@') {
            return Err(AccountsError::Validation(format!(
                "not an email address: {email}"
            )));
        }
        self.raise(
            AccountEventKind::Created(AccountCreated {
                email,
                display_name,
            }),
            clock,
        );
        Ok(())
    }

    /// Marks the account's email address as verified.
    ///
    /// # Errors
    ///
    /// Returns `AccountsError::Validation` if the account does not exist or
    /// is already verified.
    pub fn verify(&mut self, clock: &dyn Clock) -> Result<(), AccountsError> {
        if !self.created {
            return Err(AccountsError::Validation(
                "account does not exist".to_owned(),
            ));
        }
        if self.verified {
            return Err(AccountsError::Validation(
                "account is already verified".to_owned(),
            ));
        }
        self.raise(
            AccountEventKind::Verified(AccountVerified {
                email: self.email.clone(),
            }),
            clock,
        );
        Ok(())
    }

    /// Moves the account to a different subscription tier.
    ///
    /// # Errors
    ///
    /// Returns `AccountsError::Validation` if the account does not exist or
    /// is already on the requested plan.
    pub fn change_subscription(
        &mut self,
        plan: SubscriptionPlan,
        clock: &dyn Clock,
    ) -> Result<(), AccountsError> {
        if !self.created {
            return Err(AccountsError::Validation(
                "account does not exist".to_owned(),
            ));
        }
        if self.plan == plan {
            return Err(AccountsError::Validation(format!(
                "account is already on the {plan:?} plan"
            )));
        }
        self.raise(
            AccountEventKind::SubscriptionChanged(SubscriptionChanged { plan }),
            clock,
        );
        Ok(())
    }
}

impl AggregateRoot for UserAccount {
    type Event = AccountEvent;

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
            AccountEventKind::Created(payload) => {
                self.created = true;
                self.email = payload.email.clone();
                self.display_name = payload.display_name.clone();
            }
            AccountEventKind::Verified(_) => {
                self.verified = true;
            }
            AccountEventKind::SubscriptionChanged(payload) => {
                self.plan = payload.plan;
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

    use super::*;
    use folio_core::event::DomainEvent;
    use folio_test_support::FixedClock;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    #[test]
    fn create_raises_account_created() {
        // Arrange
        let user_id = UserId::new();
        let mut account = UserAccount::new(user_id);
        let clock = clock();

        // Act
        account
            .create("trader@example.com".to_owned(), "Trader".to_owned(), &clock)
            .unwrap();

        // Assert
        let events = account.pending_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "account.created");
        assert_eq!(events[0].metadata.aggregate_id.as_str(), user_id.to_string());

        account.mark_committed();
        assert_eq!(account.email(), "trader@example.com");
        assert_eq!(account.display_name(), "Trader");
        assert!(!account.is_verified());
        assert_eq!(account.plan(), SubscriptionPlan::Free);
    }

    #[test]
    fn create_rejects_malformed_email() {
        let user_id = UserId::new();
        let mut account = UserAccount::new(user_id);

        let result = account.create("not-an-email".to_owned(), "Trader".to_owned(), &clock());

        assert!(matches!(result, Err(AccountsError::Validation(_))));
    }

    #[test]
    fn verify_before_create_is_rejected() {
        let user_id = UserId::new();
        let mut account = UserAccount::new(user_id);

        let result = account.verify(&clock());

        assert!(matches!(result, Err(AccountsError::Validation(_))));
    }

    #[test]
    fn subscription_change_to_same_plan_is_rejected() {
        let user_id = UserId::new();
        let mut account = UserAccount::new(user_id);
        let clock = clock();
        account
            .create("trader@example.com".to_owned(), "Trader".to_owned(), &clock)
            .unwrap();
        account.mark_committed();

        let result = account.change_subscription(SubscriptionPlan::Free, &clock);

        assert!(matches!(result, Err(AccountsError::Validation(_))));
    }

    #[test]
    fn lifecycle_folds_into_expected_state() {
        let user_id = UserId::new();
        let mut account = UserAccount::new(user_id);
        let clock = clock();

        account
            .create("trader@example.com".to_owned(), "Trader".to_owned(), &clock)
            .unwrap();
        account.mark_committed();
        account.verify(&clock).unwrap();
        account.mark_committed();
        account
            .change_subscription(SubscriptionPlan::Premium, &clock)
            .unwrap();
        account.mark_committed();

        assert!(account.is_verified());
        assert_eq!(account.plan(), SubscriptionPlan::Premium);
        assert_eq!(account.version(), 3);
    }
}
