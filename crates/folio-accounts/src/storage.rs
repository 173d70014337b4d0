//! Account storage — account queries plus the login audit list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use folio_core::aggregate::AggregateRoot;
use folio_core::error::StorageError;
use folio_core::ids::{AggregateId, EntityType, UserId};
use folio_core::list::ListStore;
use folio_core::store::{
    AggregateStore, StoredEventRecord, decode_kind, metadata_from_record, pending_records,
};

use crate::domain::aggregates::UserAccount;
use crate::domain::events::AccountEvent;
use crate::error::AccountsError;

/// One login, appended to the user's audit list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRecord {
    /// When the login happened.
    pub at: DateTime<Utc>,
    /// User agent string of the client, when known.
    pub user_agent: Option<String>,
}

/// Repository for user accounts and their login audit.
pub struct AccountStorage {
    store: Arc<dyn AggregateStore>,
    logins: Arc<dyn ListStore>,
}

fn account_from_records(
    user_id: UserId,
    records: &[StoredEventRecord],
) -> Result<UserAccount, AccountsError> {
    let mut account = UserAccount::new(user_id);
    for record in records {
        let event = AccountEvent {
            metadata: metadata_from_record(record),
            kind: decode_kind(record)?,
        };
        account.apply(&event);
    }
    Ok(account)
}

impl AccountStorage {
    /// Creates a repository over the given stores.
    #[must_use]
    pub fn new(store: Arc<dyn AggregateStore>, logins: Arc<dyn ListStore>) -> Self {
        Self { store, logins }
    }

    /// Replays the user's account, or `None` if it has never been created.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn account(&self, user_id: &UserId) -> Result<Option<UserAccount>, AccountsError> {
        let id = AggregateId::from(*user_id);
        let records: Vec<StoredEventRecord> = self
            .store
            .stored_events(EntityType::Account, user_id)
            .await?
            .into_iter()
            .filter(|record| record.aggregate_id == id)
            .collect();
        if records.is_empty() {
            return Ok(None);
        }
        account_from_records(*user_id, &records).map(Some)
    }

    /// Appends the account's pending events and marks them committed.
    ///
    /// Saving an account with no pending events is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn save_account(&self, account: &mut UserAccount) -> Result<(), AccountsError> {
        let records = pending_records(account, EntityType::Account);
        if records.is_empty() {
            return Ok(());
        }
        let user_id = account.user_id();
        self.store
            .append_events(
                EntityType::Account,
                &user_id,
                account.aggregate_id(),
                account.version(),
                &records,
            )
            .await?;
        account.mark_committed();
        Ok(())
    }

    /// Deletes the user's entire account stream.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn delete_account(&self, user_id: &UserId) -> Result<(), AccountsError> {
        self.store
            .delete_aggregates(EntityType::Account, user_id)
            .await?;
        tracing::debug!(%user_id, "account deleted");
        Ok(())
    }

    /// Appends one login to the user's audit list.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn record_login(
        &self,
        user_id: &UserId,
        login: &LoginRecord,
    ) -> Result<(), AccountsError> {
        let entry = serde_json::to_value(login)
            .map_err(|e| StorageError::Serialization(format!("login record: {e}")))?;
        self.logins.push(user_id, entry).await?;
        Ok(())
    }

    /// Returns the user's logins in insertion order.
    ///
    /// # Errors
    ///
    /// Propagates storage failures; a stored entry that does not decode is a
    /// [`StorageError::Serialization`].
    pub async fn logins(&self, user_id: &UserId) -> Result<Vec<LoginRecord>, AccountsError> {
        let entries = self.logins.entries(user_id).await?;
        entries
            .into_iter()
            .map(|entry| {
                serde_json::from_value(entry)
                    .map_err(|e| StorageError::Serialization(format!("login record: {e}")).into())
            })
            .collect()
    }
}
