//! Alerts storage — alert-specific queries over the aggregate store.

use std::sync::Arc;

use folio_core::aggregate::{AggregateRoot, group_by_aggregate};
use folio_core::ids::{AggregateId, EntityType, UserId};
use folio_core::rewrite::{RewriteChain, TagRename};
use folio_core::store::{
    AggregateStore, StoredEventRecord, decode_kind, metadata_from_record, pending_records,
};

use crate::domain::aggregates::StockAlert;
use crate::domain::events::AlertEvent;
use crate::error::AlertsError;

/// Repository for price alerts.
pub struct AlertsStorage {
    store: Arc<dyn AggregateStore>,
    rewrites: RewriteChain,
}

/// Rewrites for alert events written before the alerts module was split out
/// of the portfolio code. Threshold changes postdate the split, so only the
/// original two tags need renaming.
fn legacy_rewrites() -> RewriteChain {
    RewriteChain::new()
        .with_stage(TagRename::new("pricealert.created", "alert.created"))
        .with_stage(TagRename::new("pricealert.triggered", "alert.triggered"))
}

fn alert_from_records(
    user_id: UserId,
    id: &AggregateId,
    records: &[StoredEventRecord],
) -> Result<StockAlert, AlertsError> {
    let mut alert = StockAlert::new(id.as_str(), user_id);
    for record in records {
        let event = AlertEvent {
            metadata: metadata_from_record(record),
            kind: decode_kind(record)?,
        };
        alert.apply(&event);
    }
    Ok(alert)
}

impl AlertsStorage {
    /// Creates a repository over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self {
            store,
            rewrites: legacy_rewrites(),
        }
    }

    async fn rewritten_records(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<StoredEventRecord>, AlertsError> {
        let records = self
            .store
            .stored_events(EntityType::Alert, user_id)
            .await?;
        records
            .into_iter()
            .map(|record| self.rewrites.apply(record).map_err(AlertsError::from))
            .collect()
    }

    /// Replays one alert, or `None` if the user has no alert events for that
    /// ticker.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn alert(
        &self,
        ticker: &str,
        user_id: &UserId,
    ) -> Result<Option<StockAlert>, AlertsError> {
        let id = AggregateId::from(ticker);
        let records: Vec<StoredEventRecord> = self
            .rewritten_records(user_id)
            .await?
            .into_iter()
            .filter(|record| record.aggregate_id == id)
            .collect();
        if records.is_empty() {
            return Ok(None);
        }
        alert_from_records(*user_id, &id, &records).map(Some)
    }

    /// Replays every alert the user has.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn alerts(&self, user_id: &UserId) -> Result<Vec<StockAlert>, AlertsError> {
        let records = self.rewritten_records(user_id).await?;
        group_by_aggregate(records)
            .iter()
            .map(|(id, group)| alert_from_records(*user_id, id, group))
            .collect()
    }

    /// Appends the alert's pending events and marks them committed.
    ///
    /// Saving an alert with no pending events is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn save_alert(&self, alert: &mut StockAlert) -> Result<(), AlertsError> {
        let records = pending_records(alert, EntityType::Alert);
        if records.is_empty() {
            return Ok(());
        }
        let user_id = alert.user_id();
        self.store
            .append_events(
                EntityType::Alert,
                &user_id,
                alert.aggregate_id(),
                alert.version(),
                &records,
            )
            .await?;
        alert.mark_committed();
        Ok(())
    }

    /// Deletes every event for one alert.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn delete_alert(&self, ticker: &str, user_id: &UserId) -> Result<(), AlertsError> {
        self.store
            .delete_aggregate(EntityType::Alert, &AggregateId::from(ticker), user_id)
            .await?;
        Ok(())
    }

    /// Deletes all of the user's alerts.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn delete_all(&self, user_id: &UserId) -> Result<(), AlertsError> {
        self.store
            .delete_aggregates(EntityType::Alert, user_id)
            .await?;
        tracing::debug!(%user_id, "alerts deleted");
        Ok(())
    }
}
