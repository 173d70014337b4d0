//! Portfolio storage — position-specific queries over the aggregate store.
//!
//! Lookups read the owner's whole entity-type stream and group it by
//! aggregate id; storage-engine simplicity is traded for read amplification,
//! which is fine at personal-portfolio event counts.

use std::sync::Arc;

use folio_core::aggregate::{AggregateRoot, group_by_aggregate};
use folio_core::ids::{AggregateId, EntityType, UserId};
use folio_core::store::{
    AggregateStore, StoredEventRecord, decode_kind, metadata_from_record, pending_records,
};

use crate::domain::aggregates::{OwnedCrypto, OwnedOption, OwnedStock};
use crate::domain::events::{CryptoEvent, OptionEvent, StockEvent};
use crate::error::PortfolioError;

/// Repository for stock, option and crypto positions.
#[derive(Clone)]
pub struct PortfolioStorage {
    store: Arc<dyn AggregateStore>,
}

fn stock_from_records(
    user_id: UserId,
    id: &AggregateId,
    records: &[StoredEventRecord],
) -> Result<OwnedStock, PortfolioError> {
    let mut stock = OwnedStock::new(id.as_str(), user_id);
    for record in records {
        let event = StockEvent {
            metadata: metadata_from_record(record),
            kind: decode_kind(record)?,
        };
        stock.apply(&event);
    }
    Ok(stock)
}

fn option_from_records(
    user_id: UserId,
    id: &AggregateId,
    records: &[StoredEventRecord],
) -> Result<OwnedOption, PortfolioError> {
    let mut option = OwnedOption::new(id.as_str(), user_id);
    for record in records {
        let event = OptionEvent {
            metadata: metadata_from_record(record),
            kind: decode_kind(record)?,
        };
        option.apply(&event);
    }
    Ok(option)
}

fn crypto_from_records(
    user_id: UserId,
    id: &AggregateId,
    records: &[StoredEventRecord],
) -> Result<OwnedCrypto, PortfolioError> {
    let mut crypto = OwnedCrypto::new(id.as_str(), user_id);
    for record in records {
        let event = CryptoEvent {
            metadata: metadata_from_record(record),
            kind: decode_kind(record)?,
        };
        crypto.apply(&event);
    }
    Ok(crypto)
}

impl PortfolioStorage {
    /// Creates a repository over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    async fn records_for(
        &self,
        entity_type: EntityType,
        user_id: &UserId,
    ) -> Result<Vec<StoredEventRecord>, PortfolioError> {
        Ok(self.store.stored_events(entity_type, user_id).await?)
    }

    /// Replays one stock position, or `None` if the user has no events for
    /// that ticker.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn stock(
        &self,
        ticker: &str,
        user_id: &UserId,
    ) -> Result<Option<OwnedStock>, PortfolioError> {
        let id = AggregateId::from(ticker);
        let records: Vec<StoredEventRecord> = self
            .records_for(EntityType::OwnedStock, user_id)
            .await?
            .into_iter()
            .filter(|record| record.aggregate_id == id)
            .collect();
        if records.is_empty() {
            return Ok(None);
        }
        stock_from_records(*user_id, &id, &records).map(Some)
    }

    /// Replays every stock position the user owns.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn stocks(&self, user_id: &UserId) -> Result<Vec<OwnedStock>, PortfolioError> {
        let records = self.records_for(EntityType::OwnedStock, user_id).await?;
        group_by_aggregate(records)
            .iter()
            .map(|(id, group)| stock_from_records(*user_id, id, group))
            .collect()
    }

    /// Appends the position's pending events and marks them committed.
    ///
    /// Saving a position with no pending events is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates storage failures; a version conflict means another writer
    /// saved this ticker first and the load-mutate-save cycle should be
    /// retried.
    pub async fn save_stock(&self, stock: &mut OwnedStock) -> Result<(), PortfolioError> {
        let records = pending_records(stock, EntityType::OwnedStock);
        if records.is_empty() {
            return Ok(());
        }
        let user_id = stock.user_id();
        self.store
            .append_events(
                EntityType::OwnedStock,
                &user_id,
                stock.aggregate_id(),
                stock.version(),
                &records,
            )
            .await?;
        stock.mark_committed();
        Ok(())
    }

    /// Deletes every event for one stock position.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn delete_stock(&self, ticker: &str, user_id: &UserId) -> Result<(), PortfolioError> {
        self.store
            .delete_aggregate(EntityType::OwnedStock, &AggregateId::from(ticker), user_id)
            .await?;
        Ok(())
    }

    /// Replays one option position, or `None` if the user has no events for
    /// that ticker.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn option(
        &self,
        ticker: &str,
        user_id: &UserId,
    ) -> Result<Option<OwnedOption>, PortfolioError> {
        let id = AggregateId::from(ticker);
        let records: Vec<StoredEventRecord> = self
            .records_for(EntityType::OwnedOption, user_id)
            .await?
            .into_iter()
            .filter(|record| record.aggregate_id == id)
            .collect();
        if records.is_empty() {
            return Ok(None);
        }
        option_from_records(*user_id, &id, &records).map(Some)
    }

    /// Replays every option position the user owns.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn options(&self, user_id: &UserId) -> Result<Vec<OwnedOption>, PortfolioError> {
        let records = self.records_for(EntityType::OwnedOption, user_id).await?;
        group_by_aggregate(records)
            .iter()
            .map(|(id, group)| option_from_records(*user_id, id, group))
            .collect()
    }

    /// Appends the position's pending events and marks them committed.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn save_option(&self, option: &mut OwnedOption) -> Result<(), PortfolioError> {
        let records = pending_records(option, EntityType::OwnedOption);
        if records.is_empty() {
            return Ok(());
        }
        let user_id = option.user_id();
        self.store
            .append_events(
                EntityType::OwnedOption,
                &user_id,
                option.aggregate_id(),
                option.version(),
                &records,
            )
            .await?;
        option.mark_committed();
        Ok(())
    }

    /// Deletes every event for one option position.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn delete_option(
        &self,
        ticker: &str,
        user_id: &UserId,
    ) -> Result<(), PortfolioError> {
        self.store
            .delete_aggregate(EntityType::OwnedOption, &AggregateId::from(ticker), user_id)
            .await?;
        Ok(())
    }

    /// Replays one crypto holding, or `None` if the user has no events for
    /// that token.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn crypto(
        &self,
        token: &str,
        user_id: &UserId,
    ) -> Result<Option<OwnedCrypto>, PortfolioError> {
        let id = AggregateId::from(token);
        let records: Vec<StoredEventRecord> = self
            .records_for(EntityType::OwnedCrypto, user_id)
            .await?
            .into_iter()
            .filter(|record| record.aggregate_id == id)
            .collect();
        if records.is_empty() {
            return Ok(None);
        }
        crypto_from_records(*user_id, &id, &records).map(Some)
    }

    /// Replays every crypto holding the user owns.
    ///
    /// # Errors
    ///
    /// Propagates storage and deserialization failures.
    pub async fn cryptos(&self, user_id: &UserId) -> Result<Vec<OwnedCrypto>, PortfolioError> {
        let records = self.records_for(EntityType::OwnedCrypto, user_id).await?;
        group_by_aggregate(records)
            .iter()
            .map(|(id, group)| crypto_from_records(*user_id, id, group))
            .collect()
    }

    /// Appends the holding's pending events and marks them committed.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn save_crypto(&self, crypto: &mut OwnedCrypto) -> Result<(), PortfolioError> {
        let records = pending_records(crypto, EntityType::OwnedCrypto);
        if records.is_empty() {
            return Ok(());
        }
        let user_id = crypto.user_id();
        self.store
            .append_events(
                EntityType::OwnedCrypto,
                &user_id,
                crypto.aggregate_id(),
                crypto.version(),
                &records,
            )
            .await?;
        crypto.mark_committed();
        Ok(())
    }

    /// Deletes every event for one crypto holding.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn delete_crypto(&self, token: &str, user_id: &UserId) -> Result<(), PortfolioError> {
        self.store
            .delete_aggregate(EntityType::OwnedCrypto, &AggregateId::from(token), user_id)
            .await?;
        Ok(())
    }

    /// Deletes the user's entire portfolio across all position types.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn delete_all(&self, user_id: &UserId) -> Result<(), PortfolioError> {
        for entity_type in [
            EntityType::OwnedStock,
            EntityType::OwnedOption,
            EntityType::OwnedCrypto,
        ] {
            self.store.delete_aggregates(entity_type, user_id).await?;
        }
        tracing::debug!(%user_id, "portfolio deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::PortfolioStorage;
    use crate::domain::aggregates::OwnedStock;
    use folio_core::aggregate::AggregateRoot;
    use crate::error::PortfolioError;
    use folio_core::error::StorageError;
    use folio_core::ids::UserId;
    use folio_event_store::memory::InMemoryAggregateStore;
    use folio_test_support::{FailingAggregateStore, FixedClock};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn storage() -> PortfolioStorage {
        PortfolioStorage::new(Arc::new(InMemoryAggregateStore::new()))
    }

    #[tokio::test]
    async fn purchase_save_reload_accumulates_cost_basis() {
        // Arrange
        let storage = storage();
        let user_id = UserId::new();
        let clock = clock();

        // Act: first purchase, save at version 1.
        let mut stock = OwnedStock::new("AMD", user_id);
        stock
            .purchase(dec("10"), dec("2.10"), None, &clock)
            .unwrap();
        storage.save_stock(&mut stock).await.unwrap();
        assert_eq!(stock.version(), 1);

        // Assert: reload shows the derived state.
        let mut stock = storage.stock("AMD", &user_id).await.unwrap().unwrap();
        assert_eq!(stock.shares_owned(), dec("10"));
        assert_eq!(stock.cost_basis(), dec("21.00"));

        // Act: second purchase, save at version 2, reload.
        stock
            .purchase(dec("5"), dec("2.00"), None, &clock)
            .unwrap();
        storage.save_stock(&mut stock).await.unwrap();
        assert_eq!(stock.version(), 2);

        let stock = storage.stock("AMD", &user_id).await.unwrap().unwrap();
        assert_eq!(stock.shares_owned(), dec("15"));
        assert_eq!(stock.cost_basis(), dec("31.00"));

        // Act: delete the position.
        storage.delete_stock("AMD", &user_id).await.unwrap();

        // Assert: the aggregate is gone.
        assert!(storage.stock("AMD", &user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_ticker_loads_as_none() {
        let storage = storage();
        let user_id = UserId::new();

        let stock = storage.stock("AMD", &user_id).await.unwrap();

        assert!(stock.is_none());
    }

    #[tokio::test]
    async fn stocks_groups_interleaved_tickers_into_separate_positions() {
        let storage = storage();
        let user_id = UserId::new();
        let clock = clock();

        let mut amd = OwnedStock::new("AMD", user_id);
        amd.purchase(dec("10"), dec("2.10"), None, &clock).unwrap();
        storage.save_stock(&mut amd).await.unwrap();

        let mut msft = OwnedStock::new("MSFT", user_id);
        msft.purchase(dec("3"), dec("100"), None, &clock).unwrap();
        storage.save_stock(&mut msft).await.unwrap();

        amd.purchase(dec("5"), dec("2.00"), None, &clock).unwrap();
        storage.save_stock(&mut amd).await.unwrap();

        let stocks = storage.stocks(&user_id).await.unwrap();

        assert_eq!(stocks.len(), 2);
        assert_eq!(stocks[0].ticker(), "AMD");
        assert_eq!(stocks[0].shares_owned(), dec("15"));
        assert_eq!(stocks[1].ticker(), "MSFT");
        assert_eq!(stocks[1].shares_owned(), dec("3"));
    }

    #[tokio::test]
    async fn save_with_no_pending_events_is_a_noop() {
        let storage = storage();
        let user_id = UserId::new();
        let clock = clock();

        let mut stock = OwnedStock::new("AMD", user_id);
        stock
            .purchase(dec("10"), dec("2.10"), None, &clock)
            .unwrap();
        storage.save_stock(&mut stock).await.unwrap();

        // Nothing pending; save must not append or bump the version.
        storage.save_stock(&mut stock).await.unwrap();
        assert_eq!(stock.version(), 1);

        let reloaded = storage.stock("AMD", &user_id).await.unwrap().unwrap();
        assert_eq!(reloaded.version(), 1);
    }

    #[tokio::test]
    async fn stale_writer_gets_a_version_conflict() {
        let storage = storage();
        let user_id = UserId::new();
        let clock = clock();

        let mut stock = OwnedStock::new("AMD", user_id);
        stock
            .purchase(dec("10"), dec("2.10"), None, &clock)
            .unwrap();
        storage.save_stock(&mut stock).await.unwrap();

        // Two copies loaded at version 1; both try to save.
        let mut first = storage.stock("AMD", &user_id).await.unwrap().unwrap();
        let mut second = storage.stock("AMD", &user_id).await.unwrap().unwrap();

        first.purchase(dec("1"), dec("2.00"), None, &clock).unwrap();
        storage.save_stock(&mut first).await.unwrap();

        second.purchase(dec("2"), dec("2.00"), None, &clock).unwrap();
        let result = storage.save_stock(&mut second).await;

        match result {
            Err(PortfolioError::Storage(StorageError::VersionConflict {
                expected, actual, ..
            })) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected VersionConflict, got {other:?}"),
        }

        // The loser retries the cycle and succeeds.
        let mut retried = storage.stock("AMD", &user_id).await.unwrap().unwrap();
        retried
            .purchase(dec("2"), dec("2.00"), None, &clock)
            .unwrap();
        storage.save_stock(&mut retried).await.unwrap();
        assert_eq!(retried.version(), 3);
    }

    #[tokio::test]
    async fn unavailable_store_propagates_untouched() {
        let storage = PortfolioStorage::new(Arc::new(FailingAggregateStore));
        let user_id = UserId::new();

        let result = storage.stock("AMD", &user_id).await;

        assert!(matches!(
            result,
            Err(PortfolioError::Storage(StorageError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn delete_all_wipes_every_position_type() {
        let storage = storage();
        let user_id = UserId::new();
        let clock = clock();

        let mut stock = OwnedStock::new("AMD", user_id);
        stock
            .purchase(dec("10"), dec("2.10"), None, &clock)
            .unwrap();
        storage.save_stock(&mut stock).await.unwrap();

        let mut crypto = crate::domain::aggregates::OwnedCrypto::new("BTC", user_id);
        crypto.purchase(dec("0.1"), dec("5000"), &clock).unwrap();
        storage.save_crypto(&mut crypto).await.unwrap();

        storage.delete_all(&user_id).await.unwrap();

        assert!(storage.stocks(&user_id).await.unwrap().is_empty());
        assert!(storage.cryptos(&user_id).await.unwrap().is_empty());
    }
}
