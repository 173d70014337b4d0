//! Aggregate roots for the portfolio context.
//!
//! Each position derives its state purely from its event stream: command
//! methods validate against current state and raise events into the pending
//! list; `apply` folds one event into state during replay and commit.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use folio_core::aggregate::AggregateRoot;
use folio_core::clock::Clock;
use folio_core::event::EventMetadata;
use folio_core::ids::{AggregateId, UserId};

use super::events::{
    CryptoEvent, CryptoEventKind, CryptoPurchased, CryptoSold, OptionClosed, OptionEvent,
    OptionEventKind, OptionExpired, OptionOpened, OptionType, StockEvent, StockEventKind,
    StockNotesUpdated, StockPurchased, StockSold,
};
use crate::error::PortfolioError;

fn metadata(
    aggregate_id: &AggregateId,
    user_id: UserId,
    version: i64,
    clock: &dyn Clock,
) -> EventMetadata {
    EventMetadata {
        event_id: Uuid::new_v4(),
        aggregate_id: aggregate_id.clone(),
        user_id,
        version,
        occurred_at: clock.now(),
    }
}

/// The aggregate root for a stock position, keyed by ticker.
#[derive(Debug)]
pub struct OwnedStock {
    id: AggregateId,
    user_id: UserId,
    version: i64,
    shares_owned: Decimal,
    cost_basis: Decimal,
    realized_profit: Decimal,
    notes: Option<String>,
    pending_events: Vec<StockEvent>,
}

impl OwnedStock {
    /// Creates an empty position for `ticker`.
    #[must_use]
    pub fn new(ticker: &str, user_id: UserId) -> Self {
        Self {
            id: AggregateId::from(ticker),
            user_id,
            version: 0,
            shares_owned: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            realized_profit: Decimal::ZERO,
            notes: None,
            pending_events: Vec::new(),
        }
    }

    /// The ticker symbol this position is keyed by.
    #[must_use]
    pub fn ticker(&self) -> &str {
        self.id.as_str()
    }

    /// Shares currently owned.
    #[must_use]
    pub fn shares_owned(&self) -> Decimal {
        self.shares_owned
    }

    /// Total cost of the open position (average-cost method).
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.cost_basis
    }

    /// Profit realized by sales so far.
    #[must_use]
    pub fn realized_profit(&self) -> Decimal {
        self.realized_profit
    }

    /// Average cost per share, or `None` while no shares are owned.
    #[must_use]
    pub fn average_cost(&self) -> Option<Decimal> {
        if self.shares_owned.is_zero() {
            None
        } else {
            Some(self.cost_basis / self.shares_owned)
        }
    }

    /// Current notes on the position.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns the version the next raised event will carry.
    #[allow(clippy::cast_possible_wrap)]
    fn next_version(&self) -> i64 {
        self.version + self.pending_events.len() as i64 + 1
    }

    fn raise(&mut self, kind: StockEventKind, clock: &dyn Clock) {
        let event = StockEvent {
            metadata: metadata(&self.id, self.user_id, self.next_version(), clock),
            kind,
        };
        self.pending_events.push(event);
    }

    /// Records a purchase of `quantity` shares at `price` each.
    ///
    /// # Errors
    ///
    /// Returns `PortfolioError::Validation` if the quantity is not positive
    /// or the price is negative.
    pub fn purchase(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        notes: Option<String>,
        clock: &dyn Clock,
    ) -> Result<(), PortfolioError> {
        if quantity <= Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "purchase quantity must be positive".to_owned(),
            ));
        }
        if price < Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "purchase price cannot be negative".to_owned(),
            ));
        }
        self.raise(
            StockEventKind::Purchased(StockPurchased {
                ticker: self.ticker().to_owned(),
                quantity,
                price,
                notes,
            }),
            clock,
        );
        Ok(())
    }

    /// Records a sale of `quantity` shares at `price` each.
    ///
    /// # Errors
    ///
    /// Returns `PortfolioError::Validation` if the quantity is not positive,
    /// the price is negative, or more shares are sold than owned.
    pub fn sell(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        notes: Option<String>,
        clock: &dyn Clock,
    ) -> Result<(), PortfolioError> {
        if quantity <= Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "sale quantity must be positive".to_owned(),
            ));
        }
        if price < Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "sale price cannot be negative".to_owned(),
            ));
        }
        if quantity > self.shares_owned {
            return Err(PortfolioError::Validation(format!(
                "cannot sell {quantity} shares of {}: only {} owned",
                self.ticker(),
                self.shares_owned
            )));
        }
        self.raise(
            StockEventKind::Sold(StockSold {
                ticker: self.ticker().to_owned(),
                quantity,
                price,
                notes,
            }),
            clock,
        );
        Ok(())
    }

    /// Replaces the notes on the position.
    pub fn update_notes(&mut self, notes: String, clock: &dyn Clock) {
        self.raise(
            StockEventKind::NotesUpdated(StockNotesUpdated { notes }),
            clock,
        );
    }
}

impl AggregateRoot for OwnedStock {
    type Event = StockEvent;

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
            StockEventKind::Purchased(payload) => {
                self.shares_owned += payload.quantity;
                self.cost_basis += payload.quantity * payload.price;
                if let Some(notes) = &payload.notes {
                    self.notes = Some(notes.clone());
                }
            }
            StockEventKind::Sold(payload) => {
                // Average-cost method: the sold shares release their share of
                // the open cost basis, the rest is realized profit or loss.
                let average = if self.shares_owned.is_zero() {
                    Decimal::ZERO
                } else {
                    self.cost_basis / self.shares_owned
                };
                let released = payload.quantity * average;
                self.realized_profit += payload.quantity * payload.price - released;
                self.cost_basis -= released;
                self.shares_owned -= payload.quantity;
            }
            StockEventKind::NotesUpdated(payload) => {
                self.notes = Some(payload.notes.clone());
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

/// The aggregate root for an option position, keyed by ticker.
#[derive(Debug)]
pub struct OwnedOption {
    id: AggregateId,
    user_id: UserId,
    version: i64,
    option_type: Option<OptionType>,
    strike: Decimal,
    expires_on: Option<NaiveDate>,
    open_contracts: u32,
    net_premium: Decimal,
    pending_events: Vec<OptionEvent>,
}

impl OwnedOption {
    /// Creates an empty option position for `ticker`.
    #[must_use]
    pub fn new(ticker: &str, user_id: UserId) -> Self {
        Self {
            id: AggregateId::from(ticker),
            user_id,
            version: 0,
            option_type: None,
            strike: Decimal::ZERO,
            expires_on: None,
            open_contracts: 0,
            net_premium: Decimal::ZERO,
            pending_events: Vec::new(),
        }
    }

    /// The ticker symbol of the underlying.
    #[must_use]
    pub fn ticker(&self) -> &str {
        self.id.as_str()
    }

    /// Call or put, once the position has been opened.
    #[must_use]
    pub fn option_type(&self) -> Option<OptionType> {
        self.option_type
    }

    /// Strike price per share.
    #[must_use]
    pub fn strike(&self) -> Decimal {
        self.strike
    }

    /// Expiration date, once the position has been opened.
    #[must_use]
    pub fn expires_on(&self) -> Option<NaiveDate> {
        self.expires_on
    }

    /// Contracts currently open.
    #[must_use]
    pub fn open_contracts(&self) -> u32 {
        self.open_contracts
    }

    /// Premium received minus premium paid across the position's life.
    #[must_use]
    pub fn net_premium(&self) -> Decimal {
        self.net_premium
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_version(&self) -> i64 {
        self.version + self.pending_events.len() as i64 + 1
    }

    fn raise(&mut self, kind: OptionEventKind, clock: &dyn Clock) {
        let event = OptionEvent {
            metadata: metadata(&self.id, self.user_id, self.next_version(), clock),
            kind,
        };
        self.pending_events.push(event);
    }

    /// Opens `contracts` contracts at `strike`, paying `premium` in total.
    ///
    /// # Errors
    ///
    /// Returns `PortfolioError::Validation` if no contracts are opened or the
    /// premium is negative.
    pub fn open(
        &mut self,
        option_type: OptionType,
        strike: Decimal,
        contracts: u32,
        premium: Decimal,
        expires_on: NaiveDate,
        clock: &dyn Clock,
    ) -> Result<(), PortfolioError> {
        if contracts == 0 {
            return Err(PortfolioError::Validation(
                "must open at least one contract".to_owned(),
            ));
        }
        if premium < Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "premium cannot be negative".to_owned(),
            ));
        }
        self.raise(
            OptionEventKind::Opened(OptionOpened {
                ticker: self.ticker().to_owned(),
                option_type,
                strike,
                contracts,
                premium,
                expires_on,
            }),
            clock,
        );
        Ok(())
    }

    /// Closes `contracts` contracts, receiving `premium` in total.
    ///
    /// # Errors
    ///
    /// Returns `PortfolioError::Validation` if more contracts are closed than
    /// are open.
    pub fn close(
        &mut self,
        contracts: u32,
        premium: Decimal,
        clock: &dyn Clock,
    ) -> Result<(), PortfolioError> {
        if contracts == 0 || contracts > self.open_contracts {
            return Err(PortfolioError::Validation(format!(
                "cannot close {contracts} contracts of {}: {} open",
                self.ticker(),
                self.open_contracts
            )));
        }
        self.raise(
            OptionEventKind::Closed(OptionClosed { contracts, premium }),
            clock,
        );
        Ok(())
    }

    /// Expires all remaining open contracts worthless.
    ///
    /// # Errors
    ///
    /// Returns `PortfolioError::Validation` if no contracts are open.
    pub fn expire(&mut self, clock: &dyn Clock) -> Result<(), PortfolioError> {
        if self.open_contracts == 0 {
            return Err(PortfolioError::Validation(format!(
                "no open contracts of {} to expire",
                self.ticker()
            )));
        }
        self.raise(
            OptionEventKind::Expired(OptionExpired {
                contracts: self.open_contracts,
            }),
            clock,
        );
        Ok(())
    }
}

impl AggregateRoot for OwnedOption {
    type Event = OptionEvent;

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
            OptionEventKind::Opened(payload) => {
                self.option_type = Some(payload.option_type);
                self.strike = payload.strike;
                self.expires_on = Some(payload.expires_on);
                self.open_contracts += payload.contracts;
                self.net_premium -= payload.premium;
            }
            OptionEventKind::Closed(payload) => {
                self.open_contracts = self.open_contracts.saturating_sub(payload.contracts);
                self.net_premium += payload.premium;
            }
            OptionEventKind::Expired(payload) => {
                self.open_contracts = self.open_contracts.saturating_sub(payload.contracts);
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

/// The aggregate root for a crypto holding, keyed by token symbol.
#[derive(Debug)]
pub struct OwnedCrypto {
    id: AggregateId,
    user_id: UserId,
    version: i64,
    quantity_held: Decimal,
    invested: Decimal,
    realized_profit: Decimal,
    pending_events: Vec<CryptoEvent>,
}

impl OwnedCrypto {
    /// Creates an empty holding for `token`.
    #[must_use]
    pub fn new(token: &str, user_id: UserId) -> Self {
        Self {
            id: AggregateId::from(token),
            user_id,
            version: 0,
            quantity_held: Decimal::ZERO,
            invested: Decimal::ZERO,
            realized_profit: Decimal::ZERO,
            pending_events: Vec::new(),
        }
    }

    /// The token symbol this holding is keyed by.
    #[must_use]
    pub fn token(&self) -> &str {
        self.id.as_str()
    }

    /// Tokens currently held.
    #[must_use]
    pub fn quantity_held(&self) -> Decimal {
        self.quantity_held
    }

    /// Dollars invested in the open holding (average-cost method).
    #[must_use]
    pub fn invested(&self) -> Decimal {
        self.invested
    }

    /// Profit realized by sales so far.
    #[must_use]
    pub fn realized_profit(&self) -> Decimal {
        self.realized_profit
    }

    #[allow(clippy::cast_possible_wrap)]
    fn next_version(&self) -> i64 {
        self.version + self.pending_events.len() as i64 + 1
    }

    fn raise(&mut self, kind: CryptoEventKind, clock: &dyn Clock) {
        let event = CryptoEvent {
            metadata: metadata(&self.id, self.user_id, self.next_version(), clock),
            kind,
        };
        self.pending_events.push(event);
    }

    /// Records a purchase of `quantity` tokens for `dollar_amount`.
    ///
    /// # Errors
    ///
    /// Returns `PortfolioError::Validation` if the quantity is not positive
    /// or the dollar amount is negative.
    pub fn purchase(
        &mut self,
        quantity: Decimal,
        dollar_amount: Decimal,
        clock: &dyn Clock,
    ) -> Result<(), PortfolioError> {
        if quantity <= Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "purchase quantity must be positive".to_owned(),
            ));
        }
        if dollar_amount < Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "purchase amount cannot be negative".to_owned(),
            ));
        }
        self.raise(
            CryptoEventKind::Purchased(CryptoPurchased {
                token: self.token().to_owned(),
                quantity,
                dollar_amount,
            }),
            clock,
        );
        Ok(())
    }

    /// Records a sale of `quantity` tokens for `dollar_amount`.
    ///
    /// # Errors
    ///
    /// Returns `PortfolioError::Validation` if the quantity is not positive,
    /// the dollar amount is negative, or more tokens are sold than held.
    pub fn sell(
        &mut self,
        quantity: Decimal,
        dollar_amount: Decimal,
        clock: &dyn Clock,
    ) -> Result<(), PortfolioError> {
        if quantity <= Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "sale quantity must be positive".to_owned(),
            ));
        }
        if dollar_amount < Decimal::ZERO {
            return Err(PortfolioError::Validation(
                "sale amount cannot be negative".to_owned(),
            ));
        }
        if quantity > self.quantity_held {
            return Err(PortfolioError::Validation(format!(
                "cannot sell {quantity} {}: only {} held",
                self.token(),
                self.quantity_held
            )));
        }
        self.raise(
            CryptoEventKind::Sold(CryptoSold {
                token: self.token().to_owned(),
                quantity,
                dollar_amount,
            }),
            clock,
        );
        Ok(())
    }
}

impl AggregateRoot for OwnedCrypto {
    type Event = CryptoEvent;

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
            CryptoEventKind::Purchased(payload) => {
                self.quantity_held += payload.quantity;
                self.invested += payload.dollar_amount;
            }
            CryptoEventKind::Sold(payload) => {
                let average = if self.quantity_held.is_zero() {
                    Decimal::ZERO
                } else {
                    self.invested / self.quantity_held
                };
                let released = payload.quantity * average;
                self.realized_profit += payload.dollar_amount - released;
                self.invested -= released;
                self.quantity_held -= payload.quantity;
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
