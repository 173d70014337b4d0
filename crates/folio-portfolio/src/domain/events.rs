//! Domain events for the portfolio context.
//!
//! Variant tags are stable storage identifiers, independent of any Rust type
//! name. Renaming a type must never change its tag; a deprecated tag gets a
//! rewrite stage instead.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use folio_core::event::{DomainEvent, EventMetadata};

/// Whether an option contract is a call or a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Right to buy at the strike.
    Call,
    /// Right to sell at the strike.
    Put,
}

/// Emitted when shares of a stock are purchased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPurchased {
    /// Ticker symbol of the position.
    pub ticker: String,
    /// Number of shares bought.
    pub quantity: Decimal,
    /// Price paid per share.
    pub price: Decimal,
    /// Optional free-form note attached to the fill.
    pub notes: Option<String>,
}

/// Emitted when shares of a stock are sold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSold {
    /// Ticker symbol of the position.
    pub ticker: String,
    /// Number of shares sold.
    pub quantity: Decimal,
    /// Price received per share.
    pub price: Decimal,
    /// Optional free-form note attached to the fill.
    pub notes: Option<String>,
}

/// Emitted when the position's notes are replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockNotesUpdated {
    /// The new notes text.
    pub notes: String,
}

/// Event payload variants for owned stock positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StockEventKind {
    /// Shares were purchased.
    #[serde(rename = "stock.purchased")]
    Purchased(StockPurchased),
    /// Shares were sold.
    #[serde(rename = "stock.sold")]
    Sold(StockSold),
    /// The position's notes were replaced.
    #[serde(rename = "stock.notes_updated")]
    NotesUpdated(StockNotesUpdated),
}

impl StockEventKind {
    pub(crate) const fn event_type(&self) -> &'static str {
        match self {
            Self::Purchased(_) => "stock.purchased",
            Self::Sold(_) => "stock.sold",
            Self::NotesUpdated(_) => "stock.notes_updated",
        }
    }
}

/// Domain event envelope for owned stock positions.
#[derive(Debug, Clone)]
pub struct StockEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: StockEventKind,
}

impl DomainEvent for StockEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("StockEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

/// Emitted when an option position is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionOpened {
    /// Ticker symbol of the underlying.
    pub ticker: String,
    /// Call or put.
    pub option_type: OptionType,
    /// Strike price per share.
    pub strike: Decimal,
    /// Number of contracts opened.
    pub contracts: u32,
    /// Total premium paid to open.
    pub premium: Decimal,
    /// Expiration date of the contracts.
    pub expires_on: NaiveDate,
}

/// Emitted when contracts are closed before expiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionClosed {
    /// Number of contracts closed.
    pub contracts: u32,
    /// Total premium received on close.
    pub premium: Decimal,
}

/// Emitted when remaining contracts expire worthless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionExpired {
    /// Number of contracts that expired.
    pub contracts: u32,
}

/// Event payload variants for owned option positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OptionEventKind {
    /// A position was opened.
    #[serde(rename = "option.opened")]
    Opened(OptionOpened),
    /// Contracts were closed.
    #[serde(rename = "option.closed")]
    Closed(OptionClosed),
    /// Remaining contracts expired.
    #[serde(rename = "option.expired")]
    Expired(OptionExpired),
}

impl OptionEventKind {
    pub(crate) const fn event_type(&self) -> &'static str {
        match self {
            Self::Opened(_) => "option.opened",
            Self::Closed(_) => "option.closed",
            Self::Expired(_) => "option.expired",
        }
    }
}

/// Domain event envelope for owned option positions.
#[derive(Debug, Clone)]
pub struct OptionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: OptionEventKind,
}

impl DomainEvent for OptionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("OptionEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

/// Emitted when a crypto token is purchased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoPurchased {
    /// Token symbol of the holding.
    pub token: String,
    /// Quantity of tokens bought.
    pub quantity: Decimal,
    /// Total dollar amount paid.
    pub dollar_amount: Decimal,
}

/// Emitted when a crypto token is sold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoSold {
    /// Token symbol of the holding.
    pub token: String,
    /// Quantity of tokens sold.
    pub quantity: Decimal,
    /// Total dollar amount received.
    pub dollar_amount: Decimal,
}

/// Event payload variants for crypto holdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CryptoEventKind {
    /// Tokens were purchased.
    #[serde(rename = "crypto.purchased")]
    Purchased(CryptoPurchased),
    /// Tokens were sold.
    #[serde(rename = "crypto.sold")]
    Sold(CryptoSold),
}

impl CryptoEventKind {
    pub(crate) const fn event_type(&self) -> &'static str {
        match self {
            Self::Purchased(_) => "crypto.purchased",
            Self::Sold(_) => "crypto.sold",
        }
    }
}

/// Domain event envelope for crypto holdings.
#[derive(Debug, Clone)]
pub struct CryptoEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: CryptoEventKind,
}

impl DomainEvent for CryptoEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("CryptoEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
