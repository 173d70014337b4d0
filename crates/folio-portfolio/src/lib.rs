//! Folio Portfolio — owned stock, option and crypto positions.
//!
//! Positions are event-sourced aggregates keyed by ticker within an owner's
//! stream; [`storage::PortfolioStorage`] wraps the generic aggregate store
//! with position-specific queries.

pub mod domain;
pub mod error;
pub mod storage;
