//! Folio Accounts — user accounts and login audit.
//!
//! An account is an event-sourced aggregate whose stream is keyed by the
//! user's own id; login history is plain per-user list storage, not event
//! sourcing.

pub mod domain;
pub mod error;
pub mod storage;
