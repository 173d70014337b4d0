//! Folio Event Store — backing stores and the outbox.
//!
//! Two implementations of the storage contracts defined in `folio-core`: an
//! in-memory backend for tests and local development, and a
//! PostgreSQL-backed one for production. The outbox lives here too, since it
//! is infrastructure the stores notify after a durable append.

pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod schema;
