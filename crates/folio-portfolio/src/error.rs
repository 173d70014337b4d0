//! Portfolio error type.

use thiserror::Error;

use folio_core::error::StorageError;

/// Errors surfaced by portfolio aggregates and storage.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// A storage failure, propagated untouched.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A command precondition was violated.
    #[error("validation error: {0}")]
    Validation(String),
}
