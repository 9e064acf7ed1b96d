//! Storage error types shared by every backend.

use std::error::Error as StdError;

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend could not be reached or answered with a failure.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable context for the failure.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// An update referenced a row that does not exist.
    #[error("missing record: {what}")]
    Missing {
        /// Description of the row that was expected.
        what: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl StdError + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a missing-record error.
    pub fn missing(what: impl Into<String>) -> Self {
        StorageError::Missing { what: what.into() }
    }
}
