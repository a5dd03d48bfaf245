//! Error types and result aliases for Corral core primitives.
//!
//! These are the shared error shapes used by the storage layer and the
//! partition-name codec. The metastore crate wraps them into its own
//! operation-level taxonomy.

use std::fmt;

/// The result type used throughout `corral-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by Corral core primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A storage operation failed (network, disk, backend-specific).
    ///
    /// Propagated to callers unmodified; this layer neither retries nor
    /// swallows backend I/O failures.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A path or object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a not-found error for the given path.
    #[must_use]
    pub fn not_found(path: impl fmt::Display) -> Self {
        Self::NotFound(path.to_string())
    }
}
