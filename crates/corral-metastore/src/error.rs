//! Error taxonomy for metastore operations.
//!
//! Every failure condition is a distinct variant so callers can branch
//! without string inspection. "Entity absent" on lookups is not an error
//! at all: `get_*` operations return `Ok(None)`. The `NotFound` variant
//! exists for mutating operations whose target must already exist.

use thiserror::Error;

/// Result type alias for metastore operations.
pub type Result<T> = std::result::Result<T, MetastoreError>;

/// Errors that can occur during metastore operations.
#[derive(Debug, Error)]
pub enum MetastoreError {
    /// Create on an occupied key (database, table, partition, role,
    /// function). Fails loudly, never silently ignored.
    #[error("{entity} already exists: {name}")]
    AlreadyExists {
        /// The kind of entity (e.g. "table", "function").
        entity: &'static str,
        /// The occupied key.
        name: String,
    },

    /// A mutating operation targeted an entity that does not exist.
    #[error("{entity} not found: {name}")]
    NotFound {
        /// The kind of entity.
        entity: &'static str,
        /// The missing key.
        name: String,
    },

    /// Drop with data deletion refused because another catalog entry
    /// references the same physical location.
    ///
    /// Sharing a location is unsupported; deletion is refused rather than
    /// silently skipped or double-performed.
    #[error("location {location} is referenced by {references} catalog entries, refusing to delete")]
    SharedLocation {
        /// The contested location.
        location: String,
        /// Number of catalog entries referencing it.
        references: usize,
    },

    /// A precondition on existing state was violated: renaming into an
    /// occupied name, dropping a non-empty database, revoking a privilege
    /// that was never granted, partition value arity mismatch.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the violated precondition.
        message: String,
    },

    /// The backend does not implement this operation at all.
    ///
    /// Optional capabilities with a flag in the contract (catalog-wide
    /// listings, filter pushdown) signal absence through their return
    /// shape instead of this error.
    #[error("operation not supported by this metastore: {operation}")]
    Unsupported {
        /// The operation that is unavailable.
        operation: &'static str,
    },

    /// Backend I/O failure (network, disk), propagated unmodified.
    #[error(transparent)]
    Storage(#[from] corral_core::Error),
}

impl MetastoreError {
    /// Creates an invalid-state error with the given message.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a not-found error for the given entity and key.
    #[must_use]
    pub fn not_found(entity: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            name: name.into(),
        }
    }

    /// Creates an already-exists error for the given entity and key.
    #[must_use]
    pub fn already_exists(entity: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            name: name.into(),
        }
    }
}
