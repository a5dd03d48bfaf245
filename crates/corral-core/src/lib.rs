//! # corral-core
//!
//! Core abstractions shared across the Corral metastore components:
//!
//! - **Storage Backend**: The object-storage contract the catalog consumes
//!   (existence checks and recursive deletes), plus an in-memory backend
//!   for tests
//! - **Partition Names**: Hive-style `col=value/col=value` partition name
//!   encoding with reserved-character escaping
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Structured-logging initialization and span helpers
//!
//! ## Crate Boundary
//!
//! `corral-core` is the only crate allowed to define shared primitives.
//! The metastore crate builds on these and never reaches around them to a
//! concrete storage client.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod partition_name;
pub mod storage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::partition_name::{make_partition_name, parse_partition_name};
    pub use crate::storage::{MemoryBackend, StorageBackend};
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use observability::{init_logging, LogFormat};
pub use partition_name::{make_partition_name, parse_partition_name};
pub use storage::{MemoryBackend, StorageBackend};
