//! # corral-metastore
//!
//! The catalog contract a data-lake query engine consumes from its
//! metadata store, plus a reference in-memory backend.
//!
//! This crate covers:
//!
//! - **Entity Model**: Databases, tables, partitions, statistics,
//!   privileges, roles, and user-defined functions
//! - **Metastore Contract**: The full operation surface as a single
//!   object-safe async trait ([`Metastore`])
//! - **Storage Lifecycle**: Location resolution for managed/external
//!   tables and location-aware deletion on drop
//! - **Partition Filtering**: Predicate pushdown over partition key values
//! - **Statistics Merging**: Transform-based updates serialized per entity
//!
//! ## Consistency Contract
//!
//! The backing store is the single source of truth. Callers receive
//! immutable snapshots; every mutation goes through a contract operation
//! and either fully applies or fails atomically. Drop operations delete
//! metadata first and only then attempt physical cleanup, so an orphaned
//! location can outlive its catalog entry but a catalog entry never points
//! at storage the catalog already released.
//!
//! ## Example
//!
//! ```rust,ignore
//! use corral_metastore::prelude::*;
//! use corral_core::MemoryBackend;
//! use std::sync::Arc;
//!
//! let metastore = InMemoryMetastore::new(Arc::new(MemoryBackend::new()));
//! metastore.create_database(Database::new("sales")).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod contract;
pub mod database;
pub mod error;
pub mod filter;
pub mod function;
pub mod location;
pub mod memory;
pub mod merger;
pub mod partition;
pub mod privilege;
pub mod statistics;
pub mod table;
pub mod unimplemented;

// Re-export main types at crate root
pub use contract::{AcidTransaction, Enumeration, Metastore, StatisticsTransform};
pub use database::{Database, Principal, PrincipalKind};
pub use error::{MetastoreError, Result};
pub use filter::{Bound, Domain, TupleDomain};
pub use function::LanguageFunction;
pub use memory::InMemoryMetastore;
pub use merger::EntityLockRegistry;
pub use partition::{Partition, PartitionWithStatistics};
pub use privilege::{
    PrincipalPrivileges, Privilege, PrivilegeGrant, RoleGrant, RolePairOutcome,
};
pub use statistics::{
    supported_column_statistics, BasicStatistics, ColumnStatisticKind, ColumnStatistics,
    PartitionStatistics,
};
pub use table::{
    Column, RelationType, SchemaTableName, StorageDescriptor, Table, TableBuilder, TableType,
    COMMENT_PARAMETER,
};
pub use unimplemented::UnimplementedMetastore;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::contract::{AcidTransaction, Enumeration, Metastore};
    pub use crate::database::{Database, Principal, PrincipalKind};
    pub use crate::error::{MetastoreError, Result};
    pub use crate::filter::{Domain, TupleDomain};
    pub use crate::function::LanguageFunction;
    pub use crate::memory::InMemoryMetastore;
    pub use crate::partition::{Partition, PartitionWithStatistics};
    pub use crate::privilege::{Privilege, RoleGrant};
    pub use crate::statistics::PartitionStatistics;
    pub use crate::table::{Column, SchemaTableName, Table, TableBuilder, TableType};
}
