//! The metastore contract: the single operation set a query engine
//! consumes for every metadata need.
//!
//! Every `get_*` lookup is polymorphic over "not found": absence is
//! `Ok(None)`, never an error, so callers distinguish "doesn't exist yet"
//! from real failures without exception-style handling. Mutations are
//! synchronous per call and atomic per entity; no partial multi-field
//! update is ever observable by a concurrent reader.
//!
//! Catalog-wide listings carry a capability flag: a backend that cannot
//! enumerate the whole catalog cheaply returns
//! [`Enumeration::Unsupported`], telling the caller to fall back to
//! per-database enumeration. That is not a failure.
//!
//! No operation defines an internal timeout or retry policy; callers
//! treat every call as potentially I/O-bound, and cancellation is only
//! "caller stops waiting" with the backend completing or failing
//! independently.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::database::{Database, Principal};
use crate::error::Result;
use crate::filter::TupleDomain;
use crate::function::LanguageFunction;
use crate::partition::{Partition, PartitionWithStatistics};
use crate::privilege::{
    PrincipalPrivileges, Privilege, PrivilegeGrant, RoleGrant, RolePairOutcome,
};
use crate::statistics::{ColumnStatisticKind, PartitionStatistics};
use crate::table::{Column, RelationType, SchemaTableName, Table};

/// Outcome of a catalog-wide listing.
///
/// Distinguishes "here is the full result" from "this backend cannot
/// enumerate the whole catalog cheaply". An empty `Listed` vec means zero
/// entries and must never be conflated with `Unsupported`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enumeration<T> {
    /// The full catalog-wide result.
    Listed(Vec<T>),
    /// The backend does not support cheap catalog-wide enumeration;
    /// callers should enumerate per database instead.
    Unsupported,
}

impl<T> Enumeration<T> {
    /// Returns the listed entries, or `None` if unsupported.
    #[must_use]
    pub fn into_listed(self) -> Option<Vec<T>> {
        match self {
            Self::Listed(items) => Some(items),
            Self::Unsupported => None,
        }
    }

    /// Returns true if the backend declined to enumerate.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }
}

/// A pure transform from old statistics to new statistics.
///
/// Must have no observable side effects: backends may re-invoke the
/// transform on contention or retry. The increment-in-place pattern
/// ("add N rows") goes through here without exposing a read-modify-write
/// race to the caller.
pub type StatisticsTransform =
    Box<dyn Fn(PartitionStatistics) -> PartitionStatistics + Send + Sync>;

/// Transaction context for statistics updates tied to an atomic
/// multi-step commit.
///
/// Backends without transactional semantics treat this as advisory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcidTransaction {
    /// Transaction identifier, if a transaction is open.
    pub transaction_id: Option<u64>,
    /// Write identifier within the transaction.
    pub write_id: Option<u64>,
}

impl AcidTransaction {
    /// The non-transactional context.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            transaction_id: None,
            write_id: None,
        }
    }
}

/// The full catalog contract.
///
/// Implementations exclusively own all entity state; callers receive
/// immutable snapshots and mutate only through these operations.
#[async_trait]
pub trait Metastore: Send + Sync {
    // === Databases ===

    /// Returns the database, or `None` if absent.
    async fn get_database(&self, database_name: &str) -> Result<Option<Database>>;

    /// Lists all database names.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// Creates a database.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the name is taken.
    async fn create_database(&self, database: Database) -> Result<()>;

    /// Drops a database. With `delete_data`, the database's own location
    /// is removed from storage once the metadata is gone, subject to the
    /// same location-claim rules as `drop_table`.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `InvalidState` if tables still exist;
    /// `SharedLocation` if another entry claims the location.
    async fn drop_database(&self, database_name: &str, delete_data: bool) -> Result<()>;

    /// Renames a database.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `InvalidState` if the new name is occupied.
    async fn rename_database(&self, database_name: &str, new_database_name: &str) -> Result<()>;

    /// Sets the database owner.
    async fn set_database_owner(&self, database_name: &str, owner: Principal) -> Result<()>;

    // === Tables ===

    /// Returns the table, or `None` if absent.
    async fn get_table(&self, database_name: &str, table_name: &str) -> Result<Option<Table>>;

    /// Lists table names in one database. Always succeeds; an unknown
    /// database yields an empty sequence.
    async fn get_tables(&self, database_name: &str) -> Result<Vec<String>>;

    /// Lists every table in the catalog, when the backend can do so
    /// cheaply.
    async fn get_all_tables(&self) -> Result<Enumeration<SchemaTableName>>;

    /// Returns relation kinds for one database's relations.
    async fn get_relation_types(
        &self,
        database_name: &str,
    ) -> Result<BTreeMap<String, RelationType>>;

    /// Returns relation kinds catalog-wide, when supported.
    async fn get_all_relation_types(
        &self,
    ) -> Result<Enumeration<(SchemaTableName, RelationType)>>;

    /// Lists tables in a database whose parameters contain `key=value`.
    async fn get_tables_with_parameter(
        &self,
        database_name: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<String>>;

    /// Lists view names in one database.
    async fn get_views(&self, database_name: &str) -> Result<Vec<String>>;

    /// Lists every view in the catalog, when supported.
    async fn get_all_views(&self) -> Result<Enumeration<SchemaTableName>>;

    /// Creates a table with its initial privilege assignments.
    ///
    /// Managed tables get their location derived from the database root;
    /// external tables record the supplied location verbatim.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` on an occupied name; `NotFound` if the database is
    /// absent; `InvalidState` on location-rule violations.
    async fn create_table(&self, table: Table, privileges: PrincipalPrivileges) -> Result<()>;

    /// Drops a table. With `delete_data`, the physical location is
    /// removed after the metadata, but only when no other catalog entry
    /// claims that location, whether by exact match or by being nested
    /// inside it.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `SharedLocation` if another entry claims
    /// the location; storage failures propagate after the metadata
    /// deletion (which is not rolled back).
    async fn drop_table(
        &self,
        database_name: &str,
        table_name: &str,
        delete_data: bool,
    ) -> Result<()>;

    /// Replaces a table definition in place, keeping its identity.
    async fn replace_table(
        &self,
        database_name: &str,
        table_name: &str,
        new_table: Table,
        privileges: PrincipalPrivileges,
    ) -> Result<()>;

    /// Renames a table, possibly across databases. Metadata-only; data
    /// is never relocated.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent; `InvalidState` if the target name is
    /// occupied or the target database is absent.
    async fn rename_table(
        &self,
        database_name: &str,
        table_name: &str,
        new_database_name: &str,
        new_table_name: &str,
    ) -> Result<()>;

    /// Sets or clears the table comment.
    async fn comment_table(
        &self,
        database_name: &str,
        table_name: &str,
        comment: Option<String>,
    ) -> Result<()>;

    /// Sets or clears a column comment.
    async fn comment_column(
        &self,
        database_name: &str,
        table_name: &str,
        column_name: &str,
        comment: Option<String>,
    ) -> Result<()>;

    /// Adds a column.
    async fn add_column(
        &self,
        database_name: &str,
        table_name: &str,
        column: Column,
    ) -> Result<()>;

    /// Renames a column.
    async fn rename_column(
        &self,
        database_name: &str,
        table_name: &str,
        old_column_name: &str,
        new_column_name: &str,
    ) -> Result<()>;

    /// Drops a column.
    async fn drop_column(
        &self,
        database_name: &str,
        table_name: &str,
        column_name: &str,
    ) -> Result<()>;

    /// Sets the table owner.
    async fn set_table_owner(
        &self,
        database_name: &str,
        table_name: &str,
        owner: Principal,
    ) -> Result<()>;

    // === Statistics ===

    /// Declares which column-statistic kinds this backend supports for a
    /// column type.
    fn supported_column_statistics(&self, type_name: &str) -> BTreeSet<ColumnStatisticKind>;

    /// Returns table-level statistics (possibly empty, never absent).
    async fn get_table_statistics(&self, table: &Table) -> Result<PartitionStatistics>;

    /// Returns statistics for the given partitions, keyed by partition
    /// name. Partitions without recorded statistics map to empty
    /// statistics.
    async fn get_partition_statistics(
        &self,
        table: &Table,
        partitions: &[Partition],
    ) -> Result<BTreeMap<String, PartitionStatistics>>;

    /// Applies a pure transform to the table's statistics under the
    /// per-table serialization guarantee: concurrent updates to the same
    /// table apply one at a time in submission order; different tables
    /// proceed independently.
    async fn update_table_statistics(
        &self,
        database_name: &str,
        table_name: &str,
        transaction: AcidTransaction,
        update: StatisticsTransform,
    ) -> Result<()>;

    /// Applies per-partition transforms, serialized per partition.
    async fn update_partition_statistics(
        &self,
        table: &Table,
        updates: Vec<(String, StatisticsTransform)>,
    ) -> Result<()>;

    // === Partitions ===

    /// Returns the partition with the given value tuple, or `None`.
    async fn get_partition(
        &self,
        table: &Table,
        partition_values: &[String],
    ) -> Result<Option<Partition>>;

    /// Selects partition names matching a conjunctive domain over the
    /// partition key values.
    ///
    /// `Ok(None)` means the predicate cannot be pushed down and the
    /// caller must filter client-side. `Ok(Some(vec![]))` means zero
    /// matching partitions. The two are never conflated.
    async fn get_partition_names_by_filter(
        &self,
        database_name: &str,
        table_name: &str,
        column_names: &[String],
        filter: &TupleDomain,
    ) -> Result<Option<Vec<String>>>;

    /// Resolves partition names to partitions; unknown names map to
    /// `None`.
    async fn get_partitions_by_names(
        &self,
        table: &Table,
        partition_names: &[String],
    ) -> Result<BTreeMap<String, Option<Partition>>>;

    /// Adds partitions with their statistics.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if any value tuple is already present (no partial
    /// application); `InvalidState` on arity mismatch.
    async fn add_partitions(
        &self,
        database_name: &str,
        table_name: &str,
        partitions: Vec<PartitionWithStatistics>,
    ) -> Result<()>;

    /// Drops one partition by value tuple. Same location-ownership rules
    /// as `drop_table`.
    async fn drop_partition(
        &self,
        database_name: &str,
        table_name: &str,
        partition_values: &[String],
        delete_data: bool,
    ) -> Result<()>;

    /// Replaces a partition's metadata and statistics.
    async fn alter_partition(
        &self,
        database_name: &str,
        table_name: &str,
        partition: PartitionWithStatistics,
    ) -> Result<()>;

    // === Privileges and roles ===

    /// Resolves effective privileges for a table, including those implied
    /// by ownership. Filterable to one principal.
    async fn list_table_privileges(
        &self,
        database_name: &str,
        table_name: &str,
        table_owner: Option<Principal>,
        principal: Option<Principal>,
    ) -> Result<BTreeSet<(Principal, PrivilegeGrant)>>;

    /// Grants a set of privileges to one grantee, atomically: all
    /// requested kinds or none.
    async fn grant_table_privileges(
        &self,
        database_name: &str,
        table_name: &str,
        grantee: Principal,
        grantor: Principal,
        privileges: BTreeSet<Privilege>,
        grant_option: bool,
    ) -> Result<()>;

    /// Revokes a set of privileges from one grantee, atomically.
    ///
    /// With `grant_option` set, only the grant option is removed and the
    /// base privilege is kept. Revoking a base privilege always removes
    /// any grant option derived from it.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the grantee never held one of the privileges.
    async fn revoke_table_privileges(
        &self,
        database_name: &str,
        table_name: &str,
        grantee: Principal,
        grantor: Principal,
        privileges: BTreeSet<Privilege>,
        grant_option: bool,
    ) -> Result<()>;

    /// Creates a role.
    async fn create_role(&self, role_name: &str, grantor: &str) -> Result<()>;

    /// Drops a role and every grant of it.
    async fn drop_role(&self, role_name: &str) -> Result<()>;

    /// Lists all role names.
    async fn list_roles(&self) -> Result<BTreeSet<String>>;

    /// Grants every role to every grantee (Cartesian product), atomic per
    /// pair. Returns one outcome per pair; a failed pair never rolls
    /// back the others.
    async fn grant_roles(
        &self,
        roles: &[String],
        grantees: &[Principal],
        admin_option: bool,
        grantor: Principal,
    ) -> Result<Vec<RolePairOutcome>>;

    /// Revokes every role from every grantee, atomic per pair.
    async fn revoke_roles(
        &self,
        roles: &[String],
        grantees: &[Principal],
        admin_option: bool,
        grantor: Principal,
    ) -> Result<Vec<RolePairOutcome>>;

    /// Lists role grants held by a principal.
    async fn list_role_grants(&self, principal: &Principal) -> Result<BTreeSet<RoleGrant>>;

    // === Functions ===

    /// Cheap existence check for one exact function key.
    async fn function_exists(
        &self,
        database_name: &str,
        function_name: &str,
        signature_token: &str,
    ) -> Result<bool>;

    /// Returns all functions in a database, with bodies.
    async fn get_functions(&self, database_name: &str) -> Result<Vec<LanguageFunction>>;

    /// Returns all overloads of one function name, with bodies.
    async fn get_functions_named(
        &self,
        database_name: &str,
        function_name: &str,
    ) -> Result<Vec<LanguageFunction>>;

    /// Creates a function.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the exact `(database, name, signature)` key is
    /// occupied.
    async fn create_function(
        &self,
        database_name: &str,
        function_name: &str,
        function: LanguageFunction,
    ) -> Result<()>;

    /// Creates or replaces a function: idempotent upsert on the exact
    /// key, never failing on existence grounds.
    async fn replace_function(
        &self,
        database_name: &str,
        function_name: &str,
        function: LanguageFunction,
    ) -> Result<()>;

    /// Drops one overload by exact signature token. There is no
    /// drop-all-overloads primitive.
    ///
    /// # Errors
    ///
    /// `NotFound` if the exact key is absent.
    async fn drop_function(
        &self,
        database_name: &str,
        function_name: &str,
        signature_token: &str,
    ) -> Result<()>;
}
