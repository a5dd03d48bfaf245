//! A metastore that supports nothing.
//!
//! Useful as a base for partial backends and in tests that assert
//! graceful handling of missing capabilities: override what you support,
//! inherit `Unsupported` for the rest. Catalog-wide listings return
//! [`Enumeration::Unsupported`] rather than an error, since declining to
//! enumerate is a documented capability signal, not a failure.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::contract::{AcidTransaction, Enumeration, Metastore, StatisticsTransform};
use crate::database::{Database, Principal};
use crate::error::{MetastoreError, Result};
use crate::filter::TupleDomain;
use crate::function::LanguageFunction;
use crate::partition::{Partition, PartitionWithStatistics};
use crate::privilege::{
    PrincipalPrivileges, Privilege, PrivilegeGrant, RoleGrant, RolePairOutcome,
};
use crate::statistics::{ColumnStatisticKind, PartitionStatistics};
use crate::table::{Column, RelationType, SchemaTableName, Table};

/// Metastore rejecting every operation with `Unsupported`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedMetastore;

fn unsupported<T>(operation: &'static str) -> Result<T> {
    Err(MetastoreError::Unsupported { operation })
}

#[async_trait]
impl Metastore for UnimplementedMetastore {
    async fn get_database(&self, _database_name: &str) -> Result<Option<Database>> {
        unsupported("get_database")
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        unsupported("list_databases")
    }

    async fn create_database(&self, _database: Database) -> Result<()> {
        unsupported("create_database")
    }

    async fn drop_database(&self, _database_name: &str, _delete_data: bool) -> Result<()> {
        unsupported("drop_database")
    }

    async fn rename_database(
        &self,
        _database_name: &str,
        _new_database_name: &str,
    ) -> Result<()> {
        unsupported("rename_database")
    }

    async fn set_database_owner(&self, _database_name: &str, _owner: Principal) -> Result<()> {
        unsupported("set_database_owner")
    }

    async fn get_table(&self, _database_name: &str, _table_name: &str) -> Result<Option<Table>> {
        unsupported("get_table")
    }

    async fn get_tables(&self, _database_name: &str) -> Result<Vec<String>> {
        unsupported("get_tables")
    }

    async fn get_all_tables(&self) -> Result<Enumeration<SchemaTableName>> {
        Ok(Enumeration::Unsupported)
    }

    async fn get_relation_types(
        &self,
        _database_name: &str,
    ) -> Result<BTreeMap<String, RelationType>> {
        unsupported("get_relation_types")
    }

    async fn get_all_relation_types(
        &self,
    ) -> Result<Enumeration<(SchemaTableName, RelationType)>> {
        Ok(Enumeration::Unsupported)
    }

    async fn get_tables_with_parameter(
        &self,
        _database_name: &str,
        _key: &str,
        _value: &str,
    ) -> Result<Vec<String>> {
        unsupported("get_tables_with_parameter")
    }

    async fn get_views(&self, _database_name: &str) -> Result<Vec<String>> {
        unsupported("get_views")
    }

    async fn get_all_views(&self) -> Result<Enumeration<SchemaTableName>> {
        Ok(Enumeration::Unsupported)
    }

    async fn create_table(&self, _table: Table, _privileges: PrincipalPrivileges) -> Result<()> {
        unsupported("create_table")
    }

    async fn drop_table(
        &self,
        _database_name: &str,
        _table_name: &str,
        _delete_data: bool,
    ) -> Result<()> {
        unsupported("drop_table")
    }

    async fn replace_table(
        &self,
        _database_name: &str,
        _table_name: &str,
        _new_table: Table,
        _privileges: PrincipalPrivileges,
    ) -> Result<()> {
        unsupported("replace_table")
    }

    async fn rename_table(
        &self,
        _database_name: &str,
        _table_name: &str,
        _new_database_name: &str,
        _new_table_name: &str,
    ) -> Result<()> {
        unsupported("rename_table")
    }

    async fn comment_table(
        &self,
        _database_name: &str,
        _table_name: &str,
        _comment: Option<String>,
    ) -> Result<()> {
        unsupported("comment_table")
    }

    async fn comment_column(
        &self,
        _database_name: &str,
        _table_name: &str,
        _column_name: &str,
        _comment: Option<String>,
    ) -> Result<()> {
        unsupported("comment_column")
    }

    async fn add_column(
        &self,
        _database_name: &str,
        _table_name: &str,
        _column: Column,
    ) -> Result<()> {
        unsupported("add_column")
    }

    async fn rename_column(
        &self,
        _database_name: &str,
        _table_name: &str,
        _old_column_name: &str,
        _new_column_name: &str,
    ) -> Result<()> {
        unsupported("rename_column")
    }

    async fn drop_column(
        &self,
        _database_name: &str,
        _table_name: &str,
        _column_name: &str,
    ) -> Result<()> {
        unsupported("drop_column")
    }

    async fn set_table_owner(
        &self,
        _database_name: &str,
        _table_name: &str,
        _owner: Principal,
    ) -> Result<()> {
        unsupported("set_table_owner")
    }

    fn supported_column_statistics(&self, _type_name: &str) -> BTreeSet<ColumnStatisticKind> {
        BTreeSet::new()
    }

    async fn get_table_statistics(&self, _table: &Table) -> Result<PartitionStatistics> {
        unsupported("get_table_statistics")
    }

    async fn get_partition_statistics(
        &self,
        _table: &Table,
        _partitions: &[Partition],
    ) -> Result<BTreeMap<String, PartitionStatistics>> {
        unsupported("get_partition_statistics")
    }

    async fn update_table_statistics(
        &self,
        _database_name: &str,
        _table_name: &str,
        _transaction: AcidTransaction,
        _update: StatisticsTransform,
    ) -> Result<()> {
        unsupported("update_table_statistics")
    }

    async fn update_partition_statistics(
        &self,
        _table: &Table,
        _updates: Vec<(String, StatisticsTransform)>,
    ) -> Result<()> {
        unsupported("update_partition_statistics")
    }

    async fn get_partition(
        &self,
        _table: &Table,
        _partition_values: &[String],
    ) -> Result<Option<Partition>> {
        unsupported("get_partition")
    }

    async fn get_partition_names_by_filter(
        &self,
        _database_name: &str,
        _table_name: &str,
        _column_names: &[String],
        _filter: &TupleDomain,
    ) -> Result<Option<Vec<String>>> {
        unsupported("get_partition_names_by_filter")
    }

    async fn get_partitions_by_names(
        &self,
        _table: &Table,
        _partition_names: &[String],
    ) -> Result<BTreeMap<String, Option<Partition>>> {
        unsupported("get_partitions_by_names")
    }

    async fn add_partitions(
        &self,
        _database_name: &str,
        _table_name: &str,
        _partitions: Vec<PartitionWithStatistics>,
    ) -> Result<()> {
        unsupported("add_partitions")
    }

    async fn drop_partition(
        &self,
        _database_name: &str,
        _table_name: &str,
        _partition_values: &[String],
        _delete_data: bool,
    ) -> Result<()> {
        unsupported("drop_partition")
    }

    async fn alter_partition(
        &self,
        _database_name: &str,
        _table_name: &str,
        _partition: PartitionWithStatistics,
    ) -> Result<()> {
        unsupported("alter_partition")
    }

    async fn list_table_privileges(
        &self,
        _database_name: &str,
        _table_name: &str,
        _table_owner: Option<Principal>,
        _principal: Option<Principal>,
    ) -> Result<BTreeSet<(Principal, PrivilegeGrant)>> {
        unsupported("list_table_privileges")
    }

    async fn grant_table_privileges(
        &self,
        _database_name: &str,
        _table_name: &str,
        _grantee: Principal,
        _grantor: Principal,
        _privileges: BTreeSet<Privilege>,
        _grant_option: bool,
    ) -> Result<()> {
        unsupported("grant_table_privileges")
    }

    async fn revoke_table_privileges(
        &self,
        _database_name: &str,
        _table_name: &str,
        _grantee: Principal,
        _grantor: Principal,
        _privileges: BTreeSet<Privilege>,
        _grant_option: bool,
    ) -> Result<()> {
        unsupported("revoke_table_privileges")
    }

    async fn create_role(&self, _role_name: &str, _grantor: &str) -> Result<()> {
        unsupported("create_role")
    }

    async fn drop_role(&self, _role_name: &str) -> Result<()> {
        unsupported("drop_role")
    }

    async fn list_roles(&self) -> Result<BTreeSet<String>> {
        unsupported("list_roles")
    }

    async fn grant_roles(
        &self,
        _roles: &[String],
        _grantees: &[Principal],
        _admin_option: bool,
        _grantor: Principal,
    ) -> Result<Vec<RolePairOutcome>> {
        unsupported("grant_roles")
    }

    async fn revoke_roles(
        &self,
        _roles: &[String],
        _grantees: &[Principal],
        _admin_option: bool,
        _grantor: Principal,
    ) -> Result<Vec<RolePairOutcome>> {
        unsupported("revoke_roles")
    }

    async fn list_role_grants(&self, _principal: &Principal) -> Result<BTreeSet<RoleGrant>> {
        unsupported("list_role_grants")
    }

    async fn function_exists(
        &self,
        _database_name: &str,
        _function_name: &str,
        _signature_token: &str,
    ) -> Result<bool> {
        unsupported("function_exists")
    }

    async fn get_functions(&self, _database_name: &str) -> Result<Vec<LanguageFunction>> {
        unsupported("get_functions")
    }

    async fn get_functions_named(
        &self,
        _database_name: &str,
        _function_name: &str,
    ) -> Result<Vec<LanguageFunction>> {
        unsupported("get_functions_named")
    }

    async fn create_function(
        &self,
        _database_name: &str,
        _function_name: &str,
        _function: LanguageFunction,
    ) -> Result<()> {
        unsupported("create_function")
    }

    async fn replace_function(
        &self,
        _database_name: &str,
        _function_name: &str,
        _function: LanguageFunction,
    ) -> Result<()> {
        unsupported("replace_function")
    }

    async fn drop_function(
        &self,
        _database_name: &str,
        _function_name: &str,
        _signature_token: &str,
    ) -> Result<()> {
        unsupported("drop_function")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operations_report_unsupported() {
        let ms = UnimplementedMetastore;
        let result = ms.get_database("any").await;
        assert!(matches!(
            result,
            Err(MetastoreError::Unsupported { operation: "get_database" })
        ));
    }

    #[tokio::test]
    async fn test_catalog_wide_listings_decline_without_error() {
        let ms = UnimplementedMetastore;
        assert!(ms.get_all_tables().await.unwrap().is_unsupported());
        assert!(ms.get_all_views().await.unwrap().is_unsupported());
        assert!(ms.get_all_relation_types().await.unwrap().is_unsupported());
    }

    #[test]
    fn test_no_column_statistics_supported() {
        let ms = UnimplementedMetastore;
        assert!(ms.supported_column_statistics("bigint").is_empty());
    }
}
