//! In-memory reference backend for the metastore contract.
//!
//! Entity state lives in `RwLock`-guarded maps; physical storage goes
//! through an injected [`StorageBackend`]. Supports every optional
//! capability, so catalog-wide listings always return
//! [`Enumeration::Listed`].
//!
//! Name case rule: database and table names are normalized to ASCII
//! lowercase at the contract boundary. Storage locations are never
//! normalized.
//!
//! Drop ordering: metadata is removed first, then physical deletion is
//! attempted. A physical failure surfaces as an error without rolling
//! back the metadata deletion; the orphaned location can be cleaned up
//! by retrying the delete out of band.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use corral_core::observability::metastore_span;
use corral_core::partition_name::{make_partition_name, parse_partition_name};
use corral_core::StorageBackend;

use crate::contract::{AcidTransaction, Enumeration, Metastore, StatisticsTransform};
use crate::database::{Database, Principal};
use crate::error::{MetastoreError, Result};
use crate::filter::TupleDomain;
use crate::function::LanguageFunction;
use crate::location::{
    count_location_claims, default_partition_location, resolve_table_location,
};
use crate::merger::{partition_entity_key, table_entity_key, EntityLockRegistry};
use crate::partition::{Partition, PartitionWithStatistics};
use crate::privilege::{
    PrincipalPrivileges, Privilege, PrivilegeGrant, RoleGrant, RolePairOutcome,
};
use crate::statistics::{
    supported_column_statistics, ColumnStatisticKind, PartitionStatistics,
};
use crate::table::{Column, RelationType, SchemaTableName, Table, COMMENT_PARAMETER};

/// Full function key: `(database, name, signature_token)`.
type FunctionKey = (String, String, String);

#[derive(Debug, Default)]
struct CatalogState {
    databases: BTreeMap<String, Database>,
    tables: BTreeMap<SchemaTableName, Table>,
    /// Partition name to partition, per table.
    partitions: BTreeMap<SchemaTableName, BTreeMap<String, Partition>>,
    table_statistics: BTreeMap<SchemaTableName, PartitionStatistics>,
    partition_statistics: BTreeMap<SchemaTableName, BTreeMap<String, PartitionStatistics>>,
    /// Grantee -> privilege -> grant, per table.
    privileges: BTreeMap<SchemaTableName, BTreeMap<Principal, BTreeMap<Privilege, PrivilegeGrant>>>,
    /// Role name -> creating grantor.
    roles: BTreeMap<String, String>,
    role_grants: BTreeSet<RoleGrant>,
    functions: BTreeMap<FunctionKey, LanguageFunction>,
}

/// In-memory metastore over an injected object-storage backend.
pub struct InMemoryMetastore {
    state: RwLock<CatalogState>,
    statistics_locks: EntityLockRegistry,
    storage: Arc<dyn StorageBackend>,
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn poisoned() -> MetastoreError {
    MetastoreError::Storage(corral_core::Error::Internal {
        message: "metastore state lock poisoned".into(),
    })
}

impl InMemoryMetastore {
    /// Creates an empty metastore using the given storage backend for
    /// physical lifecycle operations.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            statistics_locks: EntityLockRegistry::new(),
            storage: Arc::clone(&storage),
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, CatalogState>> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, CatalogState>> {
        self.state.write().map_err(|_| poisoned())
    }

    fn table_key(database_name: &str, table_name: &str) -> SchemaTableName {
        SchemaTableName::new(normalize(database_name), normalize(table_name))
    }

    /// Counts claims on `candidate`, exact or nested inside it, from
    /// entries other than the table `exclude` and its own partitions.
    fn foreign_references(
        state: &CatalogState,
        candidate: &str,
        exclude: &SchemaTableName,
    ) -> usize {
        let table_locations = state
            .tables
            .iter()
            .filter(|(key, _)| *key != exclude)
            .map(|(_, table)| table.storage.location.as_str());
        let partition_locations = state
            .partitions
            .iter()
            .filter(|(key, _)| *key != exclude)
            .flat_map(|(_, partitions)| partitions.values())
            .map(|partition| partition.storage.location.as_str());
        count_location_claims(table_locations.chain(partition_locations), candidate)
    }

    /// Locations to physically remove when dropping a table: the table
    /// root plus any partition location living outside it.
    fn doomed_locations(table: &Table, partitions: Option<&BTreeMap<String, Partition>>) -> Vec<String> {
        let root = table.storage.location.clone();
        if root.is_empty() {
            return Vec::new();
        }
        let root_prefix = format!("{}/", root.trim_end_matches('/'));
        let mut locations = vec![root.clone()];
        if let Some(partitions) = partitions {
            for partition in partitions.values() {
                let location = &partition.storage.location;
                if !location.is_empty()
                    && *location != root
                    && !location.starts_with(&root_prefix)
                {
                    locations.push(location.clone());
                }
            }
        }
        locations
    }

    fn partition_name_for(table: &Table, values: &[String]) -> Result<String> {
        let columns = table.partition_column_names();
        if columns.len() != values.len() {
            return Err(MetastoreError::invalid_state(format!(
                "partition of {}.{} has {} values but table declares {} partition columns",
                table.database_name,
                table.table_name,
                values.len(),
                columns.len()
            )));
        }
        make_partition_name(&columns, values).map_err(MetastoreError::Storage)
    }
}

#[async_trait]
impl Metastore for InMemoryMetastore {
    // === Databases ===

    async fn get_database(&self, database_name: &str) -> Result<Option<Database>> {
        let state = self.read_state()?;
        Ok(state.databases.get(&normalize(database_name)).cloned())
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        let state = self.read_state()?;
        Ok(state.databases.keys().cloned().collect())
    }

    async fn create_database(&self, mut database: Database) -> Result<()> {
        let name = normalize(&database.name);
        database.name = name.clone();
        database.created_at = Some(chrono::Utc::now());
        let mut state = self.write_state()?;
        if state.databases.contains_key(&name) {
            return Err(MetastoreError::already_exists("database", name));
        }
        state.databases.insert(name.clone(), database);
        drop(state);
        tracing::info!(database = %name, "created database");
        Ok(())
    }

    async fn drop_database(&self, database_name: &str, delete_data: bool) -> Result<()> {
        let name = normalize(database_name);
        let location = {
            let mut state = self.write_state()?;
            let database = state
                .databases
                .get(&name)
                .ok_or_else(|| MetastoreError::not_found("database", &name))?;
            let table_count = state
                .tables
                .keys()
                .filter(|key| key.database_name == name)
                .count();
            if table_count > 0 {
                return Err(MetastoreError::invalid_state(format!(
                    "database {name} still contains {table_count} tables"
                )));
            }
            let location = database.location.clone();
            if delete_data {
                if let Some(location) = &location {
                    let database_locations = state
                        .databases
                        .iter()
                        .filter(|(other, _)| **other != name)
                        .filter_map(|(_, db)| db.location.as_deref());
                    let table_locations =
                        state.tables.values().map(|t| t.storage.location.as_str());
                    let partition_locations = state
                        .partitions
                        .values()
                        .flat_map(BTreeMap::values)
                        .map(|p| p.storage.location.as_str());
                    let foreign = count_location_claims(
                        database_locations
                            .chain(table_locations)
                            .chain(partition_locations),
                        location,
                    );
                    if foreign > 0 {
                        return Err(MetastoreError::SharedLocation {
                            location: location.clone(),
                            references: foreign + 1,
                        });
                    }
                }
            }
            state.databases.remove(&name);
            state
                .functions
                .retain(|(db, _, _), _| *db != name);
            location
        };
        tracing::info!(database = %name, delete_data, "dropped database");
        if delete_data {
            if let Some(location) = location {
                self.storage.delete_recursive(&location).await?;
            }
        }
        Ok(())
    }

    async fn rename_database(&self, database_name: &str, new_database_name: &str) -> Result<()> {
        let old = normalize(database_name);
        let new = normalize(new_database_name);
        let mut state = self.write_state()?;
        if !state.databases.contains_key(&old) {
            return Err(MetastoreError::not_found("database", &old));
        }
        if state.databases.contains_key(&new) {
            return Err(MetastoreError::invalid_state(format!(
                "cannot rename database {old}: {new} already exists"
            )));
        }
        if let Some(mut database) = state.databases.remove(&old) {
            database.name = new.clone();
            state.databases.insert(new.clone(), database);
        }

        let rekey = |key: &SchemaTableName| {
            SchemaTableName::new(new.clone(), key.table_name.clone())
        };
        let moved: Vec<SchemaTableName> = state
            .tables
            .keys()
            .filter(|key| key.database_name == old)
            .cloned()
            .collect();
        for key in moved {
            let new_key = rekey(&key);
            if let Some(mut table) = state.tables.remove(&key) {
                table.database_name = new.clone();
                state.tables.insert(new_key.clone(), table);
            }
            if let Some(mut partitions) = state.partitions.remove(&key) {
                for partition in partitions.values_mut() {
                    partition.database_name = new.clone();
                }
                state.partitions.insert(new_key.clone(), partitions);
            }
            if let Some(stats) = state.table_statistics.remove(&key) {
                state.table_statistics.insert(new_key.clone(), stats);
            }
            if let Some(stats) = state.partition_statistics.remove(&key) {
                state.partition_statistics.insert(new_key.clone(), stats);
            }
            if let Some(privileges) = state.privileges.remove(&key) {
                state.privileges.insert(new_key, privileges);
            }
        }
        let functions: Vec<(FunctionKey, LanguageFunction)> = state
            .functions
            .iter()
            .filter(|((db, _, _), _)| *db == old)
            .map(|(key, function)| (key.clone(), function.clone()))
            .collect();
        for ((_, fn_name, token), function) in functions {
            state.functions.remove(&(old.clone(), fn_name.clone(), token.clone()));
            state.functions.insert((new.clone(), fn_name, token), function);
        }
        drop(state);
        tracing::info!(database = %old, new_database = %new, "renamed database");
        Ok(())
    }

    async fn set_database_owner(&self, database_name: &str, owner: Principal) -> Result<()> {
        let name = normalize(database_name);
        let mut state = self.write_state()?;
        let database = state
            .databases
            .get_mut(&name)
            .ok_or_else(|| MetastoreError::not_found("database", &name))?;
        database.owner = Some(owner);
        Ok(())
    }

    // === Tables ===

    async fn get_table(&self, database_name: &str, table_name: &str) -> Result<Option<Table>> {
        let state = self.read_state()?;
        Ok(state
            .tables
            .get(&Self::table_key(database_name, table_name))
            .cloned())
    }

    async fn get_tables(&self, database_name: &str) -> Result<Vec<String>> {
        let name = normalize(database_name);
        let state = self.read_state()?;
        Ok(state
            .tables
            .keys()
            .filter(|key| key.database_name == name)
            .map(|key| key.table_name.clone())
            .collect())
    }

    async fn get_all_tables(&self) -> Result<Enumeration<SchemaTableName>> {
        let state = self.read_state()?;
        Ok(Enumeration::Listed(state.tables.keys().cloned().collect()))
    }

    async fn get_relation_types(
        &self,
        database_name: &str,
    ) -> Result<BTreeMap<String, RelationType>> {
        let name = normalize(database_name);
        let state = self.read_state()?;
        Ok(state
            .tables
            .iter()
            .filter(|(key, _)| key.database_name == name)
            .map(|(key, table)| (key.table_name.clone(), RelationType::from(table.table_type)))
            .collect())
    }

    async fn get_all_relation_types(
        &self,
    ) -> Result<Enumeration<(SchemaTableName, RelationType)>> {
        let state = self.read_state()?;
        Ok(Enumeration::Listed(
            state
                .tables
                .iter()
                .map(|(key, table)| (key.clone(), RelationType::from(table.table_type)))
                .collect(),
        ))
    }

    async fn get_tables_with_parameter(
        &self,
        database_name: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<String>> {
        let name = normalize(database_name);
        let state = self.read_state()?;
        Ok(state
            .tables
            .iter()
            .filter(|(table_key, table)| {
                table_key.database_name == name
                    && table.parameters.get(key).is_some_and(|v| v == value)
            })
            .map(|(table_key, _)| table_key.table_name.clone())
            .collect())
    }

    async fn get_views(&self, database_name: &str) -> Result<Vec<String>> {
        let name = normalize(database_name);
        let state = self.read_state()?;
        Ok(state
            .tables
            .iter()
            .filter(|(key, table)| key.database_name == name && table.table_type.is_view())
            .map(|(key, _)| key.table_name.clone())
            .collect())
    }

    async fn get_all_views(&self) -> Result<Enumeration<SchemaTableName>> {
        let state = self.read_state()?;
        Ok(Enumeration::Listed(
            state
                .tables
                .iter()
                .filter(|(_, table)| table.table_type.is_view())
                .map(|(key, _)| key.clone())
                .collect(),
        ))
    }

    async fn create_table(&self, mut table: Table, privileges: PrincipalPrivileges) -> Result<()> {
        table.database_name = normalize(&table.database_name);
        table.table_name = normalize(&table.table_name);
        table.created_at = Some(chrono::Utc::now());
        let key = table.schema_table_name();
        let span = metastore_span("create_table", &key.database_name, &key.table_name);
        let _enter = span.enter();
        let mut state = self.write_state()?;
        let database = state
            .databases
            .get(&table.database_name)
            .ok_or_else(|| MetastoreError::not_found("database", &table.database_name))?;
        if state.tables.contains_key(&key) {
            return Err(MetastoreError::already_exists("table", key.to_string()));
        }
        let explicit = (!table.storage.location.is_empty())
            .then(|| table.storage.location.clone());
        let resolved = resolve_table_location(
            database,
            &table.table_name,
            table.table_type,
            explicit.as_deref(),
        )?;
        table.storage.location = resolved.unwrap_or_default();

        let mut grant_map: BTreeMap<Principal, BTreeMap<Privilege, PrivilegeGrant>> =
            BTreeMap::new();
        for (grantee, grants) in privileges.grants {
            let entry = grant_map.entry(grantee).or_default();
            for grant in grants {
                entry.insert(grant.privilege, grant);
            }
        }
        if !grant_map.is_empty() {
            state.privileges.insert(key.clone(), grant_map);
        }
        let table_type = table.table_type;
        let location = table.storage.location.clone();
        state.tables.insert(key.clone(), table);
        drop(state);
        tracing::info!(
            table = %key,
            table_type = ?table_type,
            location = %location,
            "created table"
        );
        Ok(())
    }

    async fn drop_table(
        &self,
        database_name: &str,
        table_name: &str,
        delete_data: bool,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        // Holding the table's statistics lock keeps an in-flight transform
        // from re-inserting statistics for the dropped entry.
        let _statistics_guard = self
            .statistics_locks
            .acquire(&table_entity_key(&key.database_name, &key.table_name))
            .await;
        let physical = {
            let span = metastore_span("drop_table", &key.database_name, &key.table_name);
            let _enter = span.enter();
            let mut state = self.write_state()?;
            let table = state
                .tables
                .get(&key)
                .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?
                .clone();

            let mut physical = Vec::new();
            if delete_data && !table.table_type.is_view() {
                physical = Self::doomed_locations(&table, state.partitions.get(&key));
                for location in &physical {
                    let foreign = Self::foreign_references(&state, location, &key);
                    if foreign > 0 {
                        return Err(MetastoreError::SharedLocation {
                            location: location.clone(),
                            references: foreign + 1,
                        });
                    }
                }
            }

            state.tables.remove(&key);
            state.partitions.remove(&key);
            state.table_statistics.remove(&key);
            state.partition_statistics.remove(&key);
            state.privileges.remove(&key);
            physical
        };
        tracing::info!(table = %key, delete_data, "dropped table");

        // Metadata is gone; physical cleanup failures surface to the
        // caller without restoring the entry.
        for location in physical {
            self.storage.delete_recursive(&location).await?;
        }
        Ok(())
    }

    async fn replace_table(
        &self,
        database_name: &str,
        table_name: &str,
        mut new_table: Table,
        privileges: PrincipalPrivileges,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        new_table.database_name = key.database_name.clone();
        new_table.table_name = key.table_name.clone();
        let mut state = self.write_state()?;
        let Some(existing) = state.tables.get(&key) else {
            return Err(MetastoreError::not_found("table", key.to_string()));
        };
        new_table.created_at = existing.created_at;
        let mut grant_map: BTreeMap<Principal, BTreeMap<Privilege, PrivilegeGrant>> =
            BTreeMap::new();
        for (grantee, grants) in privileges.grants {
            let entry = grant_map.entry(grantee).or_default();
            for grant in grants {
                entry.insert(grant.privilege, grant);
            }
        }
        state.privileges.remove(&key);
        if !grant_map.is_empty() {
            state.privileges.insert(key.clone(), grant_map);
        }
        state.tables.insert(key.clone(), new_table);
        drop(state);
        tracing::info!(table = %key, "replaced table");
        Ok(())
    }

    async fn rename_table(
        &self,
        database_name: &str,
        table_name: &str,
        new_database_name: &str,
        new_table_name: &str,
    ) -> Result<()> {
        let old_key = Self::table_key(database_name, table_name);
        let new_key = Self::table_key(new_database_name, new_table_name);
        let mut state = self.write_state()?;
        if !state.tables.contains_key(&old_key) {
            return Err(MetastoreError::not_found("table", old_key.to_string()));
        }
        if !state.databases.contains_key(&new_key.database_name) {
            return Err(MetastoreError::not_found(
                "database",
                new_key.database_name.clone(),
            ));
        }
        if state.tables.contains_key(&new_key) {
            return Err(MetastoreError::invalid_state(format!(
                "cannot rename {old_key}: {new_key} already exists"
            )));
        }
        if let Some(mut table) = state.tables.remove(&old_key) {
            table.database_name = new_key.database_name.clone();
            table.table_name = new_key.table_name.clone();
            state.tables.insert(new_key.clone(), table);
        }
        if let Some(mut partitions) = state.partitions.remove(&old_key) {
            for partition in partitions.values_mut() {
                partition.database_name = new_key.database_name.clone();
                partition.table_name = new_key.table_name.clone();
            }
            state.partitions.insert(new_key.clone(), partitions);
        }
        if let Some(stats) = state.table_statistics.remove(&old_key) {
            state.table_statistics.insert(new_key.clone(), stats);
        }
        if let Some(stats) = state.partition_statistics.remove(&old_key) {
            state.partition_statistics.insert(new_key.clone(), stats);
        }
        if let Some(privileges) = state.privileges.remove(&old_key) {
            state.privileges.insert(new_key.clone(), privileges);
        }
        drop(state);
        tracing::info!(table = %old_key, new_table = %new_key, "renamed table");
        Ok(())
    }

    async fn comment_table(
        &self,
        database_name: &str,
        table_name: &str,
        comment: Option<String>,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        let table = state
            .tables
            .get_mut(&key)
            .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?;
        match comment {
            Some(comment) => {
                table.parameters.insert(COMMENT_PARAMETER.to_string(), comment);
            }
            None => {
                table.parameters.remove(COMMENT_PARAMETER);
            }
        }
        Ok(())
    }

    async fn comment_column(
        &self,
        database_name: &str,
        table_name: &str,
        column_name: &str,
        comment: Option<String>,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        let table = state
            .tables
            .get_mut(&key)
            .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?;
        let column = table
            .columns
            .iter_mut()
            .chain(table.partition_columns.iter_mut())
            .find(|c| c.name == column_name)
            .ok_or_else(|| MetastoreError::not_found("column", column_name))?;
        column.comment = comment;
        Ok(())
    }

    async fn add_column(
        &self,
        database_name: &str,
        table_name: &str,
        column: Column,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        let table = state
            .tables
            .get_mut(&key)
            .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?;
        if table
            .columns
            .iter()
            .chain(table.partition_columns.iter())
            .any(|c| c.name == column.name)
        {
            return Err(MetastoreError::already_exists("column", column.name));
        }
        table.columns.push(column);
        Ok(())
    }

    async fn rename_column(
        &self,
        database_name: &str,
        table_name: &str,
        old_column_name: &str,
        new_column_name: &str,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        let table = state
            .tables
            .get_mut(&key)
            .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?;
        if table
            .columns
            .iter()
            .chain(table.partition_columns.iter())
            .any(|c| c.name == new_column_name)
        {
            return Err(MetastoreError::invalid_state(format!(
                "column {new_column_name} already exists on {key}"
            )));
        }
        if table
            .partition_columns
            .iter()
            .any(|c| c.name == old_column_name)
        {
            return Err(MetastoreError::invalid_state(format!(
                "cannot rename partition column {old_column_name}"
            )));
        }
        let column = table
            .columns
            .iter_mut()
            .find(|c| c.name == old_column_name)
            .ok_or_else(|| MetastoreError::not_found("column", old_column_name))?;
        column.name = new_column_name.to_string();
        Ok(())
    }

    async fn drop_column(
        &self,
        database_name: &str,
        table_name: &str,
        column_name: &str,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        let table = state
            .tables
            .get_mut(&key)
            .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?;
        if table.partition_columns.iter().any(|c| c.name == column_name) {
            return Err(MetastoreError::invalid_state(format!(
                "cannot drop partition column {column_name}"
            )));
        }
        let before = table.columns.len();
        table.columns.retain(|c| c.name != column_name);
        if table.columns.len() == before {
            return Err(MetastoreError::not_found("column", column_name));
        }
        Ok(())
    }

    async fn set_table_owner(
        &self,
        database_name: &str,
        table_name: &str,
        owner: Principal,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        let table = state
            .tables
            .get_mut(&key)
            .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?;
        table.owner = Some(owner);
        Ok(())
    }

    // === Statistics ===

    fn supported_column_statistics(&self, type_name: &str) -> BTreeSet<ColumnStatisticKind> {
        supported_column_statistics(type_name)
    }

    async fn get_table_statistics(&self, table: &Table) -> Result<PartitionStatistics> {
        let key = Self::table_key(&table.database_name, &table.table_name);
        let state = self.read_state()?;
        Ok(state
            .table_statistics
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_partition_statistics(
        &self,
        table: &Table,
        partitions: &[Partition],
    ) -> Result<BTreeMap<String, PartitionStatistics>> {
        let key = Self::table_key(&table.database_name, &table.table_name);
        let state = self.read_state()?;
        let stored = state.partition_statistics.get(&key);
        let mut result = BTreeMap::new();
        for partition in partitions {
            let name = Self::partition_name_for(table, &partition.values)?;
            let stats = stored
                .and_then(|m| m.get(&name))
                .cloned()
                .unwrap_or_default();
            result.insert(name, stats);
        }
        Ok(result)
    }

    async fn update_table_statistics(
        &self,
        database_name: &str,
        table_name: &str,
        transaction: AcidTransaction,
        update: StatisticsTransform,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        if transaction != AcidTransaction::none() {
            // Advisory only: this backend has no transactional commit to
            // tie the update to.
            tracing::debug!(table = %key, ?transaction, "ignoring transaction context");
        }
        let _guard = self
            .statistics_locks
            .acquire(&table_entity_key(&key.database_name, &key.table_name))
            .await;
        let current = {
            let state = self.read_state()?;
            if !state.tables.contains_key(&key) {
                return Err(MetastoreError::not_found("table", key.to_string()));
            }
            state
                .table_statistics
                .get(&key)
                .cloned()
                .unwrap_or_default()
        };
        let updated = update(current);
        let mut state = self.write_state()?;
        // The table can disappear between the read above and this write
        // through a path that does not hold the entity lock, such as a
        // rename. Never re-insert statistics for a vanished entry.
        if !state.tables.contains_key(&key) {
            return Err(MetastoreError::not_found("table", key.to_string()));
        }
        state.table_statistics.insert(key, updated);
        Ok(())
    }

    async fn update_partition_statistics(
        &self,
        table: &Table,
        updates: Vec<(String, StatisticsTransform)>,
    ) -> Result<()> {
        let key = Self::table_key(&table.database_name, &table.table_name);
        for (partition_name, update) in updates {
            let _guard = self
                .statistics_locks
                .acquire(&partition_entity_key(
                    &key.database_name,
                    &key.table_name,
                    &partition_name,
                ))
                .await;
            let current = {
                let state = self.read_state()?;
                let exists = state
                    .partitions
                    .get(&key)
                    .is_some_and(|m| m.contains_key(&partition_name));
                if !exists {
                    return Err(MetastoreError::not_found(
                        "partition",
                        format!("{key}/{partition_name}"),
                    ));
                }
                state
                    .partition_statistics
                    .get(&key)
                    .and_then(|m| m.get(&partition_name))
                    .cloned()
                    .unwrap_or_default()
            };
            let updated = update(current);
            let mut state = self.write_state()?;
            let still_present = state
                .partitions
                .get(&key)
                .is_some_and(|m| m.contains_key(&partition_name));
            if !still_present {
                return Err(MetastoreError::not_found(
                    "partition",
                    format!("{key}/{partition_name}"),
                ));
            }
            state
                .partition_statistics
                .entry(key.clone())
                .or_default()
                .insert(partition_name, updated);
        }
        Ok(())
    }

    // === Partitions ===

    async fn get_partition(
        &self,
        table: &Table,
        partition_values: &[String],
    ) -> Result<Option<Partition>> {
        let key = Self::table_key(&table.database_name, &table.table_name);
        let name = Self::partition_name_for(table, partition_values)?;
        let state = self.read_state()?;
        Ok(state
            .partitions
            .get(&key)
            .and_then(|m| m.get(&name))
            .cloned())
    }

    async fn get_partition_names_by_filter(
        &self,
        database_name: &str,
        table_name: &str,
        column_names: &[String],
        filter: &TupleDomain,
    ) -> Result<Option<Vec<String>>> {
        let key = Self::table_key(database_name, table_name);
        if !filter.covers_columns(column_names) {
            // Predicate mentions a non-partition column: no pushdown.
            return Ok(None);
        }
        let state = self.read_state()?;
        let Some(partitions) = state.partitions.get(&key) else {
            return Ok(Some(Vec::new()));
        };
        if filter.is_none() {
            return Ok(Some(Vec::new()));
        }
        let mut names = Vec::new();
        for name in partitions.keys() {
            let pairs = parse_partition_name(name).map_err(MetastoreError::Storage)?;
            if filter.matches(&pairs) {
                names.push(name.clone());
            }
        }
        Ok(Some(names))
    }

    async fn get_partitions_by_names(
        &self,
        table: &Table,
        partition_names: &[String],
    ) -> Result<BTreeMap<String, Option<Partition>>> {
        let key = Self::table_key(&table.database_name, &table.table_name);
        let state = self.read_state()?;
        let stored = state.partitions.get(&key);
        Ok(partition_names
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    stored.and_then(|m| m.get(name)).cloned(),
                )
            })
            .collect())
    }

    async fn add_partitions(
        &self,
        database_name: &str,
        table_name: &str,
        partitions: Vec<PartitionWithStatistics>,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        let table = state
            .tables
            .get(&key)
            .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?
            .clone();
        if !table.is_partitioned() {
            return Err(MetastoreError::invalid_state(format!(
                "table {key} is not partitioned"
            )));
        }

        // Validate the whole batch before touching state: no partial
        // application on failure.
        let mut incoming: Vec<(String, Partition, PartitionStatistics)> = Vec::new();
        let mut seen = BTreeSet::new();
        for with_stats in partitions {
            let name = Self::partition_name_for(&table, &with_stats.partition.values)?;
            if !seen.insert(name.clone()) {
                return Err(MetastoreError::already_exists("partition", name));
            }
            if state
                .partitions
                .get(&key)
                .is_some_and(|m| m.contains_key(&name))
            {
                return Err(MetastoreError::already_exists(
                    "partition",
                    format!("{key}/{name}"),
                ));
            }
            let mut partition = with_stats.partition;
            partition.database_name = key.database_name.clone();
            partition.table_name = key.table_name.clone();
            if partition.storage.location.is_empty() && !table.storage.location.is_empty() {
                partition.storage.location = default_partition_location(&table, &name);
            }
            incoming.push((name, partition, with_stats.statistics));
        }

        let count = incoming.len();
        for (name, partition, statistics) in incoming {
            state
                .partitions
                .entry(key.clone())
                .or_default()
                .insert(name.clone(), partition);
            state
                .partition_statistics
                .entry(key.clone())
                .or_default()
                .insert(name, statistics);
        }
        drop(state);
        tracing::info!(table = %key, count, "added partitions");
        Ok(())
    }

    async fn drop_partition(
        &self,
        database_name: &str,
        table_name: &str,
        partition_values: &[String],
        delete_data: bool,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let entity_key = {
            let state = self.read_state()?;
            let table = state
                .tables
                .get(&key)
                .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?;
            let name = Self::partition_name_for(table, partition_values)?;
            partition_entity_key(&key.database_name, &key.table_name, &name)
        };
        let _statistics_guard = self.statistics_locks.acquire(&entity_key).await;
        let (name, physical) = {
            let mut state = self.write_state()?;
            let table = state
                .tables
                .get(&key)
                .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?
                .clone();
            let name = Self::partition_name_for(&table, partition_values)?;
            let partition = state
                .partitions
                .get(&key)
                .and_then(|m| m.get(&name))
                .ok_or_else(|| {
                    MetastoreError::not_found("partition", format!("{key}/{name}"))
                })?
                .clone();

            let mut physical = None;
            if delete_data && !partition.storage.location.is_empty() {
                let location = partition.storage.location.clone();
                let all_locations = state
                    .tables
                    .values()
                    .map(|t| t.storage.location.as_str())
                    .chain(
                        state
                            .partitions
                            .values()
                            .flat_map(BTreeMap::values)
                            .map(|p| p.storage.location.as_str()),
                    );
                let total = count_location_claims(all_locations, &location);
                if total > 1 {
                    return Err(MetastoreError::SharedLocation {
                        location,
                        references: total,
                    });
                }
                physical = Some(location);
            }

            if let Some(partitions) = state.partitions.get_mut(&key) {
                partitions.remove(&name);
            }
            if let Some(stats) = state.partition_statistics.get_mut(&key) {
                stats.remove(&name);
            }
            (name, physical)
        };
        tracing::info!(table = %key, partition = %name, delete_data, "dropped partition");
        if let Some(location) = physical {
            self.storage.delete_recursive(&location).await?;
        }
        Ok(())
    }

    async fn alter_partition(
        &self,
        database_name: &str,
        table_name: &str,
        partition: PartitionWithStatistics,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        let table = state
            .tables
            .get(&key)
            .ok_or_else(|| MetastoreError::not_found("table", key.to_string()))?
            .clone();
        let name = Self::partition_name_for(&table, &partition.partition.values)?;
        let exists = state
            .partitions
            .get(&key)
            .is_some_and(|m| m.contains_key(&name));
        if !exists {
            return Err(MetastoreError::not_found(
                "partition",
                format!("{key}/{name}"),
            ));
        }
        let mut record = partition.partition;
        record.database_name = key.database_name.clone();
        record.table_name = key.table_name.clone();
        state
            .partitions
            .entry(key.clone())
            .or_default()
            .insert(name.clone(), record);
        state
            .partition_statistics
            .entry(key.clone())
            .or_default()
            .insert(name, partition.statistics);
        Ok(())
    }

    // === Privileges and roles ===

    async fn list_table_privileges(
        &self,
        database_name: &str,
        table_name: &str,
        table_owner: Option<Principal>,
        principal: Option<Principal>,
    ) -> Result<BTreeSet<(Principal, PrivilegeGrant)>> {
        let key = Self::table_key(database_name, table_name);
        let state = self.read_state()?;
        let mut result = BTreeSet::new();
        if let Some(grants) = state.privileges.get(&key) {
            for (grantee, by_privilege) in grants {
                for grant in by_privilege.values() {
                    result.insert((grantee.clone(), grant.clone()));
                }
            }
        }
        // Ownership implies the full privilege set, even absent explicit
        // grants.
        let owner = table_owner.or_else(|| {
            state.tables.get(&key).and_then(|table| table.owner.clone())
        });
        if let Some(owner) = owner {
            for privilege in Privilege::ALL {
                result.insert((
                    owner.clone(),
                    PrivilegeGrant {
                        privilege,
                        grant_option: true,
                        grantor: owner.clone(),
                    },
                ));
            }
        }
        if let Some(principal) = principal {
            result.retain(|(grantee, _)| *grantee == principal);
        }
        Ok(result)
    }

    async fn grant_table_privileges(
        &self,
        database_name: &str,
        table_name: &str,
        grantee: Principal,
        grantor: Principal,
        privileges: BTreeSet<Privilege>,
        grant_option: bool,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        if !state.tables.contains_key(&key) {
            return Err(MetastoreError::not_found("table", key.to_string()));
        }
        let grants = state
            .privileges
            .entry(key.clone())
            .or_default()
            .entry(grantee.clone())
            .or_default();
        for privilege in privileges {
            // Grants accumulate: re-granting never downgrades an existing
            // grant option.
            let grant_option = grant_option
                || grants.get(&privilege).is_some_and(|g| g.grant_option);
            grants.insert(
                privilege,
                PrivilegeGrant {
                    privilege,
                    grant_option,
                    grantor: grantor.clone(),
                },
            );
        }
        drop(state);
        tracing::info!(table = %key, grantee = %grantee, "granted table privileges");
        Ok(())
    }

    async fn revoke_table_privileges(
        &self,
        database_name: &str,
        table_name: &str,
        grantee: Principal,
        _grantor: Principal,
        privileges: BTreeSet<Privilege>,
        grant_option: bool,
    ) -> Result<()> {
        let key = Self::table_key(database_name, table_name);
        let mut state = self.write_state()?;
        if !state.tables.contains_key(&key) {
            return Err(MetastoreError::not_found("table", key.to_string()));
        }
        let grants = state
            .privileges
            .get_mut(&key)
            .and_then(|g| g.get_mut(&grantee))
            .ok_or_else(|| {
                MetastoreError::invalid_state(format!(
                    "no privileges granted to {grantee} on {key}"
                ))
            })?;
        // Validate the full set first so the revoke is all-or-nothing.
        for privilege in &privileges {
            if !grants.contains_key(privilege) {
                return Err(MetastoreError::invalid_state(format!(
                    "privilege {privilege:?} was never granted to {grantee} on {key}"
                )));
            }
        }
        for privilege in privileges {
            if grant_option {
                if let Some(grant) = grants.get_mut(&privilege) {
                    grant.grant_option = false;
                }
            } else {
                grants.remove(&privilege);
            }
        }
        if grants.is_empty() {
            if let Some(by_grantee) = state.privileges.get_mut(&key) {
                by_grantee.remove(&grantee);
            }
        }
        drop(state);
        tracing::info!(table = %key, grantee = %grantee, "revoked table privileges");
        Ok(())
    }

    async fn create_role(&self, role_name: &str, grantor: &str) -> Result<()> {
        let name = normalize(role_name);
        let mut state = self.write_state()?;
        if state.roles.contains_key(&name) {
            return Err(MetastoreError::already_exists("role", name));
        }
        state.roles.insert(name.clone(), grantor.to_string());
        drop(state);
        tracing::info!(role = %name, "created role");
        Ok(())
    }

    async fn drop_role(&self, role_name: &str) -> Result<()> {
        let name = normalize(role_name);
        let mut state = self.write_state()?;
        if state.roles.remove(&name).is_none() {
            return Err(MetastoreError::not_found("role", name));
        }
        state.role_grants.retain(|grant| grant.role_name != name);
        drop(state);
        tracing::info!(role = %name, "dropped role");
        Ok(())
    }

    async fn list_roles(&self) -> Result<BTreeSet<String>> {
        let state = self.read_state()?;
        Ok(state.roles.keys().cloned().collect())
    }

    async fn grant_roles(
        &self,
        roles: &[String],
        grantees: &[Principal],
        admin_option: bool,
        grantor: Principal,
    ) -> Result<Vec<RolePairOutcome>> {
        let mut outcomes = Vec::with_capacity(roles.len() * grantees.len());
        for role in roles {
            let role = normalize(role);
            for grantee in grantees {
                let result = {
                    let mut state = self.write_state()?;
                    if state.roles.contains_key(&role) {
                        state.role_grants.retain(|grant| {
                            !(grant.role_name == role && grant.grantee == *grantee)
                        });
                        state.role_grants.insert(RoleGrant {
                            role_name: role.clone(),
                            grantee: grantee.clone(),
                            grantor: grantor.clone(),
                            admin_option,
                        });
                        Ok(())
                    } else {
                        Err(MetastoreError::not_found("role", role.clone()))
                    }
                };
                outcomes.push(RolePairOutcome {
                    role_name: role.clone(),
                    grantee: grantee.clone(),
                    result,
                });
            }
        }
        Ok(outcomes)
    }

    async fn revoke_roles(
        &self,
        roles: &[String],
        grantees: &[Principal],
        admin_option: bool,
        _grantor: Principal,
    ) -> Result<Vec<RolePairOutcome>> {
        let mut outcomes = Vec::with_capacity(roles.len() * grantees.len());
        for role in roles {
            let role = normalize(role);
            for grantee in grantees {
                let result = {
                    let mut state = self.write_state()?;
                    let existing = state
                        .role_grants
                        .iter()
                        .find(|grant| grant.role_name == role && grant.grantee == *grantee)
                        .cloned();
                    match existing {
                        Some(grant) if admin_option => {
                            state.role_grants.remove(&grant);
                            state.role_grants.insert(RoleGrant {
                                admin_option: false,
                                ..grant
                            });
                            Ok(())
                        }
                        Some(grant) => {
                            state.role_grants.remove(&grant);
                            Ok(())
                        }
                        None => Err(MetastoreError::invalid_state(format!(
                            "role {role} was never granted to {grantee}"
                        ))),
                    }
                };
                outcomes.push(RolePairOutcome {
                    role_name: role.clone(),
                    grantee: grantee.clone(),
                    result,
                });
            }
        }
        Ok(outcomes)
    }

    async fn list_role_grants(&self, principal: &Principal) -> Result<BTreeSet<RoleGrant>> {
        let state = self.read_state()?;
        Ok(state
            .role_grants
            .iter()
            .filter(|grant| grant.grantee == *principal)
            .cloned()
            .collect())
    }

    // === Functions ===

    async fn function_exists(
        &self,
        database_name: &str,
        function_name: &str,
        signature_token: &str,
    ) -> Result<bool> {
        let key = (
            normalize(database_name),
            normalize(function_name),
            signature_token.to_string(),
        );
        let state = self.read_state()?;
        Ok(state.functions.contains_key(&key))
    }

    async fn get_functions(&self, database_name: &str) -> Result<Vec<LanguageFunction>> {
        let name = normalize(database_name);
        let state = self.read_state()?;
        Ok(state
            .functions
            .iter()
            .filter(|((db, _, _), _)| *db == name)
            .map(|(_, function)| function.clone())
            .collect())
    }

    async fn get_functions_named(
        &self,
        database_name: &str,
        function_name: &str,
    ) -> Result<Vec<LanguageFunction>> {
        let db = normalize(database_name);
        let name = normalize(function_name);
        let state = self.read_state()?;
        Ok(state
            .functions
            .iter()
            .filter(|((d, n, _), _)| *d == db && *n == name)
            .map(|(_, function)| function.clone())
            .collect())
    }

    async fn create_function(
        &self,
        database_name: &str,
        function_name: &str,
        function: LanguageFunction,
    ) -> Result<()> {
        let key = (
            normalize(database_name),
            normalize(function_name),
            function.signature_token.clone(),
        );
        let mut state = self.write_state()?;
        if !state.databases.contains_key(&key.0) {
            return Err(MetastoreError::not_found("database", key.0));
        }
        if state.functions.contains_key(&key) {
            return Err(MetastoreError::already_exists(
                "function",
                format!("{}.{}[{}]", key.0, key.1, key.2),
            ));
        }
        state.functions.insert(key.clone(), function);
        drop(state);
        tracing::info!(database = %key.0, function = %key.1, "created function");
        Ok(())
    }

    async fn replace_function(
        &self,
        database_name: &str,
        function_name: &str,
        function: LanguageFunction,
    ) -> Result<()> {
        let key = (
            normalize(database_name),
            normalize(function_name),
            function.signature_token.clone(),
        );
        let mut state = self.write_state()?;
        if !state.databases.contains_key(&key.0) {
            return Err(MetastoreError::not_found("database", key.0));
        }
        state.functions.insert(key.clone(), function);
        drop(state);
        tracing::info!(database = %key.0, function = %key.1, "replaced function");
        Ok(())
    }

    async fn drop_function(
        &self,
        database_name: &str,
        function_name: &str,
        signature_token: &str,
    ) -> Result<()> {
        let key = (
            normalize(database_name),
            normalize(function_name),
            signature_token.to_string(),
        );
        let mut state = self.write_state()?;
        if state.functions.remove(&key).is_none() {
            return Err(MetastoreError::not_found(
                "function",
                format!("{}.{}[{}]", key.0, key.1, key.2),
            ));
        }
        drop(state);
        tracing::info!(database = %key.0, function = %key.1, "dropped function");
        Ok(())
    }
}
