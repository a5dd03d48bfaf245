//! Partition types.
//!
//! A partition belongs to exactly one table and is identified by its
//! ordered value tuple, whose arity and order match the table's declared
//! partition columns. No two partitions of one table share a value tuple.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use corral_core::partition_name::make_partition_name;

use crate::error::{MetastoreError, Result};
use crate::statistics::PartitionStatistics;
use crate::table::{StorageDescriptor, Table};

/// A partition record stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    /// Database of the owning table.
    pub database_name: String,
    /// Owning table.
    pub table_name: String,
    /// Partition values, ordered to match the table's partition columns.
    pub values: Vec<String>,
    /// Physical storage details for this partition.
    pub storage: StorageDescriptor,
    /// Free-form partition parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl Partition {
    /// Creates a partition for the given table with the given values and
    /// storage location.
    #[must_use]
    pub fn new(table: &Table, values: Vec<String>, location: impl Into<String>) -> Self {
        Self {
            database_name: table.database_name.clone(),
            table_name: table.table_name.clone(),
            values,
            storage: StorageDescriptor::at(location),
            parameters: BTreeMap::new(),
        }
    }

    /// Returns the Hive-style partition name for this partition under the
    /// given table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the value arity does not match the
    /// table's partition columns.
    pub fn name(&self, table: &Table) -> Result<String> {
        let columns = table.partition_column_names();
        if columns.len() != self.values.len() {
            return Err(MetastoreError::invalid_state(format!(
                "partition of {}.{} has {} values but table declares {} partition columns",
                self.database_name,
                self.table_name,
                self.values.len(),
                columns.len()
            )));
        }
        make_partition_name(&columns, &self.values).map_err(MetastoreError::Storage)
    }
}

/// A partition paired with its statistics, as accepted by `add_partitions`
/// and `alter_partition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionWithStatistics {
    /// The partition record.
    pub partition: Partition,
    /// Statistics to record alongside the partition.
    #[serde(default)]
    pub statistics: PartitionStatistics,
}

impl PartitionWithStatistics {
    /// Pairs a partition with empty statistics.
    #[must_use]
    pub fn without_statistics(partition: Partition) -> Self {
        Self {
            partition,
            statistics: PartitionStatistics::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{TableBuilder, TableType};

    fn partitioned_table() -> Table {
        TableBuilder::new("sales", "orders", TableType::Managed)
            .column("id", "bigint")
            .partition_column("year", "varchar")
            .partition_column("month", "varchar")
            .location("s3://warehouse/sales/orders")
            .build()
    }

    #[test]
    fn test_partition_name_follows_declared_order() {
        let table = partitioned_table();
        let partition = Partition::new(
            &table,
            vec!["2024".into(), "06".into()],
            "s3://warehouse/sales/orders/year=2024/month=06",
        );
        assert_eq!(partition.name(&table).expect("valid"), "year=2024/month=06");
    }

    #[test]
    fn test_partition_name_arity_mismatch() {
        let table = partitioned_table();
        let partition = Partition::new(&table, vec!["2024".into()], "loc");
        let result = partition.name(&table);
        assert!(matches!(result, Err(MetastoreError::InvalidState { .. })));
    }
}
