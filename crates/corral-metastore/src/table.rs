//! Table, column, and storage-descriptor types.
//!
//! Tables are uniquely identified by `(database_name, table_name)`. The
//! storage descriptor carries the physical location plus opaque format
//! handles; the catalog never interprets format internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::database::Principal;

/// Table type, determining storage-lifecycle ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableType {
    /// Location and lifecycle fully owned by the catalog; location is
    /// derived from the database root.
    Managed,
    /// Location supplied by the caller, recorded verbatim and never
    /// auto-relocated.
    External,
    /// Logical view; no storage of its own.
    View,
    /// Materialized view.
    MaterializedView,
}

impl TableType {
    /// Returns true for the relation kinds listed as views.
    #[must_use]
    pub const fn is_view(self) -> bool {
        matches!(self, Self::View | Self::MaterializedView)
    }
}

/// Relation kind reported by listing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    /// A base table (managed or external).
    Table,
    /// A view or materialized view.
    View,
}

impl From<TableType> for RelationType {
    fn from(table_type: TableType) -> Self {
        if table_type.is_view() {
            Self::View
        } else {
            Self::Table
        }
    }
}

/// Qualified table name: `database.table`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaTableName {
    /// Database (schema) name.
    pub database_name: String,
    /// Table name.
    pub table_name: String,
}

impl SchemaTableName {
    /// Creates a qualified table name.
    #[must_use]
    pub fn new(database_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            table_name: table_name.into(),
        }
    }
}

impl fmt::Display for SchemaTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database_name, self.table_name)
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Type name (e.g. `bigint`, `varchar`, `date`); opaque to the catalog.
    pub type_name: String,
    /// Column comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Column {
    /// Creates a column without a comment.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            comment: None,
        }
    }
}

/// Physical storage details for a table or partition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageDescriptor {
    /// Storage location (object-store URI or key prefix). Empty for
    /// relations without storage (views).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// Input format handle (opaque to the catalog).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,

    /// Output format handle (opaque to the catalog).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,

    /// Serde properties for the row format.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub serde_properties: BTreeMap<String, String>,
}

impl StorageDescriptor {
    /// Creates a descriptor with only a location.
    #[must_use]
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }
}

/// Complete table record stored in the catalog.
///
/// Invariants:
/// - MANAGED tables have `storage.location` derived from the database root
///   plus the table name at creation time.
/// - EXTERNAL tables record the caller-supplied location verbatim.
/// - `partition_columns` defines the arity and order of every partition's
///   value tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Database this table belongs to.
    pub database_name: String,
    /// Table name, unique within the database.
    pub table_name: String,
    /// Table type.
    pub table_type: TableType,
    /// Owning principal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Principal>,
    /// Data columns (excluding partition columns).
    pub columns: Vec<Column>,
    /// Partition columns, in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partition_columns: Vec<Column>,
    /// Physical storage details.
    pub storage: StorageDescriptor,
    /// Free-form table parameters (e.g. format version, comment).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    /// Original view definition text, for views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_original_text: Option<String>,
    /// Creation time, stamped by the backend when the table is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parameter key under which a table comment is stored.
pub const COMMENT_PARAMETER: &str = "comment";

impl Table {
    /// Returns the qualified name.
    #[must_use]
    pub fn schema_table_name(&self) -> SchemaTableName {
        SchemaTableName::new(self.database_name.clone(), self.table_name.clone())
    }

    /// Returns the partition column names in declared order.
    #[must_use]
    pub fn partition_column_names(&self) -> Vec<String> {
        self.partition_columns
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Returns true if the table has partition columns.
    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        !self.partition_columns.is_empty()
    }
}

/// Builder for [`Table`], used by callers assembling create requests.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    table: Table,
}

impl TableBuilder {
    /// Starts a builder for the given table identity and type.
    #[must_use]
    pub fn new(
        database_name: impl Into<String>,
        table_name: impl Into<String>,
        table_type: TableType,
    ) -> Self {
        Self {
            table: Table {
                database_name: database_name.into(),
                table_name: table_name.into(),
                table_type,
                owner: None,
                columns: Vec::new(),
                partition_columns: Vec::new(),
                storage: StorageDescriptor::default(),
                parameters: BTreeMap::new(),
                view_original_text: None,
                created_at: None,
            },
        }
    }

    /// Adds a data column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.table.columns.push(Column::new(name, type_name));
        self
    }

    /// Adds a partition column.
    #[must_use]
    pub fn partition_column(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        self.table
            .partition_columns
            .push(Column::new(name, type_name));
        self
    }

    /// Sets the explicit storage location (required for EXTERNAL tables).
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.table.storage.location = location.into();
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: Principal) -> Self {
        self.table.owner = Some(owner);
        self
    }

    /// Sets a table parameter.
    #[must_use]
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.table.parameters.insert(key.into(), value.into());
        self
    }

    /// Sets the view definition text.
    #[must_use]
    pub fn view_text(mut self, text: impl Into<String>) -> Self {
        self.table.view_original_text = Some(text.into());
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Table {
        self.table
    }
}
