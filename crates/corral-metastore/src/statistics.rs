//! Table and partition statistics.
//!
//! Basic statistics (row count, data size) and per-column statistics are
//! independent sub-objects; either may be absent. The column-statistic
//! variant set a backend supports for a given column type is declared via
//! [`supported_column_statistics`], so engines can skip collecting kinds
//! the backend would drop.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Row-level statistics independent of any column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicStatistics {
    /// Number of rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Number of data files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u64>,
    /// Raw (uncompressed) data size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size_bytes: Option<u64>,
}

impl BasicStatistics {
    /// Returns statistics with every field absent.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            row_count: None,
            file_count: None,
            total_size_bytes: None,
        }
    }
}

/// The kinds of column statistics a backend may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnStatisticKind {
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Number of null values.
    NullCount,
    /// Number of distinct values.
    DistinctCount,
    /// True/false counts for booleans.
    TrueFalseCount,
    /// Maximum value length for variable-width types.
    MaxLength,
    /// Average value length for variable-width types.
    AvgLength,
}

/// Per-column statistics, variant selected by the column's type family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ColumnStatistics {
    /// Statistics for integer-family columns.
    Integer {
        /// Minimum value.
        min: Option<i64>,
        /// Maximum value.
        max: Option<i64>,
        /// Null count.
        null_count: Option<u64>,
        /// Distinct count.
        distinct_count: Option<u64>,
    },
    /// Statistics for floating-point columns.
    Double {
        /// Minimum value.
        min: Option<f64>,
        /// Maximum value.
        max: Option<f64>,
        /// Null count.
        null_count: Option<u64>,
        /// Distinct count.
        distinct_count: Option<u64>,
    },
    /// Statistics for date columns (days since epoch).
    Date {
        /// Minimum value.
        min: Option<i32>,
        /// Maximum value.
        max: Option<i32>,
        /// Null count.
        null_count: Option<u64>,
        /// Distinct count.
        distinct_count: Option<u64>,
    },
    /// Statistics for boolean columns.
    Boolean {
        /// Number of true values.
        true_count: Option<u64>,
        /// Number of false values.
        false_count: Option<u64>,
        /// Null count.
        null_count: Option<u64>,
    },
    /// Statistics for string columns.
    String {
        /// Maximum length in characters.
        max_length: Option<u64>,
        /// Average length in characters.
        avg_length: Option<f64>,
        /// Null count.
        null_count: Option<u64>,
        /// Distinct count.
        distinct_count: Option<u64>,
    },
    /// Statistics for binary columns.
    Binary {
        /// Maximum length in bytes.
        max_length: Option<u64>,
        /// Average length in bytes.
        avg_length: Option<f64>,
        /// Null count.
        null_count: Option<u64>,
    },
}

/// Statistics for a table or a single partition.
///
/// Either sub-object may be absent: `basic` fields default to `None` and
/// `columns` may be empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionStatistics {
    /// Row-level statistics.
    #[serde(default)]
    pub basic: BasicStatistics,
    /// Column name to column statistics.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, ColumnStatistics>,
}

impl PartitionStatistics {
    /// Returns completely empty statistics.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns statistics with only a row count.
    #[must_use]
    pub fn with_row_count(row_count: u64) -> Self {
        Self {
            basic: BasicStatistics {
                row_count: Some(row_count),
                ..BasicStatistics::empty()
            },
            columns: BTreeMap::new(),
        }
    }
}

/// Returns the column-statistic kinds this backend supports for a column
/// type, keyed by the type name's family.
///
/// Unknown type names get no supported statistics rather than an error:
/// the engine simply collects nothing for them.
#[must_use]
pub fn supported_column_statistics(type_name: &str) -> BTreeSet<ColumnStatisticKind> {
    use ColumnStatisticKind as Kind;

    let base = type_name
        .split(|c| c == '(' || c == '<')
        .next()
        .unwrap_or(type_name)
        .trim()
        .to_ascii_lowercase();

    let kinds: &[Kind] = match base.as_str() {
        "tinyint" | "smallint" | "int" | "integer" | "bigint" | "decimal" | "date"
        | "timestamp" | "double" | "float" | "real" => {
            &[Kind::Min, Kind::Max, Kind::NullCount, Kind::DistinctCount]
        }
        "boolean" => &[Kind::TrueFalseCount, Kind::NullCount],
        "varchar" | "char" | "string" => &[
            Kind::MaxLength,
            Kind::AvgLength,
            Kind::NullCount,
            Kind::DistinctCount,
        ],
        "varbinary" | "binary" => &[Kind::MaxLength, Kind::AvgLength, Kind::NullCount],
        _ => &[],
    };
    kinds.iter().copied().collect()
}
