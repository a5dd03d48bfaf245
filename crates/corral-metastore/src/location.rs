//! Storage location resolution and ownership.
//!
//! Pure logic mapping a table or partition identity plus an optional
//! explicit location to its canonical storage location, and deciding
//! whether a catalog entry owns its location exclusively. The drop
//! lifecycle consults ownership before touching physical storage: a
//! location referenced by more than one catalog entry is never deleted.

use crate::database::Database;
use crate::error::{MetastoreError, Result};
use crate::table::{Table, TableType};

/// Joins a root location and a child segment, normalizing the separator.
#[must_use]
pub fn join_location(root: &str, child: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), child)
}

/// Resolves the storage location for a table at creation time.
///
/// - `Managed`: derived deterministically as `{database.location}/{table}`;
///   an explicit location is rejected so the derivation stays the single
///   source of truth.
/// - `External`: the caller-supplied location is required and recorded
///   verbatim.
/// - Views have no storage; any supplied location is rejected.
///
/// # Errors
///
/// Returns `InvalidState` when the rules above are violated (managed
/// table with explicit location, external table without one, database
/// without a root for a managed table).
pub fn resolve_table_location(
    database: &Database,
    table_name: &str,
    table_type: TableType,
    explicit: Option<&str>,
) -> Result<Option<String>> {
    match table_type {
        TableType::Managed => {
            if let Some(explicit) = explicit {
                return Err(MetastoreError::invalid_state(format!(
                    "managed table {table_name} must not supply a location (got {explicit})"
                )));
            }
            let root = database.location.as_deref().ok_or_else(|| {
                MetastoreError::invalid_state(format!(
                    "database {} has no location; cannot derive managed table location",
                    database.name
                ))
            })?;
            Ok(Some(join_location(root, table_name)))
        }
        TableType::External => match explicit {
            Some(location) if !location.is_empty() => Ok(Some(location.to_string())),
            _ => Err(MetastoreError::invalid_state(format!(
                "external table {table_name} requires an explicit location"
            ))),
        },
        TableType::View | TableType::MaterializedView => {
            if explicit.is_some_and(|l| !l.is_empty()) {
                return Err(MetastoreError::invalid_state(format!(
                    "view {table_name} must not have a storage location"
                )));
            }
            Ok(None)
        }
    }
}

/// Default partition location under its table's root.
#[must_use]
pub fn default_partition_location(table: &Table, partition_name: &str) -> String {
    join_location(&table.storage.location, partition_name)
}

/// Counts catalog entries claiming storage at or under `candidate`.
///
/// A claim is either an exact match of the recorded location or a
/// location strictly nested inside it as a directory. Sibling prefix
/// overlap is not a claim: `.../events` never covers `.../events_v2`.
pub fn count_location_claims<'a>(
    locations: impl Iterator<Item = &'a str>,
    candidate: &str,
) -> usize {
    if candidate.is_empty() {
        return 0;
    }
    let nested = format!("{}/", candidate.trim_end_matches('/'));
    locations
        .filter(|l| !l.is_empty() && (*l == candidate || l.starts_with(&nested)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;

    fn db_with_root() -> Database {
        Database::new("sales").with_location("s3://warehouse/sales")
    }

    #[test]
    fn test_managed_location_derived() {
        let location =
            resolve_table_location(&db_with_root(), "orders", TableType::Managed, None)
                .expect("resolve");
        assert_eq!(location.as_deref(), Some("s3://warehouse/sales/orders"));
    }

    #[test]
    fn test_managed_location_normalizes_trailing_slash() {
        let db = Database::new("sales").with_location("s3://warehouse/sales/");
        let location = resolve_table_location(&db, "orders", TableType::Managed, None)
            .expect("resolve");
        assert_eq!(location.as_deref(), Some("s3://warehouse/sales/orders"));
    }

    #[test]
    fn test_managed_rejects_explicit_location() {
        let result = resolve_table_location(
            &db_with_root(),
            "orders",
            TableType::Managed,
            Some("s3://elsewhere"),
        );
        assert!(matches!(result, Err(MetastoreError::InvalidState { .. })));
    }

    #[test]
    fn test_managed_requires_database_root() {
        let db = Database::new("rootless");
        let result = resolve_table_location(&db, "orders", TableType::Managed, None);
        assert!(matches!(result, Err(MetastoreError::InvalidState { .. })));
    }

    #[test]
    fn test_external_location_recorded_verbatim() {
        // Trailing slash and casing preserved exactly as supplied
        let supplied = "s3://Data-Lake/Orders/";
        let location = resolve_table_location(
            &db_with_root(),
            "orders",
            TableType::External,
            Some(supplied),
        )
        .expect("resolve");
        assert_eq!(location.as_deref(), Some(supplied));
    }

    #[test]
    fn test_external_requires_location() {
        let result = resolve_table_location(&db_with_root(), "orders", TableType::External, None);
        assert!(matches!(result, Err(MetastoreError::InvalidState { .. })));
    }

    #[test]
    fn test_view_has_no_location() {
        let location = resolve_table_location(&db_with_root(), "v", TableType::View, None)
            .expect("resolve");
        assert_eq!(location, None);
    }

    #[test]
    fn test_claim_counting_exact_and_nested() {
        let locations = [
            "s3://warehouse/sales/orders",
            "s3://warehouse/sales/orders_archive",
            "s3://warehouse/sales/orders/ds=2024-06-01",
            "s3://warehouse/sales/orders",
        ];
        let count = count_location_claims(
            locations.iter().copied(),
            "s3://warehouse/sales/orders",
        );
        assert_eq!(count, 3);
    }

    #[test]
    fn test_sibling_prefix_is_not_a_claim() {
        let locations = ["s3://lake/events_v2", "s3://lake/events_v2/part-0"];
        let count = count_location_claims(locations.iter().copied(), "s3://lake/events");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_default_partition_location() {
        let table = TableBuilder::new("sales", "orders", TableType::External)
            .location("s3://lake/orders")
            .build();
        assert_eq!(
            default_partition_location(&table, "ds=2024-06-01"),
            "s3://lake/orders/ds=2024-06-01"
        );
    }
}
