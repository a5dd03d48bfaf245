//! Partition filter engine.
//!
//! Evaluates a conjunctive per-column domain over partition *key* values
//! (strings) to select candidate partitions without fetching full
//! partition metadata. Matching never touches statistics or file
//! contents.
//!
//! The outcome convention matters: an empty match set means "zero
//! matching partitions" and is entirely different from "pushdown not
//! possible", which the contract signals with an absent result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One end of a value range, over lexicographic string order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bound {
    /// No bound on this end.
    Unbounded,
    /// Bound including the value itself.
    Inclusive(String),
    /// Bound excluding the value itself.
    Exclusive(String),
}

/// Allowed values for a single partition column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    /// Every value is allowed.
    All,
    /// No value is allowed; the conjunction can match nothing.
    None,
    /// Only the listed values are allowed.
    In(BTreeSet<String>),
    /// Values within a range, compared lexicographically.
    Range {
        /// Lower bound.
        low: Bound,
        /// Upper bound.
        high: Bound,
    },
}

impl Domain {
    /// Creates a single-value equality domain.
    #[must_use]
    pub fn equal(value: impl Into<String>) -> Self {
        let mut set = BTreeSet::new();
        set.insert(value.into());
        Self::In(set)
    }

    /// Returns true if the given value satisfies this domain.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::In(values) => values.contains(value),
            Self::Range { low, high } => {
                let low_ok = match low {
                    Bound::Unbounded => true,
                    Bound::Inclusive(b) => value >= b.as_str(),
                    Bound::Exclusive(b) => value > b.as_str(),
                };
                let high_ok = match high {
                    Bound::Unbounded => true,
                    Bound::Inclusive(b) => value <= b.as_str(),
                    Bound::Exclusive(b) => value < b.as_str(),
                };
                low_ok && high_ok
            }
        }
    }
}

/// Conjunctive domain over partition columns.
///
/// Columns without an entry are unconstrained. A filter mentioning a
/// column that is not a partition column of the target table cannot be
/// pushed down at all; the engine signals that with an absent result
/// rather than a wrong answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TupleDomain {
    /// Per-column constraints.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub domains: BTreeMap<String, Domain>,
}

impl TupleDomain {
    /// Creates an unconstrained filter (matches every partition).
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds a constraint on a column.
    #[must_use]
    pub fn with_domain(mut self, column: impl Into<String>, domain: Domain) -> Self {
        self.domains.insert(column.into(), domain);
        self
    }

    /// Returns true if some column admits no values, so the conjunction
    /// can never match.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.domains.values().any(|d| matches!(d, Domain::None))
    }

    /// Returns the columns this filter constrains.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.domains.keys()
    }

    /// Evaluates the conjunction against one partition's `(column, value)`
    /// pairs. Columns absent from the filter are unconstrained.
    #[must_use]
    pub fn matches(&self, partition_values: &[(String, String)]) -> bool {
        self.domains.iter().all(|(column, domain)| {
            partition_values
                .iter()
                .find(|(c, _)| c == column)
                .is_some_and(|(_, value)| domain.contains(value))
        })
    }

    /// Returns true if every constrained column is a declared partition
    /// column, i.e. the filter can be pushed down.
    #[must_use]
    pub fn covers_columns(&self, partition_columns: &[String]) -> bool {
        self.domains
            .keys()
            .all(|column| partition_columns.contains(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(c, v)| ((*c).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_all_matches_everything() {
        let filter = TupleDomain::all();
        assert!(filter.matches(&values(&[("year", "2024")])));
        assert!(filter.matches(&[]));
    }

    #[test]
    fn test_equality_domain() {
        let filter = TupleDomain::all().with_domain("year", Domain::equal("2024"));
        assert!(filter.matches(&values(&[("year", "2024"), ("month", "06")])));
        assert!(!filter.matches(&values(&[("year", "2023"), ("month", "06")])));
    }

    #[test]
    fn test_in_domain() {
        let mut set = BTreeSet::new();
        set.insert("01".to_string());
        set.insert("02".to_string());
        let filter = TupleDomain::all().with_domain("month", Domain::In(set));
        assert!(filter.matches(&values(&[("month", "02")])));
        assert!(!filter.matches(&values(&[("month", "03")])));
    }

    #[test]
    fn test_range_domain_lexicographic() {
        let filter = TupleDomain::all().with_domain(
            "ds",
            Domain::Range {
                low: Bound::Inclusive("2024-01-01".into()),
                high: Bound::Exclusive("2024-02-01".into()),
            },
        );
        assert!(filter.matches(&values(&[("ds", "2024-01-01")])));
        assert!(filter.matches(&values(&[("ds", "2024-01-31")])));
        assert!(!filter.matches(&values(&[("ds", "2024-02-01")])));
        assert!(!filter.matches(&values(&[("ds", "2023-12-31")])));
    }

    #[test]
    fn test_none_domain_matches_nothing() {
        let filter = TupleDomain::all().with_domain("year", Domain::None);
        assert!(filter.is_none());
        assert!(!filter.matches(&values(&[("year", "2024")])));
    }

    #[test]
    fn test_conjunction_requires_every_column() {
        let filter = TupleDomain::all()
            .with_domain("year", Domain::equal("2024"))
            .with_domain("month", Domain::equal("06"));
        assert!(filter.matches(&values(&[("year", "2024"), ("month", "06")])));
        assert!(!filter.matches(&values(&[("year", "2024"), ("month", "07")])));
    }

    #[test]
    fn test_covers_columns() {
        let filter = TupleDomain::all().with_domain("year", Domain::equal("2024"));
        assert!(filter.covers_columns(&["year".to_string(), "month".to_string()]));
        assert!(!filter.covers_columns(&["month".to_string()]));
    }

    #[test]
    fn test_missing_column_in_partition_does_not_match() {
        // Constrained column absent from the value tuple: no match,
        // never a panic.
        let filter = TupleDomain::all().with_domain("region", Domain::equal("us"));
        assert!(!filter.matches(&values(&[("year", "2024")])));
    }
}
