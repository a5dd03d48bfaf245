//! Database and principal types.
//!
//! A database is the top-level namespace in the catalog. Its optional
//! location is the root under which managed table locations are derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of principal a grant targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrincipalKind {
    /// An individual user.
    User,
    /// A role that users or other roles may be granted.
    Role,
}

/// A security principal: a user or a role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Whether this is a user or a role.
    pub kind: PrincipalKind,
    /// Principal name.
    pub name: String,
}

impl Principal {
    /// Creates a user principal.
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::User,
            name: name.into(),
        }
    }

    /// Creates a role principal.
    #[must_use]
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::Role,
            name: name.into(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PrincipalKind::User => "user",
            PrincipalKind::Role => "role",
        };
        write!(f, "{kind}:{}", self.name)
    }
}

/// A database: the unit of namespacing for tables and functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /// Database name. The backend normalizes names to ASCII lowercase.
    pub name: String,

    /// Owning principal, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Principal>,

    /// Root storage location. Managed table locations are derived as
    /// `{location}/{table_name}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Free-form database properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,

    /// Creation time, stamped by the backend when the database is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Database {
    /// Creates a database with the given name and no location.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            location: None,
            parameters: BTreeMap::new(),
            created_at: None,
        }
    }

    /// Sets the root storage location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: Principal) -> Self {
        self.owner = Some(owner);
        self
    }
}
