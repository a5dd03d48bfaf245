//! Table privileges and role grants.
//!
//! Privileges attach to `(table, grantee)` pairs. The effective privilege
//! set for a principal includes the full set implied by table ownership,
//! even when no explicit grant exists. Roles are flat; role grants to
//! other roles are possible via re-granting but no hierarchy resolution
//! happens at this layer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::database::Principal;
use crate::error::Result;

/// Fixed enumeration of table privilege kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Privilege {
    /// Read rows.
    Select,
    /// Insert rows.
    Insert,
    /// Update rows.
    Update,
    /// Delete rows.
    Delete,
    /// Table ownership; implies every other privilege.
    Ownership,
}

impl Privilege {
    /// All privilege kinds, as implied by ownership.
    pub const ALL: [Self; 5] = [
        Self::Select,
        Self::Insert,
        Self::Update,
        Self::Delete,
        Self::Ownership,
    ];
}

/// A single granted privilege with its grant-option flag and grantor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeGrant {
    /// The privilege kind.
    pub privilege: Privilege,
    /// Whether the grantee may re-grant this privilege.
    pub grant_option: bool,
    /// Principal that issued the grant.
    pub grantor: Principal,
}

/// Per-table privilege assignments: grantee to granted privileges.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalPrivileges {
    /// Grantee principal to the set of grants it holds.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub grants: BTreeMap<Principal, BTreeSet<PrivilegeGrant>>,
}

impl PrincipalPrivileges {
    /// Returns an empty assignment.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the grants held by a grantee, or an empty set.
    #[must_use]
    pub fn grants_for(&self, grantee: &Principal) -> BTreeSet<PrivilegeGrant> {
        self.grants.get(grantee).cloned().unwrap_or_default()
    }
}

/// A role granted to a principal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGrant {
    /// The granted role.
    pub role_name: String,
    /// Principal receiving the role.
    pub grantee: Principal,
    /// Principal that issued the grant.
    pub grantor: Principal,
    /// Whether the grantee may administer the role (re-grant it).
    pub admin_option: bool,
}

/// Per-pair outcome of a bulk role grant/revoke.
///
/// Role operations take a set of roles and a set of grantees and apply
/// the Cartesian product pair by pair. Each pair succeeds or fails
/// independently; callers receive every outcome instead of one aggregate
/// result, so partial failures stay visible.
#[derive(Debug)]
pub struct RolePairOutcome {
    /// The role of this pair.
    pub role_name: String,
    /// The grantee of this pair.
    pub grantee: Principal,
    /// The result for this pair.
    pub result: Result<()>,
}

impl RolePairOutcome {
    /// Returns true if this pair applied successfully.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}
