//! User-defined function records.
//!
//! Functions are keyed by `(database, name, signature_token)`. The
//! signature token distinguishes overloads of a same-named function;
//! exactly one function may exist per full key.

use serde::{Deserialize, Serialize};

use crate::database::Principal;

/// A stored user-defined function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageFunction {
    /// Overload discriminator within `(database, name)`.
    pub signature_token: String,
    /// Implementation language (e.g. `sql`).
    pub language: String,
    /// Function body or definition.
    pub definition: String,
    /// Owning principal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Principal>,
    /// Whether the function is deterministic.
    #[serde(default)]
    pub deterministic: bool,
}

impl LanguageFunction {
    /// Creates a SQL function with the given signature token and body.
    #[must_use]
    pub fn sql(signature_token: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            signature_token: signature_token.into(),
            language: "sql".into(),
            definition: definition.into(),
            owner: None,
            deterministic: false,
        }
    }

    /// Marks the function deterministic.
    #[must_use]
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }
}
