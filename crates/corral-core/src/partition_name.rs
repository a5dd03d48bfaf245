//! Hive-style partition name encoding.
//!
//! Partition names flatten an ordered tuple of `(column, value)` pairs into
//! a single path-like string: `col1=v1/col2=v2`. Reserved characters in
//! values are percent-escaped so the name round-trips losslessly and stays
//! safe to embed in object-store keys.
//!
//! # Grammar
//!
//! ```text
//! PARTITION_NAME ::= segment ("/" segment)*
//! segment        ::= column "=" escaped_value
//! escaped_value  ::= (unreserved | "%" HEXDIG HEXDIG)*
//! ```
//!
//! Column order follows the table's declared partition columns, never
//! alphabetical order: `year=2024/month=01` and `month=01/year=2024` name
//! different layouts.

use crate::error::{Error, Result};
use std::fmt::Write as _;

/// Characters that must be percent-escaped inside a partition value.
///
/// Matches the Hive path-escaping convention: path separators, the
/// key/value and escape markers themselves, and characters that are
/// unsafe in object-store keys.
fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '/' | '\\' | '%' | '=' | ':' | '#' | '?' | '*' | '"' | '<' | '>' | '|' | '[' | ']'
    ) || c.is_control()
}

/// Escapes a single partition value for embedding in a partition name.
#[must_use]
pub fn escape_partition_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).as_bytes() {
                let _ = write!(out, "%{byte:02X}");
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverses [`escape_partition_value`].
///
/// # Errors
///
/// Returns `Error::InvalidInput` on truncated or non-hex escapes, or when
/// the unescaped bytes are not valid UTF-8.
pub fn unescape_partition_value(escaped: &str) -> Result<String> {
    let mut bytes = Vec::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hi = chars.next();
            let lo = chars.next();
            let (Some(hi), Some(lo)) = (hi, lo) else {
                return Err(Error::InvalidInput(format!(
                    "truncated escape in partition value: {escaped}"
                )));
            };
            let byte = u8::from_str_radix(&format!("{hi}{lo}"), 16).map_err(|_| {
                Error::InvalidInput(format!("invalid escape %{hi}{lo} in partition value"))
            })?;
            bytes.push(byte);
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    String::from_utf8(bytes)
        .map_err(|_| Error::InvalidInput(format!("invalid UTF-8 in partition value: {escaped}")))
}

/// Builds a partition name from column names and values.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the arities differ, if there are no
/// columns, or if a column name is empty or contains reserved characters.
pub fn make_partition_name(columns: &[String], values: &[String]) -> Result<String> {
    if columns.is_empty() {
        return Err(Error::InvalidInput(
            "partition name requires at least one column".into(),
        ));
    }
    if columns.len() != values.len() {
        return Err(Error::InvalidInput(format!(
            "partition arity mismatch: {} columns, {} values",
            columns.len(),
            values.len()
        )));
    }
    let mut segments = Vec::with_capacity(columns.len());
    for (column, value) in columns.iter().zip(values) {
        if column.is_empty() || column.contains('=') || column.contains('/') {
            return Err(Error::InvalidInput(format!(
                "invalid partition column name: {column:?}"
            )));
        }
        segments.push(format!("{column}={}", escape_partition_value(value)));
    }
    Ok(segments.join("/"))
}

/// Parses a partition name back into ordered `(column, value)` pairs.
///
/// This is the inverse of [`make_partition_name`]: round-trip identity
/// holds for every value, including values containing `/`, `=` or `%`.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if a segment is missing `=` or a value
/// fails to unescape.
pub fn parse_partition_name(name: &str) -> Result<Vec<(String, String)>> {
    if name.is_empty() {
        return Err(Error::InvalidInput("empty partition name".into()));
    }
    let mut pairs = Vec::new();
    for segment in name.split('/') {
        let (column, escaped) = segment.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!("missing '=' in partition segment: {segment}"))
        })?;
        if column.is_empty() {
            return Err(Error::InvalidInput(format!(
                "empty column in partition segment: {segment}"
            )));
        }
        pairs.push((column.to_string(), unescape_partition_value(escaped)?));
    }
    Ok(pairs)
}
