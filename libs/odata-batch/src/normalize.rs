//! Result-row key casing.
//!
//! The gateway's casing contract: upper-case the first character of a key and
//! leave the rest untouched. This is deliberately not `PascalCase`:
//! `unique_carrier` becomes `Unique_carrier`, not `UniqueCarrier`. The
//! `$metadata` document runs its property names through [`normalize_key`] too,
//! so both sides of the contract always agree.

use serde_json::{Map, Value};

/// Upper-case the first character of `key`.
///
/// Uses full Unicode case mapping, so a first character may expand to more
/// than one (`\u{df}` → `SS`). The empty key is returned unchanged.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rename the top-level keys of one result row. Values, including nested
/// objects, are moved through untouched and key order is preserved.
///
/// When two keys normalize to the same name the later one wins.
#[must_use]
pub fn normalize_row(row: Map<String, Value>) -> Map<String, Value> {
    row.into_iter()
        .map(|(key, value)| (normalize_key(&key), value))
        .collect()
}
