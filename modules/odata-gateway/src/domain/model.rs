//! Domain models.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::DomainError;

/// One result row with canonical (first-letter upper-cased) keys.
pub type EntityRow = Map<String, Value>;

/// Validated entity set name taken from the route.
///
/// Appended to the backend base URL as one path segment, so it must not be
/// able to alter the path or start a query or fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntitySetName(String);

impl EntitySetName {
    /// # Errors
    /// Returns [`DomainError::InvalidEntitySet`] for an empty name, a name
    /// containing `/`, `?` or `#`, or one starting with `$`.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let valid = !raw.is_empty()
            && !raw.starts_with('$')
            && !raw.contains(['/', '?', '#']);
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(DomainError::InvalidEntitySet {
                name: raw.to_owned(),
            })
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntitySetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `GET /odata/{entity_set}` and of every `$batch` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySetPayload {
    #[serde(rename = "@odata.context")]
    pub context: String,
    pub value: Vec<EntityRow>,
}

impl EntitySetPayload {
    #[must_use]
    pub fn new(entity_set: &EntitySetName, value: Vec<EntityRow>) -> Self {
        Self {
            context: format!("$metadata#{entity_set}"),
            value,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_plain_names() {
        for name in ["Flights", "flight_delays", "Flights2008", "a.b"] {
            assert_eq!(EntitySetName::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn rejects_names_that_escape_the_segment() {
        for name in ["", "$metadata", "a/b", "a?b", "a#b", "../x"] {
            assert!(
                matches!(
                    EntitySetName::parse(name),
                    Err(DomainError::InvalidEntitySet { .. })
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn payload_serializes_context_first() {
        let name = EntitySetName::parse("Flights").unwrap();
        let row = json!({"Year": 2008}).as_object().cloned().unwrap();
        let payload = EntitySetPayload::new(&name, vec![row]);
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"@odata.context":"$metadata#Flights","value":[{"Year":2008}]}"#
        );
    }
}
