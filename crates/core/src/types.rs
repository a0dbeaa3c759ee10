use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A schemaless row as returned by the data store.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Identifier of a record as supplied by a caller.
///
/// Backing collections key rows by text, integers, or UUIDs, so the id is
/// kept as text and compared against stored values by canonical form
/// (see [`canonical_text`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Render a JSON value the way Postgres renders `column::text`.
///
/// Strings are taken verbatim; numbers and booleans use their JSON form.
/// `null` has no text form and never matches a filter.
pub fn canonical_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_text_matches_text_cast() {
        assert_eq!(canonical_text(&json!("sem-1")).as_deref(), Some("sem-1"));
        assert_eq!(canonical_text(&json!(42)).as_deref(), Some("42"));
        assert_eq!(canonical_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(canonical_text(&json!(null)), None);
    }

    #[test]
    fn record_id_serializes_as_plain_string() {
        let id = RecordId::from("sem-1");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("sem-1"));
        assert_eq!(id.to_string(), "sem-1");
    }
}
