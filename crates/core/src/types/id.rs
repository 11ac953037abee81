//! Entity identifiers as they arrive from the backend.
//!
//! The backend is inconsistent about id types: the same record may carry
//! `"id": 7` from one endpoint and `"id": "7"` from another. [`EntityId`]
//! accepts both and compares by string form, so `7` and `"7"` are the same id.

use core::fmt;
use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// An opaque record identifier, numeric or textual.
///
/// Equality and hashing use the string form.
///
/// ```
/// use chinchin_core::EntityId;
///
/// assert_eq!(EntityId::from(7), EntityId::from("7"));
/// assert_ne!(EntityId::from(7), EntityId::from("07"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric id (serialized as a JSON number).
    Number(i64),
    /// Textual id (serialized as a JSON string).
    Text(String),
}

impl EntityId {
    /// The string form used for comparisons and URL paths.
    #[must_use]
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Read the id of a JSON record (`{"id": ...}`), if it has a usable one.
    #[must_use]
    pub fn of_record(record: &serde_json::Value) -> Option<Self> {
        match record.get("id")? {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Number)
                .or_else(|| Some(Self::Text(n.to_string()))),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Whether `record` carries this id (string-equal).
    #[must_use]
    pub fn matches(&self, record: &serde_json::Value) -> bool {
        Self::of_record(record).is_some_and(|id| id == *self)
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        self.as_key() == other.as_key()
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_key().hash(state);
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        Self::Number(i64::from(id))
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl std::str::FromStr for EntityId {
    type Err = std::convert::Infallible;

    /// Parses numeric-looking input as a number, anything else as text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()
            .map_or_else(|_| Self::Text(s.to_owned()), Self::Number))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_number_and_text_compare_equal() {
        assert_eq!(EntityId::from(42), EntityId::from("42"));
        assert_ne!(EntityId::from(42), EntityId::from("43"));
    }

    #[test]
    fn test_hash_is_consistent_with_eq() {
        let mut set = HashSet::new();
        set.insert(EntityId::from(1));
        assert!(set.contains(&EntityId::from("1")));
    }

    #[test]
    fn test_deserialize_untagged() {
        let n: EntityId = serde_json::from_value(json!(5)).unwrap();
        let s: EntityId = serde_json::from_value(json!("abc")).unwrap();
        assert!(matches!(n, EntityId::Number(5)));
        assert!(matches!(s, EntityId::Text(ref t) if t == "abc"));
    }

    #[test]
    fn test_of_record() {
        assert_eq!(
            EntityId::of_record(&json!({"id": 3, "name": "Rose"})),
            Some(EntityId::from(3))
        );
        assert_eq!(
            EntityId::of_record(&json!({"id": "p-9"})),
            Some(EntityId::from("p-9"))
        );
        assert_eq!(EntityId::of_record(&json!({"name": "no id"})), None);
        assert_eq!(EntityId::of_record(&json!({"id": null})), None);
        assert_eq!(EntityId::of_record(&json!([1, 2])), None);
    }

    #[test]
    fn test_matches_across_types() {
        let id = EntityId::from("2");
        assert!(id.matches(&json!({"id": 2})));
        assert!(!id.matches(&json!({"id": 3})));
    }

    #[test]
    fn test_from_str() {
        let n: EntityId = "17".parse().unwrap();
        let t: EntityId = "tulip-17".parse().unwrap();
        assert!(matches!(n, EntityId::Number(17)));
        assert!(matches!(t, EntityId::Text(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId::from(8).to_string(), "8");
        assert_eq!(EntityId::from("x").to_string(), "x");
    }
}
