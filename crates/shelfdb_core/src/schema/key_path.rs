//! Key paths: where in a record its key lives.

use shelfdb_codec::{Key, Value};
use std::fmt;

/// A dotted field path, or an ordered list of them for compound keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPath {
    /// One field, possibly nested: `"id"`, `"author.name"`.
    Field(String),
    /// Several fields whose values form an array key: `["horn", "name"]`.
    Composite(Vec<String>),
}

impl KeyPath {
    /// True for compound key paths.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    /// The field paths this key path reads.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Field(f) => vec![f.as_str()],
            Self::Composite(fs) => fs.iter().map(String::as_str).collect(),
        }
    }

    /// Extracts the key of `record`.
    ///
    /// Returns `None` when a field is missing or does not hold a valid key.
    /// A composite path needs every component present.
    #[must_use]
    pub fn extract(&self, record: &Value) -> Option<Key> {
        match self {
            Self::Field(path) => Key::from_value(record.get_path(path)?).ok(),
            Self::Composite(paths) => paths
                .iter()
                .map(|p| record.get_path(p).and_then(|v| Key::from_value(v).ok()))
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
        }
    }

    /// Extracts the index keys of `record` for a multi-entry index.
    ///
    /// An array value contributes each distinct valid element; invalid
    /// elements are skipped. A non-array value contributes itself.
    #[must_use]
    pub fn extract_multi(&self, record: &Value) -> Vec<Key> {
        let Self::Field(path) = self else {
            return self.extract(record).into_iter().collect();
        };
        match record.get_path(path) {
            Some(Value::Array(items)) => {
                let mut keys: Vec<Key> = items
                    .iter()
                    .filter_map(|v| Key::from_value(v).ok())
                    .collect();
                keys.sort();
                keys.dedup();
                keys
            }
            Some(v) => Key::from_value(v).ok().into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Writes `key` into `record` at this path. Only single-field paths
    /// can be written; returns `false` otherwise or when a parent is not a map.
    pub fn inject(&self, record: &mut Value, key: &Key) -> bool {
        match self {
            Self::Field(path) => record.set_path(path, key.to_value()),
            Self::Composite(_) => false,
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(p) => write!(f, "{p}"),
            Self::Composite(ps) => write!(f, "[{}]", ps.join(", ")),
        }
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        Self::Field(path.to_string())
    }
}

impl From<String> for KeyPath {
    fn from(path: String) -> Self {
        Self::Field(path)
    }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(paths: [&str; N]) -> Self {
        Self::Composite(paths.iter().map(|p| (*p).to_string()).collect())
    }
}

impl From<Vec<String>> for KeyPath {
    fn from(paths: Vec<String>) -> Self {
        Self::Composite(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animal() -> Value {
        Value::object([
            ("id", Value::from(7)),
            ("name", Value::from("cow")),
            ("horn", Value::from(2)),
            ("tags", Value::Array(vec![Value::from("farm"), Value::from("milk"), Value::from("farm"), Value::Null])),
            ("meta", Value::object([("origin", Value::from("eu"))])),
        ])
    }

    #[test]
    fn single_and_nested_fields() {
        let a = animal();
        assert_eq!(KeyPath::from("id").extract(&a), Some(Key::from(7)));
        assert_eq!(KeyPath::from("meta.origin").extract(&a), Some(Key::from("eu")));
        assert_eq!(KeyPath::from("missing").extract(&a), None);
        assert_eq!(KeyPath::from("meta").extract(&a), None);
    }

    #[test]
    fn composite_needs_every_part() {
        let a = animal();
        assert_eq!(
            KeyPath::from(["horn", "name"]).extract(&a),
            Some(Key::Array(vec![Key::from(2), Key::from("cow")]))
        );
        assert_eq!(KeyPath::from(["horn", "legs"]).extract(&a), None);
    }

    #[test]
    fn multi_entry_dedups_and_skips_invalid() {
        let keys = KeyPath::from("tags").extract_multi(&animal());
        assert_eq!(keys, vec![Key::from("farm"), Key::from("milk")]);
        assert_eq!(KeyPath::from("name").extract_multi(&animal()), vec![Key::from("cow")]);
    }

    #[test]
    fn inject_writes_generated_keys() {
        let mut record = Value::object([("tag", Value::from("a"))]);
        assert!(KeyPath::from("id").inject(&mut record, &Key::from(4)));
        assert_eq!(record.get("id"), Some(&Value::from(4)));
        assert!(!KeyPath::from(["a", "b"]).inject(&mut record, &Key::from(1)));
    }
}
