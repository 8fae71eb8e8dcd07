//! Dynamic record value type.

use std::cmp::Ordering;
use std::fmt;

/// A record value as stored in an object store.
///
/// Records are trees of these values. Map entries are keyed by field name
/// and kept sorted in canonical CBOR order (length first, then bytewise),
/// so two maps holding the same fields always encode to the same bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (supports full i64 range).
    Integer(i64),
    /// 64-bit float. Never NaN when produced by this crate.
    Float(f64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Object with named fields, sorted canonically.
    Map(Vec<(String, Value)>),
}

/// Canonical ordering of map field names.
pub(crate) fn cmp_field(a: &str, b: &str) -> Ordering {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.as_bytes().cmp(b.as_bytes()),
        other => other,
    }
}

impl Value {
    /// Create an object from field/value pairs.
    ///
    /// Fields are sorted canonically; when a name repeats the last value wins.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut map = Value::Map(Vec::new());
        for (name, value) in fields {
            map.set(&name.into(), value);
        }
        map
    }

    /// Returns a short name for the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float. Integers widen.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as text, if it is a text string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get this value's fields, if it is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a direct field of a map.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        let fields = self.as_map()?;
        fields
            .binary_search_by(|(name, _)| cmp_field(name, field))
            .ok()
            .map(|i| &fields[i].1)
    }

    /// Follow a dotted path such as `"author.name"`.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |value, field| value.get(field))
    }

    /// Set a direct field, turning `Null` into an empty map first.
    ///
    /// Returns `false` when `self` is neither a map nor null.
    pub fn set(&mut self, field: &str, value: Value) -> bool {
        if self.is_null() {
            *self = Value::Map(Vec::new());
        }
        let Value::Map(fields) = self else {
            return false;
        };
        match fields.binary_search_by(|(name, _)| cmp_field(name, field)) {
            Ok(i) => fields[i].1 = value,
            Err(i) => fields.insert(i, (field.to_string(), value)),
        }
        true
    }

    /// Set the value at a dotted path, creating intermediate maps.
    ///
    /// Returns `false` when an intermediate value exists and is not a map.
    pub fn set_path(&mut self, path: &str, value: Value) -> bool {
        match path.split_once('.') {
            None => self.set(path, value),
            Some((head, rest)) => {
                if self.is_null() {
                    *self = Value::Map(Vec::new());
                }
                if self.get(head).is_none() && !self.set(head, Value::Map(Vec::new())) {
                    return false;
                }
                let Value::Map(fields) = self else {
                    return false;
                };
                match fields.binary_search_by(|(name, _)| cmp_field(name, head)) {
                    Ok(i) => fields[i].1.set_path(rest, value),
                    Err(_) => false,
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bytes(b) => write!(f, "h'{}'", hex(b)),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_sorts_and_dedups_fields() {
        let v = Value::object([
            ("tag", Value::from("a")),
            ("id", Value::from(1)),
            ("tag", Value::from("b")),
        ]);
        let names: Vec<_> = v.as_map().unwrap().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "tag"]);
        assert_eq!(v.get("tag"), Some(&Value::from("b")));
    }

    #[test]
    fn dotted_paths() {
        let mut v = Value::object([("author", Value::object([("name", Value::from("ann"))]))]);
        assert_eq!(v.get_path("author.name"), Some(&Value::from("ann")));
        assert_eq!(v.get_path("author.age"), None);

        assert!(v.set_path("author.age", Value::from(40)));
        assert_eq!(v.get_path("author.age"), Some(&Value::from(40)));

        assert!(v.set_path("meta.created.by", Value::from("cli")));
        assert_eq!(v.get_path("meta.created.by"), Some(&Value::from("cli")));
    }

    #[test]
    fn set_path_refuses_non_map_parent() {
        let mut v = Value::object([("n", Value::from(1))]);
        assert!(!v.set_path("n.x", Value::Null));
        assert!(!Value::from(3).set("x", Value::Null));
    }

    #[test]
    fn as_f64_widens_integers() {
        assert_eq!(Value::from(2).as_f64(), Some(2.0));
        assert_eq!(Value::from(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::from("2").as_f64(), None);
    }

    #[test]
    fn display_is_readable() {
        let v = Value::object([("id", Value::from(1)), ("b", Value::Bytes(vec![0xab]))]);
        assert_eq!(v.to_string(), "{b: h'ab', id: 1}");
    }
}
