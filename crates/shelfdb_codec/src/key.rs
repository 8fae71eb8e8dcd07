//! Keys and their total order.
//!
//! A [`Key`] is anything that can identify a record or appear in an index:
//! numbers, strings, binary blobs and arrays of keys. Keys of different
//! kinds compare by kind first:
//!
//! ```text
//! Number < String < Binary < Array
//! ```
//!
//! Arrays compare element-wise, and a strict prefix sorts first.

use crate::error::{CodecError, CodecResult};
use crate::value::{hex, Value};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A record or index key.
#[derive(Debug, Clone)]
pub enum Key {
    /// A finite or infinite number. NaN is rejected on construction.
    Number(f64),
    /// A text key.
    String(String),
    /// A binary key, compared bytewise.
    Binary(Vec<u8>),
    /// A compound key.
    Array(Vec<Key>),
}

impl Key {
    /// Builds a numeric key, rejecting NaN and folding `-0.0` into `0.0`.
    pub fn number(n: f64) -> CodecResult<Self> {
        if n.is_nan() {
            return Err(CodecError::NaNForbidden);
        }
        Ok(Key::Number(if n == 0.0 { 0.0 } else { n }))
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::String(_) => 1,
            Key::Binary(_) => 2,
            Key::Array(_) => 3,
        }
    }

    /// Returns the number if this is a numeric key.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Key::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text if this is a string key.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the components if this is a compound key.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Key]> {
        match self {
            Key::Array(parts) => Some(parts),
            _ => None,
        }
    }

    /// Converts a value into a key, if it is a valid key.
    ///
    /// Integers and floats become numbers, text becomes a string key,
    /// bytes become binary and arrays convert element-wise. Anything else
    /// (null, bool, map, NaN, an array holding such) is not a key.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_value(value: &Value) -> CodecResult<Self> {
        match value {
            Value::Integer(n) => Ok(Key::Number(*n as f64)),
            Value::Float(x) => Key::number(*x),
            Value::Text(s) => Ok(Key::String(s.clone())),
            Value::Bytes(b) => Ok(Key::Binary(b.clone())),
            Value::Array(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<CodecResult<Vec<_>>>()
                .map(Key::Array),
            other => Err(CodecError::invalid_key(format!(
                "{} is not a valid key",
                other.type_name()
            ))),
        }
    }

    /// Converts the key into a value suitable for storing inside a record.
    ///
    /// Integral numbers inside the `i64` range become integers so that a
    /// generated key written back into a record looks like `{id: 1}`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn to_value(&self) -> Value {
        match self {
            Key::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Value::Integer(*n as i64)
                } else {
                    Value::Float(*n)
                }
            }
            Key::String(s) => Value::Text(s.clone()),
            Key::Binary(b) => Value::Bytes(b.clone()),
            Key::Array(parts) => Value::Array(parts.iter().map(Key::to_value).collect()),
        }
    }

    /// Converts the key into a value that decodes back to the same key.
    ///
    /// Unlike [`Key::to_value`], numbers always stay floats.
    #[must_use]
    pub fn to_exact_value(&self) -> Value {
        match self {
            Key::Number(n) => Value::Float(*n),
            Key::String(s) => Value::Text(s.clone()),
            Key::Binary(b) => Value::Bytes(b.clone()),
            Key::Array(parts) => Value::Array(parts.iter().map(Key::to_exact_value).collect()),
        }
    }

    /// Returns true when `self` is an array key starting with all of `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &[Key]) -> bool {
        match self {
            Key::Array(parts) => parts.len() >= prefix.len() && parts[..prefix.len()] == *prefix,
            _ => false,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) => a.total_cmp(b),
            (Key::String(a), Key::String(b)) => a.cmp(b),
            (Key::Binary(a), Key::Binary(b)) => a.cmp(b),
            (Key::Array(a), Key::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Key::Number(n) => n.to_bits().hash(state),
            Key::String(s) => s.hash(state),
            Key::Binary(b) => b.hash(state),
            Key::Array(parts) => parts.hash(state),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{n}"),
            Key::String(s) => write!(f, "{s:?}"),
            Key::Binary(b) => write!(f, "h'{}'", hex(b)),
            Key::Array(parts) => {
                write!(f, "[")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{part}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl TryFrom<&Value> for Key {
    type Error = CodecError;

    fn try_from(value: &Value) -> CodecResult<Self> {
        Key::from_value(value)
    }
}

impl From<i64> for Key {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Key::Number(n as f64)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Number(f64::from(n))
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Number(f64::from(n))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<Vec<Key>> for Key {
    fn from(parts: Vec<Key>) -> Self {
        Key::Array(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_order_before_contents() {
        let mut keys = vec![
            Key::Array(vec![]),
            Key::Binary(vec![0]),
            Key::from("a"),
            Key::from(100),
            Key::Number(f64::NEG_INFINITY),
        ];
        keys.sort();
        assert_eq!(keys[0], Key::Number(f64::NEG_INFINITY));
        assert_eq!(keys[1], Key::from(100));
        assert_eq!(keys[2], Key::from("a"));
        assert_eq!(keys[3], Key::Binary(vec![0]));
        assert_eq!(keys[4], Key::Array(vec![]));
    }

    #[test]
    fn arrays_compare_elementwise_then_length() {
        let short = Key::Array(vec![Key::from(2)]);
        let long = Key::Array(vec![Key::from(2), Key::from("cow")]);
        let other = Key::Array(vec![Key::from(3)]);
        assert!(short < long);
        assert!(long < other);
        assert!(long.has_prefix(&[Key::from(2)]));
        assert!(!other.has_prefix(&[Key::from(2)]));
    }

    #[test]
    fn nan_and_negative_zero() {
        assert!(matches!(Key::number(f64::NAN), Err(CodecError::NaNForbidden)));
        assert_eq!(Key::number(-0.0).unwrap(), Key::from(0));
        assert!(Key::from_value(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn value_conversion() {
        let v = Value::Array(vec![Value::from(1), Value::from("x"), Value::Bytes(vec![7])]);
        let key = Key::from_value(&v).unwrap();
        assert_eq!(
            key,
            Key::Array(vec![Key::from(1), Key::from("x"), Key::Binary(vec![7])])
        );
        assert_eq!(key.to_value(), v);

        assert!(Key::from_value(&Value::Null).is_err());
        assert!(Key::from_value(&Value::Bool(true)).is_err());
        assert!(Key::from_value(&Value::Array(vec![Value::Null])).is_err());
    }

    #[test]
    fn to_value_keeps_fractions() {
        assert_eq!(Key::Number(1.5).to_value(), Value::Float(1.5));
        assert_eq!(Key::from(7).to_value(), Value::Integer(7));
        assert_eq!(Key::from(7).to_exact_value(), Value::Float(7.0));
    }

    #[test]
    fn display() {
        let key = Key::Array(vec![Key::from(2), Key::from("ox")]);
        assert_eq!(key.to_string(), "[2, \"ox\"]");
    }
}
