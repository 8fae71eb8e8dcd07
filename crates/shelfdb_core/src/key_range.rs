//! Key ranges.
//!
//! A [`KeyRange`] bounds a key space from below, above, both or neither.
//! Each bound is independently open (exclusive) or closed (inclusive).

use crate::error::{CoreError, CoreResult};
use shelfdb_codec::Key;
use std::fmt;
use std::ops::Bound;

/// An interval over keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    lower: Option<Key>,
    upper: Option<Key>,
    lower_open: bool,
    upper_open: bool,
}

/// Comparison operators accepted by [`KeyRange::where_op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `^`, prefix match
    StartsWith,
}

impl std::str::FromStr for RangeOp {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "=" => Ok(Self::Eq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "^" => Ok(Self::StartsWith),
            other => Err(CoreError::argument(format!("unknown range operator '{other}'"))),
        }
    }
}

impl KeyRange {
    /// The range holding exactly `key`.
    #[must_use]
    pub fn only(key: impl Into<Key>) -> Self {
        let key = key.into();
        Self {
            lower: Some(key.clone()),
            upper: Some(key),
            lower_open: false,
            upper_open: false,
        }
    }

    /// A range bounded on both sides.
    ///
    /// # Errors
    ///
    /// Returns `Argument` if `lower > upper`, or if they are equal and
    /// either side is open.
    pub fn bound(
        lower: impl Into<Key>,
        upper: impl Into<Key>,
        lower_open: bool,
        upper_open: bool,
    ) -> CoreResult<Self> {
        let (lower, upper) = (lower.into(), upper.into());
        if lower > upper || (lower == upper && (lower_open || upper_open)) {
            return Err(CoreError::argument(format!(
                "empty key range: lower {lower} upper {upper}"
            )));
        }
        Ok(Self {
            lower: Some(lower),
            upper: Some(upper),
            lower_open,
            upper_open,
        })
    }

    /// Everything at or above `key` (above when `open`).
    #[must_use]
    pub fn lower_bound(key: impl Into<Key>, open: bool) -> Self {
        Self {
            lower: Some(key.into()),
            upper: None,
            lower_open: open,
            upper_open: false,
        }
    }

    /// Everything at or below `key` (below when `open`).
    #[must_use]
    pub fn upper_bound(key: impl Into<Key>, open: bool) -> Self {
        Self {
            lower: None,
            upper: Some(key.into()),
            lower_open: false,
            upper_open: open,
        }
    }

    /// Keys that start with `prefix`.
    ///
    /// For a string prefix this is every string beginning with it. For an
    /// array prefix it is every array key whose leading elements equal the
    /// prefix elements, the form used to scan compound indexes. The upper
    /// bound is exclusive.
    ///
    /// # Errors
    ///
    /// Returns `Argument` for numeric or binary prefixes.
    pub fn starts_with(prefix: impl Into<Key>) -> CoreResult<Self> {
        let prefix = prefix.into();
        let upper = match &prefix {
            Key::String(s) => Some(string_prefix_end(s)),
            Key::Array(parts) => parts.split_last().map(|(last, head)| {
                let mut parts = head.to_vec();
                parts.push(successor(last));
                Key::Array(parts)
            }),
            other => {
                return Err(CoreError::argument(format!(
                    "prefix ranges need a string or array key, got {other}"
                )))
            }
        };
        Ok(Self {
            lower: Some(prefix),
            upper,
            lower_open: false,
            upper_open: true,
        })
    }

    /// Builds a range from one or two comparisons, e.g. `> 3` and `<= 9`.
    ///
    /// # Errors
    ///
    /// Returns `Argument` when the comparisons do not describe one interval.
    pub fn where_op(op: RangeOp, value: Key, second: Option<(RangeOp, Key)>) -> CoreResult<Self> {
        let first = match op {
            RangeOp::Eq => Self::only(value),
            RangeOp::StartsWith => Self::starts_with(value)?,
            RangeOp::Gt => Self::lower_bound(value, true),
            RangeOp::Ge => Self::lower_bound(value, false),
            RangeOp::Lt => Self::upper_bound(value, true),
            RangeOp::Le => Self::upper_bound(value, false),
        };
        let Some((op2, value2)) = second else {
            return Ok(first);
        };
        match (op, op2) {
            (RangeOp::Gt | RangeOp::Ge, RangeOp::Lt | RangeOp::Le) => Self::bound(
                value_of(first.lower)?,
                value2,
                op == RangeOp::Gt,
                op2 == RangeOp::Lt,
            ),
            _ => Err(CoreError::argument(format!(
                "cannot combine {op:?} with {op2:?}"
            ))),
        }
    }

    /// Lower key, if bounded below.
    #[must_use]
    pub fn lower(&self) -> Option<&Key> {
        self.lower.as_ref()
    }

    /// Upper key, if bounded above.
    #[must_use]
    pub fn upper(&self) -> Option<&Key> {
        self.upper.as_ref()
    }

    /// Whether the lower bound excludes its key.
    #[must_use]
    pub fn lower_open(&self) -> bool {
        self.lower_open
    }

    /// Whether the upper bound excludes its key.
    #[must_use]
    pub fn upper_open(&self) -> bool {
        self.upper_open
    }

    /// Lower bound in `std::ops::Bound` form.
    #[must_use]
    pub fn start_bound(&self) -> Bound<&Key> {
        match (&self.lower, self.lower_open) {
            (None, _) => Bound::Unbounded,
            (Some(k), false) => Bound::Included(k),
            (Some(k), true) => Bound::Excluded(k),
        }
    }

    /// Upper bound in `std::ops::Bound` form.
    #[must_use]
    pub fn end_bound(&self) -> Bound<&Key> {
        match (&self.upper, self.upper_open) {
            (None, _) => Bound::Unbounded,
            (Some(k), false) => Bound::Included(k),
            (Some(k), true) => Bound::Excluded(k),
        }
    }

    /// True when `key` lies inside the range.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        let above = match self.start_bound() {
            Bound::Unbounded => true,
            Bound::Included(l) => key >= l,
            Bound::Excluded(l) => key > l,
        };
        let below = match self.end_bound() {
            Bound::Unbounded => true,
            Bound::Included(u) => key <= u,
            Bound::Excluded(u) => key < u,
        };
        above && below
    }
}

/// The first string after every string that starts with `prefix`: the
/// prefix with its last char bumped. Trailing `char::MAX` chars cannot be
/// bumped and are dropped first. With nothing left, binary keys are next.
fn string_prefix_end(prefix: &str) -> Key {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let next = match last {
            '\u{d7ff}' => Some('\u{e000}'),
            c => char::from_u32(u32::from(c) + 1),
        };
        if let Some(next) = next {
            chars.push(next);
            return Key::String(chars.into_iter().collect());
        }
    }
    Key::Binary(Vec::new())
}

/// The smallest key strictly greater than `key`.
fn successor(key: &Key) -> Key {
    match key {
        Key::Number(n) if *n == f64::INFINITY => Key::String(String::new()),
        Key::Number(n) => {
            let bits = n.to_bits();
            let next = if bits == 1 << 63 {
                0.0
            } else if n.is_sign_negative() {
                f64::from_bits(bits - 1)
            } else {
                f64::from_bits(bits + 1)
            };
            Key::Number(next)
        }
        Key::String(s) => Key::String(format!("{s}\0")),
        Key::Binary(b) => {
            let mut b = b.clone();
            b.push(0);
            Key::Binary(b)
        }
        Key::Array(parts) => {
            let mut parts = parts.clone();
            parts.push(Key::Number(f64::NEG_INFINITY));
            Key::Array(parts)
        }
    }
}

fn value_of(key: Option<Key>) -> CoreResult<Key> {
    key.ok_or_else(|| CoreError::argument("range has no lower key"))
}

/// Helper for range-contains checks on optional ranges.
pub(crate) fn in_range(range: Option<&KeyRange>, key: &Key) -> bool {
    range.map_or(true, |r| r.contains(key))
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lower {
            Some(k) => write!(f, "{}{k}", if self.lower_open { "(" } else { "[" })?,
            None => write!(f, "(-inf")?,
        }
        write!(f, ", ")?;
        match &self.upper {
            Some(k) => write!(f, "{k}{}", if self.upper_open { ")" } else { "]" }),
            None => write!(f, "+inf)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contains_exactly_one_key() {
        let r = KeyRange::only("a");
        assert!(r.contains(&Key::from("a")));
        assert!(!r.contains(&Key::from("ab")));
    }

    #[test]
    fn bound_respects_open_flags() {
        let r = KeyRange::bound(2, 3, false, true).unwrap();
        assert!(r.contains(&Key::from(2)));
        assert!(!r.contains(&Key::from(3)));
        assert_eq!(r.to_string(), "[2, 3)");
    }

    #[test]
    fn bound_rejects_inverted_or_empty() {
        assert!(KeyRange::bound(3, 2, false, false).is_err());
        assert!(KeyRange::bound(3, 3, true, false).is_err());
        assert!(KeyRange::bound(3, 3, false, false).is_ok());
    }

    #[test]
    fn string_prefix() {
        let r = KeyRange::starts_with("ab").unwrap();
        assert!(r.contains(&Key::from("ab")));
        assert!(r.contains(&Key::from("abzzz")));
        assert!(!r.contains(&Key::from("ac")));
        assert!(KeyRange::starts_with(1).is_err());
    }

    #[test]
    fn string_prefix_keeps_astral_chars() {
        let r = KeyRange::starts_with("a").unwrap();
        for inside in ["a", "ab", "a\u{4e2d}", "a\u{1f600}", "a\u{ffff}", "a\u{10ffff}z"] {
            assert!(r.contains(&Key::from(inside)), "{inside:?}");
        }
        assert!(!r.contains(&Key::from("b")));
        assert!(!r.contains(&Key::Binary(vec![0x61])));

        let r = KeyRange::starts_with("\u{d7ff}").unwrap();
        assert_eq!(r.upper(), Some(&Key::from("\u{e000}")));
        let r = KeyRange::starts_with("\u{10ffff}").unwrap();
        assert!(r.contains(&Key::from("\u{10ffff}\u{10ffff}")));
        assert_eq!(r.upper(), Some(&Key::Binary(Vec::new())));
    }

    #[test]
    fn array_prefix() {
        let r = KeyRange::starts_with(vec![Key::from(2)]).unwrap();
        assert!(r.contains(&Key::Array(vec![Key::from(2), Key::from("cow")])));
        assert!(r.contains(&Key::Array(vec![Key::from(2)])));
        assert!(!r.contains(&Key::Array(vec![Key::from(3), Key::from("ant")])));
        assert!(!r.contains(&Key::Array(vec![Key::from(1), Key::from("zebra")])));
    }

    #[test]
    fn array_prefix_admits_any_trailing_element() {
        let r = KeyRange::starts_with(vec![Key::from(1)]).unwrap();
        let tails = [
            Key::Number(f64::INFINITY),
            Key::from("z"),
            Key::Binary(vec![0xff]),
            Key::Array(vec![Key::from(5)]),
            Key::Array(vec![Key::Array(Vec::new())]),
        ];
        for tail in tails {
            let key = Key::Array(vec![Key::from(1), tail]);
            assert!(r.contains(&key), "{key}");
        }
        assert!(!r.contains(&Key::Array(vec![Key::number(1.000_000_1).unwrap()])));

        let nested = KeyRange::starts_with(vec![Key::from("x"), Key::Array(vec![Key::from(1)])]).unwrap();
        assert!(nested.contains(&Key::Array(vec![
            Key::from("x"),
            Key::Array(vec![Key::from(1)]),
            Key::Array(vec![Key::from(9)]),
        ])));
        assert!(!nested.contains(&Key::Array(vec![
            Key::from("x"),
            Key::Array(vec![Key::from(1), Key::from(0)]),
        ])));

        let everything = KeyRange::starts_with(Vec::<Key>::new()).unwrap();
        assert!(everything.contains(&Key::Array(vec![Key::Array(vec![Key::from("deep")])])));
        assert!(!everything.contains(&Key::Binary(vec![0xff])));
    }

    #[test]
    fn number_successor_is_adjacent() {
        assert_eq!(successor(&Key::Number(-0.0)), Key::Number(0.0));
        assert_eq!(successor(&Key::Number(f64::NEG_INFINITY)), Key::Number(-f64::MAX));
        assert_eq!(successor(&Key::Number(f64::MAX)), Key::Number(f64::INFINITY));
        assert_eq!(successor(&Key::Number(f64::INFINITY)), Key::from(""));
        assert!(successor(&Key::from(1)) > Key::from(1));
        assert!(successor(&Key::Number(-1.0)) > Key::Number(-1.0));
    }

    #[test]
    fn where_op_combines_two_comparisons() {
        let r = KeyRange::where_op(RangeOp::Gt, Key::from(1), Some((RangeOp::Le, Key::from(5))))
            .unwrap();
        assert!(!r.contains(&Key::from(1)));
        assert!(r.contains(&Key::from(5)));
        assert!(KeyRange::where_op(RangeOp::Lt, Key::from(1), Some((RangeOp::Gt, Key::from(0))))
            .is_err());
        assert_eq!("^".parse::<RangeOp>().unwrap(), RangeOp::StartsWith);
        assert!("!=".parse::<RangeOp>().is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prefix_range_matches_str_prefix(prefix in "[a-c]{0,3}", s in "[a-c]{0,5}") {
                let r = KeyRange::starts_with(prefix.as_str()).unwrap();
                prop_assert_eq!(r.contains(&Key::from(s.as_str())), s.starts_with(&prefix));
            }

            #[test]
            fn prefix_range_matches_str_prefix_across_planes(
                prefix in "[a\u{7ff}\u{d7ff}\u{e000}\u{ffff}\u{1f600}\u{10ffff}]{0,3}",
                s in "[a\u{7ff}\u{d7ff}\u{e000}\u{ffff}\u{1f600}\u{10ffff}]{0,5}",
            ) {
                let r = KeyRange::starts_with(prefix.as_str()).unwrap();
                prop_assert_eq!(r.contains(&Key::from(s.as_str())), s.starts_with(&prefix));
            }

            #[test]
            fn array_prefix_matches_has_prefix(
                prefix in prop::collection::vec(0i64..3, 0..3),
                key in prop::collection::vec(0i64..3, 0..4),
                nested in prop::option::of(prop::collection::vec(0i64..3, 0..2)),
            ) {
                let prefix: Vec<Key> = prefix.into_iter().map(Key::from).collect();
                let mut key: Vec<Key> = key.into_iter().map(Key::from).collect();
                if let Some(inner) = nested {
                    key.push(Key::Array(inner.into_iter().map(Key::from).collect()));
                }
                let key = Key::Array(key);
                let r = KeyRange::starts_with(prefix.clone()).unwrap();
                prop_assert_eq!(r.contains(&key), key.has_prefix(&prefix));
            }

            #[test]
            fn bound_matches_integer_comparison(
                lo in -20i64..20,
                width in 0i64..20,
                lo_open in any::<bool>(),
                hi_open in any::<bool>(),
                n in -30i64..30,
            ) {
                let hi = lo + width;
                prop_assume!(width > 0 || !(lo_open || hi_open));
                let r = KeyRange::bound(lo, hi, lo_open, hi_open).unwrap();
                let above = if lo_open { n > lo } else { n >= lo };
                let below = if hi_open { n < hi } else { n <= hi };
                prop_assert_eq!(r.contains(&Key::from(n)), above && below);
            }
        }
    }
}
