//! Property-based test generators using proptest.
//!
//! Provides strategies for keys, records and ranges that stay within
//! what the database accepts.

use proptest::prelude::*;
use shelfdb_codec::{Key, Value};
use shelfdb_core::KeyRange;

/// Strategy for valid store and database names.
pub fn store_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for scalar keys of every kind.
pub fn scalar_key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        (-1_000_000i64..1_000_000).prop_map(Key::from),
        prop::string::string_regex("[a-z]{0,8}")
            .expect("Invalid regex")
            .prop_map(Key::from),
        prop::collection::vec(any::<u8>(), 0..6).prop_map(Key::Binary),
    ]
}

/// Strategy for keys, including one level of compound keys.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        4 => scalar_key_strategy(),
        1 => prop::collection::vec(scalar_key_strategy(), 0..4).prop_map(Key::Array),
    ]
}

/// Strategy for small integer keys, dense enough to collide.
pub fn small_int_key_strategy() -> impl Strategy<Value = Key> {
    (0i32..64).prop_map(Key::from)
}

/// Strategy for field values that are themselves valid keys or not.
pub fn field_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        prop::string::string_regex("[a-z ]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::from),
    ]
}

/// Strategy for records with an integer `id` and a string `tag` plus a
/// few random fields.
pub fn record_strategy() -> impl Strategy<Value = Value> {
    (
        0i32..64,
        prop::sample::select(vec!["a", "b", "c", "d"]),
        prop::collection::vec(("[j-s]{1,6}", field_value_strategy()), 0..4),
    )
        .prop_map(|(id, tag, extra)| {
            let mut record = Value::object([("id", Value::from(id)), ("tag", Value::from(tag))]);
            for (name, value) in extra {
                record.set(&name, value);
            }
            record
        })
}

/// Strategy for ranges over small integer keys, bounded or not.
pub fn int_range_strategy() -> impl Strategy<Value = KeyRange> {
    (
        prop::option::of((0i32..64, any::<bool>())),
        prop::option::of((0i32..64, any::<bool>())),
    )
        .prop_filter_map("empty range", |(lower, upper)| match (lower, upper) {
            (Some((lo, lo_open)), Some((hi, hi_open))) => KeyRange::bound(lo, hi, lo_open, hi_open).ok(),
            (Some((lo, open)), None) => Some(KeyRange::lower_bound(lo, open)),
            (None, Some((hi, open))) => Some(KeyRange::upper_bound(hi, open)),
            (None, None) => None,
        })
}
