//! # shelfdb codec
//!
//! Record values, keys and the canonical CBOR encoding shelfdb persists.
//!
//! - [`Value`] is the dynamic record tree stored in object stores.
//! - [`Key`] is the totally ordered key type used for primary keys,
//!   index keys and key ranges.
//! - [`to_canonical_cbor`] / [`from_cbor`] encode values deterministically,
//!   so identical records always produce identical bytes.
//!
//! ## Canonical CBOR Rules
//!
//! - Map fields are text and sorted (length first, then bytewise)
//! - Integers use shortest encoding
//! - Floats are 64-bit doubles, never NaN
//! - No tags, no indefinite-length items
//!
//! ## Usage
//!
//! ```
//! use shelfdb_codec::{from_cbor, to_canonical_cbor, Key, Value};
//!
//! let note = Value::object([("id", Value::from(1)), ("tag", Value::from("a"))]);
//! let bytes = to_canonical_cbor(&note).unwrap();
//! assert_eq!(from_cbor(&bytes).unwrap(), note);
//!
//! let key = Key::from_value(note.get("id").unwrap()).unwrap();
//! assert_eq!(key, Key::from(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod key;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use key::Key;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key_strategy() -> impl Strategy<Value = Key> {
        let leaf = prop_oneof![
            (-1.0e12f64..1.0e12).prop_map(|n| Key::number(n).unwrap()),
            "[a-z]{0,8}".prop_map(Key::String),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(Key::Binary),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(Key::Array)
        })
    }

    proptest! {
        #[test]
        fn key_survives_encoding(key in key_strategy()) {
            let bytes = to_canonical_cbor(&key.to_exact_value()).unwrap();
            prop_assert_eq!(Key::from_value(&from_cbor(&bytes).unwrap()).unwrap(), key);
        }

        #[test]
        fn key_order_is_antisymmetric(a in key_strategy(), b in key_strategy()) {
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }
    }

    #[test]
    fn integer_and_float_values_make_equal_keys() {
        let a = Key::from_value(&Value::from(4)).unwrap();
        let b = Key::from_value(&Value::from(4.0)).unwrap();
        assert_eq!(a, b);
    }
}
