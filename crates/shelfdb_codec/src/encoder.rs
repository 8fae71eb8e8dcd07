//! Canonical CBOR encoding of records.
//!
//! Records reach the journal through this encoder, so equal records always
//! produce equal bytes:
//! - map fields are written in canonical order (length first, then bytewise)
//! - every length and integer takes its shortest head
//! - floats are always 64-bit doubles
//! - nothing is indefinite-length

use crate::error::{CodecError, CodecResult};
use crate::value::{cmp_field, Value};

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

const SIMPLE_FALSE: u8 = 0xf4;
const SIMPLE_TRUE: u8 = 0xf5;
const SIMPLE_NULL: u8 = 0xf6;
const FLOAT64: u8 = 0xfb;

/// Encodes `value` into a fresh buffer.
///
/// # Errors
///
/// `NaNForbidden` if the value holds a NaN anywhere.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// Appends canonical CBOR items to a buffer. Several values can be written
/// back to back, as the journal does for one frame.
#[derive(Debug, Default)]
pub struct CanonicalEncoder {
    out: Vec<u8>,
}

impl CanonicalEncoder {
    /// An empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty encoder with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
        }
    }

    /// Appends one value.
    ///
    /// # Errors
    ///
    /// `NaNForbidden` for NaN floats. Bytes written before the NaN stay in
    /// the buffer.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.out.push(SIMPLE_NULL),
            Value::Bool(flag) => self.out.push(if *flag { SIMPLE_TRUE } else { SIMPLE_FALSE }),
            Value::Integer(n) => match u64::try_from(*n) {
                Ok(unsigned) => self.head(MAJOR_UNSIGNED, unsigned),
                // -1 - n is non-negative and fits for every negative i64
                Err(_) => self.head(MAJOR_NEGATIVE, n.unsigned_abs() - 1),
            },
            Value::Float(x) => {
                if x.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                self.out.push(FLOAT64);
                self.out.extend_from_slice(&x.to_be_bytes());
            }
            Value::Bytes(bytes) => self.sized(MAJOR_BYTES, bytes),
            Value::Text(text) => self.sized(MAJOR_TEXT, text.as_bytes()),
            Value::Array(items) => {
                self.head(MAJOR_ARRAY, items.len() as u64);
                for item in items {
                    self.encode(item)?;
                }
            }
            Value::Map(fields) => {
                let mut sorted: Vec<&(String, Value)> = fields.iter().collect();
                sorted.sort_by(|(a, _), (b, _)| cmp_field(a, b));
                self.head(MAJOR_MAP, sorted.len() as u64);
                for (name, field) in sorted {
                    self.sized(MAJOR_TEXT, name.as_bytes());
                    self.encode(field)?;
                }
            }
        }
        Ok(())
    }

    /// The bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Takes the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    fn sized(&mut self, major: u8, payload: &[u8]) {
        self.head(major, payload.len() as u64);
        self.out.extend_from_slice(payload);
    }

    /// Writes an item head with the shortest argument width.
    #[allow(clippy::cast_possible_truncation)]
    fn head(&mut self, major: u8, arg: u64) {
        let tag = major << 5;
        match arg {
            0..=23 => self.out.push(tag | arg as u8),
            24..=0xff => self.out.extend_from_slice(&[tag | 24, arg as u8]),
            0x100..=0xffff => {
                self.out.push(tag | 25);
                self.out.extend_from_slice(&(arg as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.out.push(tag | 26);
                self.out.extend_from_slice(&(arg as u32).to_be_bytes());
            }
            _ => {
                self.out.push(tag | 27);
                self.out.extend_from_slice(&arg.to_be_bytes());
            }
        }
    }
}
