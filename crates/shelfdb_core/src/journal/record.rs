//! Journal record types and their payload encoding.

use crate::connection::SchemaChange;
use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use shelfdb_codec::{from_cbor, to_canonical_cbor, CodecError, Key, Value};

/// Magic bytes opening every journal frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"SHJR";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// Type byte of a journal frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Structural change applied by a version upgrade.
    Upgrade = 1,
    /// Committed transaction.
    Commit = 2,
}

impl RecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Upgrade),
            2 => Some(Self::Commit),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One write inside a committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalOp {
    /// Record stored under `key`.
    Put {
        /// Store name.
        store: String,
        /// Primary key.
        key: Key,
        /// Record as stored, with generated keys and fields filled in.
        value: Value,
    },
    /// Record removed.
    Delete {
        /// Store name.
        store: String,
        /// Primary key.
        key: Key,
    },
    /// Every record of a store removed.
    Clear {
        /// Store name.
        store: String,
    },
    /// Key generator position, written by compaction.
    Generator {
        /// Store name.
        store: String,
        /// Next key the generator hands out.
        next_key: f64,
    },
}

impl JournalOp {
    /// The store this operation writes.
    #[must_use]
    pub fn store(&self) -> &str {
        match self {
            Self::Put { store, .. }
            | Self::Delete { store, .. }
            | Self::Clear { store }
            | Self::Generator { store, .. } => store,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Put { store, key, value } => Value::object([
                ("op", Value::from("put")),
                ("store", Value::from(store.as_str())),
                ("key", key.to_exact_value()),
                ("value", value.clone()),
            ]),
            Self::Delete { store, key } => Value::object([
                ("op", Value::from("delete")),
                ("store", Value::from(store.as_str())),
                ("key", key.to_exact_value()),
            ]),
            Self::Clear { store } => Value::object([
                ("op", Value::from("clear")),
                ("store", Value::from(store.as_str())),
            ]),
            Self::Generator { store, next_key } => Value::object([
                ("op", Value::from("generator")),
                ("store", Value::from(store.as_str())),
                ("next", Value::Float(*next_key)),
            ]),
        }
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        let store = text_field(value, "store")?.to_string();
        let key = || -> CoreResult<Key> { Ok(Key::from_value(field(value, "key")?)?) };
        match text_field(value, "op")? {
            "put" => Ok(Self::Put {
                store,
                key: key()?,
                value: field(value, "value")?.clone(),
            }),
            "delete" => Ok(Self::Delete { store, key: key()? }),
            "clear" => Ok(Self::Clear { store }),
            "generator" => Ok(Self::Generator {
                store,
                next_key: field(value, "next")?
                    .as_f64()
                    .ok_or_else(|| CodecError::invalid_structure("generator position must be a number"))?,
            }),
            other => Err(CodecError::invalid_structure(format!("unknown journal op '{other}'")).into()),
        }
    }
}

/// A journal entry.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalRecord {
    /// The database moved to `version` by applying `changes` in order.
    Upgrade {
        /// New version.
        version: u32,
        /// Structural changes.
        changes: Vec<SchemaChange>,
    },
    /// A read-write transaction committed `ops`.
    Commit {
        /// Transaction id.
        txid: TransactionId,
        /// Writes in issue order.
        ops: Vec<JournalOp>,
    },
}

impl JournalRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Upgrade { .. } => RecordType::Upgrade,
            Self::Commit { .. } => RecordType::Commit,
        }
    }

    /// Serializes the payload as canonical CBOR.
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let value = match self {
            Self::Upgrade { version, changes } => Value::object([
                ("version", Value::from(*version)),
                (
                    "changes",
                    Value::Array(changes.iter().map(SchemaChange::to_value).collect()),
                ),
            ]),
            Self::Commit { txid, ops } => {
                let txid = i64::try_from(txid.as_u64())
                    .map_err(|_| CoreError::invalid_operation("transaction id out of range"))?;
                Value::object([
                    ("txid", Value::Integer(txid)),
                    ("ops", Value::Array(ops.iter().map(JournalOp::to_value).collect())),
                ])
            }
        };
        Ok(to_canonical_cbor(&value)?)
    }

    /// Deserializes a payload of the given type.
    pub fn decode_payload(record_type: RecordType, payload: &[u8]) -> CoreResult<Self> {
        let value = from_cbor(payload)?;
        match record_type {
            RecordType::Upgrade => {
                let version = field(&value, "version")?
                    .as_integer()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| CodecError::invalid_structure("upgrade version must be a u32"))?;
                let changes = array_field(&value, "changes")?
                    .iter()
                    .map(SchemaChange::from_value)
                    .collect::<CoreResult<Vec<_>>>()?;
                Ok(Self::Upgrade { version, changes })
            }
            RecordType::Commit => {
                let txid = field(&value, "txid")?
                    .as_integer()
                    .and_then(|v| u64::try_from(v).ok())
                    .ok_or_else(|| CodecError::invalid_structure("txid must be a u64"))?;
                let ops = array_field(&value, "ops")?
                    .iter()
                    .map(JournalOp::from_value)
                    .collect::<CoreResult<Vec<_>>>()?;
                Ok(Self::Commit {
                    txid: TransactionId::new(txid),
                    ops,
                })
            }
        }
    }
}

pub(crate) fn field<'a>(value: &'a Value, name: &str) -> CoreResult<&'a Value> {
    value
        .get(name)
        .ok_or_else(|| CodecError::invalid_structure(format!("missing field '{name}'")).into())
}

pub(crate) fn text_field<'a>(value: &'a Value, name: &str) -> CoreResult<&'a str> {
    field(value, name)?
        .as_text()
        .ok_or_else(|| CodecError::invalid_structure(format!("field '{name}' must be text")).into())
}

fn array_field<'a>(value: &'a Value, name: &str) -> CoreResult<&'a [Value]> {
    field(value, name)?
        .as_array()
        .ok_or_else(|| CodecError::invalid_structure(format!("field '{name}' must be an array")).into())
}

/// Computes the CRC32 (IEEE) checksum of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{IndexSchema, StoreSchema};

    #[test]
    fn record_type_bytes() {
        for t in [RecordType::Upgrade, RecordType::Commit] {
            assert_eq!(RecordType::from_byte(t.as_byte()), Some(t));
        }
        assert_eq!(RecordType::from_byte(9), None);
    }

    #[test]
    fn commit_payload_keeps_ops_in_order() {
        let record = JournalRecord::Commit {
            txid: TransactionId::new(12),
            ops: vec![
                JournalOp::Put {
                    store: "notes".into(),
                    key: Key::from(1),
                    value: Value::object([("id", Value::from(1)), ("tag", Value::from("a"))]),
                },
                JournalOp::Delete {
                    store: "notes".into(),
                    key: Key::Array(vec![Key::from(2), Key::from("x")]),
                },
                JournalOp::Clear { store: "drafts".into() },
                JournalOp::Generator {
                    store: "notes".into(),
                    next_key: 4.0,
                },
            ],
        };
        let payload = record.encode_payload().unwrap();
        let decoded = JournalRecord::decode_payload(RecordType::Commit, &payload).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn upgrade_payload_carries_schema_changes() {
        let record = JournalRecord::Upgrade {
            version: 2,
            changes: vec![
                SchemaChange::CreateStore(StoreSchema::with_key_path("notes", "id").auto_increment(true)),
                SchemaChange::CreateIndex {
                    store: "notes".into(),
                    index: IndexSchema::new("by_tag", "tag"),
                },
            ],
        };
        let payload = record.encode_payload().unwrap();
        let decoded = JournalRecord::decode_payload(RecordType::Upgrade, &payload).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn wrong_type_fails_to_decode() {
        let record = JournalRecord::Commit {
            txid: TransactionId::new(1),
            ops: vec![],
        };
        let payload = record.encode_payload().unwrap();
        assert!(JournalRecord::decode_payload(RecordType::Upgrade, &payload).is_err());
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0);
    }
}
