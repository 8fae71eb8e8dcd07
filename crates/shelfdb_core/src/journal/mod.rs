//! Append-only database journal.
//!
//! Each persisted database is one journal file. Frames follow this layout:
//!
//! ```text
//! | magic (4) | version (2) | type (1) | length (4) | payload (CBOR) | crc32 (4) |
//! ```
//!
//! Opening a database replays every frame into memory. Compaction rewrites
//! the journal as one upgrade frame holding the schema and one commit frame
//! holding every record.

mod record;
mod writer;

pub use record::{compute_crc32, JournalOp, JournalRecord, RecordType, JOURNAL_MAGIC, JOURNAL_VERSION};
pub(crate) use record::text_field;
pub use writer::{FrameScan, Journal};

use crate::connection::{apply_change, SchemaChange};
use crate::engine::DatabaseState;
use crate::error::CoreResult;
use crate::types::TransactionId;

/// Rebuilds committed state from journal records. Also returns the highest
/// transaction id seen.
pub(crate) fn replay(records: &[JournalRecord]) -> CoreResult<(DatabaseState, u64)> {
    let mut state = DatabaseState::default();
    let mut last_txid = 0;
    for record in records {
        match record {
            JournalRecord::Upgrade { version, changes } => {
                for change in changes {
                    apply_change(&mut state, change)?;
                }
                state.set_version(*version);
            }
            JournalRecord::Commit { txid, ops } => {
                for op in ops {
                    state.apply_op(op)?;
                }
                last_txid = last_txid.max(txid.as_u64());
            }
        }
    }
    Ok((state, last_txid))
}

/// The shortest record list that replays to `state`.
pub(crate) fn snapshot(state: &DatabaseState, last_txid: u64) -> Vec<JournalRecord> {
    if state.version() == 0 {
        return Vec::new();
    }
    let changes = state
        .stores()
        .map(|s| SchemaChange::CreateStore(s.schema().clone()))
        .collect();
    let mut ops = Vec::new();
    for store in state.stores() {
        if store.next_key() > 1.0 {
            ops.push(JournalOp::Generator {
                store: store.name().to_string(),
                next_key: store.next_key(),
            });
        }
        for (key, value) in store.records() {
            ops.push(JournalOp::Put {
                store: store.name().to_string(),
                key: key.clone(),
                value: value.clone(),
            });
        }
    }
    vec![
        JournalRecord::Upgrade {
            version: state.version(),
            changes,
        },
        JournalRecord::Commit {
            txid: TransactionId::new(last_txid),
            ops,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ObjectStore, WriteMode};
    use crate::schema::{IndexSchema, StoreSchema};
    use shelfdb_codec::{Key, Value};

    fn sample() -> DatabaseState {
        let mut state = DatabaseState::default();
        state.set_version(2);
        let mut notes = ObjectStore::new(
            StoreSchema::with_key_path("notes", "id")
                .auto_increment(true)
                .index(IndexSchema::new("by_tag", "tag")),
        );
        for tag in ["a", "b", "c"] {
            notes
                .put(Value::object([("tag", Value::from(tag))]), None, WriteMode::Put)
                .unwrap();
        }
        notes.delete(&Key::from(3));
        state.insert_store(notes);
        state
    }

    #[test]
    fn snapshot_replays_to_same_content() {
        let state = sample();
        let (back, txid) = replay(&snapshot(&state, 7)).unwrap();
        assert_eq!(txid, 7);
        assert_eq!(back.version(), 2);
        let notes = back.store("notes").unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes.next_key(), 4.0);
        assert_eq!(notes.index("by_tag").unwrap().len(), 2);
    }

    #[test]
    fn empty_database_snapshots_to_nothing() {
        assert!(snapshot(&DatabaseState::default(), 0).is_empty());
    }
}
