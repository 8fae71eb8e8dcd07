//! In-memory storage engine.
//!
//! A [`DatabaseState`] is the committed content of one database. Stores
//! sit behind `Arc`s so a transaction can clone the whole state cheaply
//! and copy only the stores it writes.

mod index;
pub(crate) mod seek;
mod store;

pub(crate) use index::IndexTree;
pub(crate) use seek::{collect_positions, locate, Seek, Source};
pub(crate) use store::{ObjectStore, WriteMode};

use crate::error::{CoreError, CoreResult};
use crate::journal::JournalOp;
use crate::schema::DatabaseSchema;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub(crate) struct DatabaseState {
    version: u32,
    stores: BTreeMap<String, Arc<ObjectStore>>,
}

impl DatabaseState {
    pub(crate) fn version(&self) -> u32 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    pub(crate) fn store(&self, name: &str) -> Option<&ObjectStore> {
        self.stores.get(name).map(Arc::as_ref)
    }

    /// Mutable access, copying the store first if another snapshot shares it.
    pub(crate) fn store_mut(&mut self, name: &str) -> Option<&mut ObjectStore> {
        self.stores.get_mut(name).map(Arc::make_mut)
    }

    pub(crate) fn stores(&self) -> impl Iterator<Item = &ObjectStore> {
        self.stores.values().map(Arc::as_ref)
    }

    pub(crate) fn has_store(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    pub(crate) fn insert_store(&mut self, store: ObjectStore) {
        self.stores.insert(store.name().to_string(), Arc::new(store));
    }

    pub(crate) fn remove_store(&mut self, name: &str) -> bool {
        self.stores.remove(name).is_some()
    }

    /// The live schema, introspected from the stores.
    pub(crate) fn schema(&self) -> DatabaseSchema {
        DatabaseSchema::versioned(
            self.version,
            self.stores.values().map(|s| s.schema().clone()).collect(),
        )
    }

    /// Replays one committed operation.
    pub(crate) fn apply_op(&mut self, op: &JournalOp) -> CoreResult<()> {
        let name = op.store();
        let store = self
            .store_mut(name)
            .ok_or_else(|| CoreError::unknown_store(name))?;
        match op {
            JournalOp::Put { key, value, .. } => store.apply_put(key.clone(), value.clone()),
            JournalOp::Delete { key, .. } => {
                store.delete(key);
            }
            JournalOp::Clear { .. } => store.clear(),
            JournalOp::Generator { next_key, .. } => store.restore_next_key(*next_key),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StoreSchema;
    use shelfdb_codec::{Key, Value};

    #[test]
    fn clones_share_until_written() {
        let mut base = DatabaseState::default();
        base.insert_store(ObjectStore::new(StoreSchema::new("kv")));
        let mut copy = base.clone();
        copy.store_mut("kv")
            .unwrap()
            .put(Value::from(1), Some(Key::from("a")), WriteMode::Put)
            .unwrap();
        assert_eq!(base.store("kv").unwrap().len(), 0);
        assert_eq!(copy.store("kv").unwrap().len(), 1);
    }

    #[test]
    fn replays_ops() {
        let mut state = DatabaseState::default();
        state.insert_store(ObjectStore::new(StoreSchema::new("kv")));
        let put = JournalOp::Put {
            store: "kv".into(),
            key: Key::from(3),
            value: Value::from("x"),
        };
        state.apply_op(&put).unwrap();
        assert_eq!(state.store("kv").unwrap().get(&Key::from(3)), Some(&Value::from("x")));
        state
            .apply_op(&JournalOp::Delete {
                store: "kv".into(),
                key: Key::from(3),
            })
            .unwrap();
        assert_eq!(state.store("kv").unwrap().len(), 0);
        assert!(state
            .apply_op(&JournalOp::Clear { store: "nope".into() })
            .is_err());
    }

    #[test]
    fn schema_reflects_stores() {
        let mut state = DatabaseState::default();
        state.set_version(3);
        state.insert_store(ObjectStore::new(StoreSchema::new("b")));
        state.insert_store(ObjectStore::new(StoreSchema::new("a")));
        let schema = state.schema();
        assert_eq!(schema.store_names(), vec!["a", "b"]);
        assert!(state.remove_store("a"));
        assert!(!state.has_store("a"));
    }
}
