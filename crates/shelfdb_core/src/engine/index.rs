//! Ordered secondary index.

use crate::schema::IndexSchema;
use shelfdb_codec::{Key, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Index key to primary keys, both ordered.
///
/// Iterating the map and then each set walks the index in the order an
/// index cursor visits it: by index key, ties broken by primary key.
#[derive(Debug, Clone)]
pub(crate) struct IndexTree {
    schema: IndexSchema,
    entries: BTreeMap<Key, BTreeSet<Key>>,
    count: usize,
}

impl IndexTree {
    pub(crate) fn new(schema: IndexSchema) -> Self {
        Self {
            schema,
            entries: BTreeMap::new(),
            count: 0,
        }
    }

    pub(crate) fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    pub(crate) fn schema_mut(&mut self) -> &mut IndexSchema {
        &mut self.schema
    }

    /// Index keys a record contributes. Records missing the field, or
    /// holding something that is not a key there, contribute none.
    pub(crate) fn keys_for(&self, record: &Value) -> Vec<Key> {
        if self.schema.is_multi_entry() {
            self.schema.key_path().extract_multi(record)
        } else {
            self.schema.key_path().extract(record).into_iter().collect()
        }
    }

    /// True when a unique index already maps `index_key` to a record other
    /// than `primary`.
    pub(crate) fn conflicts(&self, index_key: &Key, primary: &Key) -> bool {
        self.schema.is_unique()
            && self
                .entries
                .get(index_key)
                .is_some_and(|set| set.iter().any(|p| p != primary))
    }

    pub(crate) fn insert(&mut self, index_key: Key, primary: Key) {
        if self.entries.entry(index_key).or_default().insert(primary) {
            self.count += 1;
        }
    }

    pub(crate) fn remove(&mut self, index_key: &Key, primary: &Key) {
        if let Some(set) = self.entries.get_mut(index_key) {
            if set.remove(primary) {
                self.count -= 1;
            }
            if set.is_empty() {
                self.entries.remove(index_key);
            }
        }
    }

    pub(crate) fn entries(&self) -> &BTreeMap<Key, BTreeSet<Key>> {
        &self.entries
    }

    /// Number of (index key, primary key) pairs.
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }
}
