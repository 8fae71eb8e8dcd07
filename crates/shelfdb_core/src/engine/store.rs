//! In-memory object store: records by primary key plus their indexes.

use super::IndexTree;
use crate::error::{CoreError, CoreResult};
use crate::key_range::KeyRange;
use crate::schema::{IndexSchema, KeyPath, StoreSchema};
use shelfdb_codec::{Key, Value};
use std::collections::BTreeMap;

/// Largest key the generator hands out (2^53).
const MAX_GENERATED_KEY: f64 = 9_007_199_254_740_992.0;

/// Whether a write may replace an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Insert or replace.
    Put,
    /// Insert only; an existing key is a constraint error.
    Add,
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectStore {
    schema: StoreSchema,
    records: BTreeMap<Key, Value>,
    indexes: BTreeMap<String, IndexTree>,
    next_key: f64,
}

impl ObjectStore {
    /// Creates an empty store with every declared index.
    pub(crate) fn new(schema: StoreSchema) -> Self {
        let indexes = schema
            .indexes()
            .iter()
            .map(|i| (i.name().to_string(), IndexTree::new(i.clone())))
            .collect();
        Self {
            schema,
            records: BTreeMap::new(),
            indexes,
            next_key: 1.0,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.schema.name()
    }

    pub(crate) fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    pub(crate) fn records(&self) -> &BTreeMap<Key, Value> {
        &self.records
    }

    pub(crate) fn get(&self, key: &Key) -> Option<&Value> {
        self.records.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn index(&self, name: &str) -> CoreResult<&IndexTree> {
        self.indexes
            .get(name)
            .ok_or_else(|| CoreError::unknown_index(self.name(), name))
    }

    /// Stores `value`, returning its primary key.
    ///
    /// Generator indexes run first and write their output into the record.
    /// The key then comes from the key path, the explicit `key`, or the key
    /// generator, in that order of preference.
    pub(crate) fn put(&mut self, mut value: Value, key: Option<Key>, mode: WriteMode) -> CoreResult<Key> {
        for index in self.schema.indexes() {
            if let Some(generator) = index.generator() {
                if let (KeyPath::Field(path), Some(derived)) =
                    (index.key_path(), generator.derive(&value))
                {
                    value.set_path(path, derived);
                }
            }
        }

        let key = self.resolve_key(&mut value, key)?;
        if mode == WriteMode::Add && self.records.contains_key(&key) {
            return Err(CoreError::duplicate_key(self.name(), &key));
        }

        let mut new_entries = Vec::with_capacity(self.indexes.len());
        for (name, tree) in &self.indexes {
            let keys = tree.keys_for(&value);
            if let Some(taken) = keys.iter().find(|ik| tree.conflicts(ik, &key)) {
                return Err(CoreError::constraint(
                    self.name(),
                    format!("unique index '{name}' already holds {taken}"),
                ));
            }
            new_entries.push(keys);
        }

        self.unindex(&key);
        for (tree, keys) in self.indexes.values_mut().zip(new_entries) {
            for ik in keys {
                tree.insert(ik, key.clone());
            }
        }
        self.bump_generator(&key);
        self.records.insert(key.clone(), value);
        Ok(key)
    }

    fn resolve_key(&mut self, value: &mut Value, explicit: Option<Key>) -> CoreResult<Key> {
        match self.schema.key_path().cloned() {
            Some(path) => {
                if explicit.is_some() {
                    return Err(CoreError::data(
                        self.name(),
                        "store uses in-line keys, an explicit key is not allowed",
                    ));
                }
                if let Some(key) = path.extract(value) {
                    return Ok(key);
                }
                let present = path.fields().iter().any(|f| value.get_path(f).is_some());
                if !self.schema.is_auto_increment() || present {
                    return Err(CoreError::data(
                        self.name(),
                        format!("record has no valid key at '{path}'"),
                    ));
                }
                let key = self.generate_key()?;
                if !path.inject(value, &key) {
                    return Err(CoreError::data(
                        self.name(),
                        format!("cannot write generated key at '{path}'"),
                    ));
                }
                Ok(key)
            }
            None => match explicit {
                Some(key) => Ok(key),
                None if self.schema.is_auto_increment() => self.generate_key(),
                None => Err(CoreError::data(
                    self.name(),
                    "store uses out-of-line keys and no key was given",
                )),
            },
        }
    }

    fn generate_key(&self) -> CoreResult<Key> {
        if self.next_key > MAX_GENERATED_KEY {
            return Err(CoreError::constraint(self.name(), "key generator exhausted"));
        }
        Ok(Key::Number(self.next_key))
    }

    /// Next key the generator would hand out.
    pub(crate) fn next_key(&self) -> f64 {
        self.next_key
    }

    /// Moves the generator forward to at least `next`.
    pub(crate) fn restore_next_key(&mut self, next: f64) {
        if next > self.next_key {
            self.next_key = next.min(MAX_GENERATED_KEY + 1.0);
        }
    }

    fn bump_generator(&mut self, key: &Key) {
        if let Key::Number(n) = key {
            if *n >= self.next_key {
                self.next_key = (n.floor() + 1.0).min(MAX_GENERATED_KEY + 1.0);
            }
        }
    }

    /// Writes a record without generators or constraint checks. Used when
    /// replaying committed history.
    pub(crate) fn apply_put(&mut self, key: Key, value: Value) {
        self.unindex(&key);
        for tree in self.indexes.values_mut() {
            for ik in tree.keys_for(&value) {
                tree.insert(ik, key.clone());
            }
        }
        self.bump_generator(&key);
        self.records.insert(key, value);
    }

    fn unindex(&mut self, key: &Key) {
        if let Some(old) = self.records.get(key) {
            for tree in self.indexes.values_mut() {
                for ik in tree.keys_for(old) {
                    tree.remove(&ik, key);
                }
            }
        }
    }

    /// Removes one record. Returns whether it existed.
    pub(crate) fn delete(&mut self, key: &Key) -> bool {
        self.unindex(key);
        self.records.remove(key).is_some()
    }

    /// Primary keys inside `range`, ascending.
    pub(crate) fn keys_in(&self, range: Option<&KeyRange>) -> Vec<Key> {
        match range {
            None => self.records.keys().cloned().collect(),
            Some(r) if super::seek::bounds_empty(r.start_bound(), r.end_bound()) => Vec::new(),
            Some(r) => self
                .records
                .range::<Key, _>((r.start_bound(), r.end_bound()))
                .map(|(k, _)| k.clone())
                .collect(),
        }
    }

    /// Removes every record. The key generator keeps its position.
    pub(crate) fn clear(&mut self) {
        self.records.clear();
        for tree in self.indexes.values_mut() {
            tree.clear();
        }
    }

    /// Adds an index and populates it from existing records.
    pub(crate) fn create_index(&mut self, schema: IndexSchema) -> CoreResult<()> {
        let mut tree = IndexTree::new(schema.clone());
        for (key, value) in &self.records {
            for ik in tree.keys_for(value) {
                if tree.conflicts(&ik, key) {
                    return Err(CoreError::constraint(
                        self.name(),
                        format!("cannot build unique index '{}': {ik} is duplicated", schema.name()),
                    ));
                }
                tree.insert(ik, key.clone());
            }
        }
        self.schema.indexes_mut().retain(|i| i.name() != schema.name());
        self.schema.indexes_mut().push(schema.clone());
        self.indexes.insert(schema.name().to_string(), tree);
        Ok(())
    }

    pub(crate) fn delete_index(&mut self, name: &str) -> bool {
        self.schema.indexes_mut().retain(|i| i.name() != name);
        self.indexes.remove(name).is_some()
    }

    /// Attaches generator closures from a declared store to this store's
    /// derived indexes.
    pub(crate) fn adopt_generators(&mut self, declared: &StoreSchema) {
        for index in self.schema.indexes_mut() {
            if let Some(d) = declared.get_index(index.name()) {
                index.adopt_generator(d);
            }
        }
        for tree in self.indexes.values_mut() {
            let name = tree.schema().name().to_string();
            if let Some(d) = declared.get_index(&name) {
                tree.schema_mut().adopt_generator(d);
            }
        }
    }
}
