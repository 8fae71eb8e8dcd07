//! Object store descriptors.

use super::{DataType, IndexSchema, KeyPath};
use crate::error::{CoreError, CoreResult};

/// One object store: its primary key rules and its indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSchema {
    name: String,
    key_path: Option<KeyPath>,
    auto_increment: bool,
    key_type: Option<DataType>,
    indexes: Vec<IndexSchema>,
}

impl StoreSchema {
    /// An out-of-line store: callers pass every key explicitly.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: None,
            auto_increment: false,
            key_type: None,
            indexes: Vec::new(),
        }
    }

    /// An in-line store whose key lives at `key_path` inside each record.
    pub fn with_key_path(name: impl Into<String>, key_path: impl Into<KeyPath>) -> Self {
        Self {
            key_path: Some(key_path.into()),
            ..Self::new(name)
        }
    }

    /// Generates numeric keys for records without one.
    #[must_use]
    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    /// Declares the primary key type.
    #[must_use]
    pub fn key_type(mut self, key_type: DataType) -> Self {
        self.key_type = Some(key_type);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// In-line key path, if any.
    #[must_use]
    pub fn key_path(&self) -> Option<&KeyPath> {
        self.key_path.as_ref()
    }

    /// Whether keys are generated.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Declared primary key type.
    #[must_use]
    pub fn declared_key_type(&self) -> Option<DataType> {
        self.key_type
    }

    /// Indexes in declaration order.
    #[must_use]
    pub fn indexes(&self) -> &[IndexSchema] {
        &self.indexes
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name() == name)
    }

    pub(crate) fn indexes_mut(&mut self) -> &mut Vec<IndexSchema> {
        &mut self.indexes
    }

    /// Same store with the index list replaced.
    #[must_use]
    pub(crate) fn with_indexes(mut self, indexes: Vec<IndexSchema>) -> Self {
        self.indexes = indexes;
        self
    }

    /// True when primary key rules match; indexes are not compared.
    #[must_use]
    pub fn same_key_rules(&self, other: &StoreSchema) -> bool {
        self.key_path == other.key_path
            && self.auto_increment == other.auto_increment
            && self.key_type == other.key_type
    }

    /// Checks the store definition is self-consistent.
    ///
    /// # Errors
    ///
    /// Returns `Argument` for an empty name, duplicate index names,
    /// auto-increment on a compound key path, or multi-entry on a
    /// compound index.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::argument("store name must not be empty"));
        }
        if self.auto_increment && self.key_path.as_ref().is_some_and(KeyPath::is_composite) {
            return Err(CoreError::argument(format!(
                "store '{}': auto-increment needs a single-field key path",
                self.name
            )));
        }
        for (i, index) in self.indexes.iter().enumerate() {
            if index.name().is_empty() {
                return Err(CoreError::argument(format!(
                    "store '{}': index name must not be empty",
                    self.name
                )));
            }
            if self.indexes[..i].iter().any(|o| o.name() == index.name()) {
                return Err(CoreError::argument(format!(
                    "store '{}': duplicate index '{}'",
                    self.name,
                    index.name()
                )));
            }
            if index.is_multi_entry() && index.key_path().is_composite() {
                return Err(CoreError::argument(format!(
                    "store '{}': multi-entry index '{}' needs a single-field key path",
                    self.name,
                    index.name()
                )));
            }
            if index.is_generator() && index.key_path().is_composite() {
                return Err(CoreError::argument(format!(
                    "store '{}': generator index '{}' needs a single-field key path",
                    self.name,
                    index.name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let store = StoreSchema::with_key_path("animals", "id")
            .index(IndexSchema::new("color", "color"))
            .index(IndexSchema::new("horn, name", ["horn", "name"]));
        assert_eq!(store.key_path(), Some(&KeyPath::from("id")));
        assert!(store.get_index("color").is_some());
        assert!(store.get_index("legs").is_none());
        assert!(store.validate().is_ok());
    }

    #[test]
    fn rejects_bad_definitions() {
        let dup = StoreSchema::new("s")
            .index(IndexSchema::new("a", "a"))
            .index(IndexSchema::new("a", "b"));
        assert!(dup.validate().is_err());

        let auto = StoreSchema::with_key_path("s", ["a", "b"]).auto_increment(true);
        assert!(auto.validate().is_err());

        let multi = StoreSchema::new("s").index(IndexSchema::new("m", ["a", "b"]).multi_entry(true));
        assert!(multi.validate().is_err());

        assert!(StoreSchema::new("").validate().is_err());
    }

    #[test]
    fn key_rules_ignore_indexes() {
        let a = StoreSchema::new("s").auto_increment(true);
        let b = a.clone().index(IndexSchema::new("x", "x"));
        assert!(a.same_key_rules(&b));
        assert!(!a.same_key_rules(&StoreSchema::new("s")));
    }
}
