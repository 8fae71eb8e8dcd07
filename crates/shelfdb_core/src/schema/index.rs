//! Index descriptors.

use super::KeyPath;
use shelfdb_codec::Value;
use std::fmt;
use std::sync::Arc;

/// Declared type of a field, used to coerce delimited text on bulk load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Stored as text; surrounding quotes are stripped.
    Text,
    /// Parsed as a signed integer.
    Integer,
    /// Parsed as a float.
    Numeric,
}

impl DataType {
    /// Stable name used in persisted schemas.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Numeric => "NUMERIC",
        }
    }

    /// Parses a persisted name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "TEXT" => Some(Self::Text),
            "INTEGER" => Some(Self::Integer),
            "NUMERIC" => Some(Self::Numeric),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes a derived field from a whole record.
///
/// The output is written into the record at the index key path before
/// the record is stored. Returning `None` leaves the record unindexed.
#[derive(Clone)]
pub struct IndexGenerator(Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>);

impl IndexGenerator {
    /// Wraps a derivation function.
    pub fn new(f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Runs the derivation.
    #[must_use]
    pub fn derive(&self, record: &Value) -> Option<Value> {
        (self.0)(record)
    }
}

impl fmt::Debug for IndexGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IndexGenerator(..)")
    }
}

/// A secondary index over a store.
///
/// Equality ignores the generator closure itself: a live schema read back
/// from disk only knows an index *is* derived, not how.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    name: String,
    key_path: KeyPath,
    unique: bool,
    multi_entry: bool,
    data_type: Option<DataType>,
    derived: bool,
    generator: Option<IndexGenerator>,
}

impl IndexSchema {
    /// Creates a non-unique, single-entry index.
    pub fn new(name: impl Into<String>, key_path: impl Into<KeyPath>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
            unique: false,
            multi_entry: false,
            data_type: None,
            derived: false,
            generator: None,
        }
    }

    /// Creates an index whose field is computed from each record.
    pub fn generated(
        name: impl Into<String>,
        key_path: impl Into<KeyPath>,
        generator: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        let mut index = Self::new(name, key_path);
        index.derived = true;
        index.generator = Some(IndexGenerator::new(generator));
        index
    }

    /// Sets the uniqueness flag.
    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Sets the multi-entry flag.
    #[must_use]
    pub fn multi_entry(mut self, multi_entry: bool) -> Self {
        self.multi_entry = multi_entry;
        self
    }

    /// Declares the field type.
    #[must_use]
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Marks the index as derived without attaching a generator, the way
    /// a schema read back from the journal looks.
    #[must_use]
    pub(crate) fn derived_marker(mut self) -> Self {
        self.derived = true;
        self
    }

    /// Index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key path into each record.
    #[must_use]
    pub fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    /// Whether two records may share an index key.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether array values index each element.
    #[must_use]
    pub fn is_multi_entry(&self) -> bool {
        self.multi_entry
    }

    /// Declared field type.
    #[must_use]
    pub fn declared_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Whether this is a generator index.
    #[must_use]
    pub fn is_generator(&self) -> bool {
        self.derived
    }

    /// The derivation closure, when attached.
    #[must_use]
    pub fn generator(&self) -> Option<&IndexGenerator> {
        self.generator.as_ref()
    }

    /// Copies the generator closure from a declared index with the same
    /// definition.
    pub(crate) fn adopt_generator(&mut self, declared: &IndexSchema) {
        if self.derived && declared.generator.is_some() {
            self.generator = declared.generator.clone();
        }
    }

    /// Compares the structural definition, ignoring the generator closure.
    #[must_use]
    pub fn same_definition(&self, other: &IndexSchema) -> bool {
        self.name == other.name
            && self.key_path == other.key_path
            && self.unique == other.unique
            && self.multi_entry == other.multi_entry
            && self.data_type == other.data_type
    }
}

impl PartialEq for IndexSchema {
    fn eq(&self, other: &Self) -> bool {
        self.same_definition(other) && self.derived == other.derived
    }
}
