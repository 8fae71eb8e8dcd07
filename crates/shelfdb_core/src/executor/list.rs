//! The general range query behind every key and value listing.

use crate::engine::{locate, ObjectStore, Seek, Source};
use crate::error::{CoreError, CoreResult};
use crate::key_range::KeyRange;
use crate::transaction::Transaction;
use crate::types::Direction;
use shelfdb_codec::{Key, Value};

/// Shape of each listed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMethod {
    /// Effective keys: index keys for index queries, else primary keys.
    Keys,
    /// Primary keys.
    PrimaryKeys,
    /// Effective key and primary key pairs.
    KeyPairs,
    /// Records.
    #[default]
    Values,
    /// Effective key, primary key and record.
    Entries,
}

/// One listed result.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    /// An effective key.
    Key(Key),
    /// A primary key.
    PrimaryKey(Key),
    /// Effective and primary key.
    KeyPair {
        /// Effective key.
        key: Key,
        /// Primary key.
        primary_key: Key,
    },
    /// A record.
    Value(Value),
    /// Keys and record together.
    Entry {
        /// Effective key.
        key: Key,
        /// Primary key.
        primary_key: Key,
        /// The record.
        value: Value,
    },
}

impl ListItem {
    /// The effective key, when the shape carries one.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        match self {
            Self::Key(k) | Self::KeyPair { key: k, .. } | Self::Entry { key: k, .. } => Some(k),
            _ => None,
        }
    }

    /// The primary key, when the shape carries one.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Key> {
        match self {
            Self::PrimaryKey(k) | Self::KeyPair { primary_key: k, .. } | Self::Entry { primary_key: k, .. } => {
                Some(k)
            }
            _ => None,
        }
    }

    /// The record, when the shape carries one.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) | Self::Entry { value: v, .. } => Some(v),
            _ => None,
        }
    }

    /// Consumes the item into its record.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) | Self::Entry { value: v, .. } => Some(v),
            _ => None,
        }
    }
}

/// A range query over a store or one of its indexes.
///
/// ```rust
/// use shelfdb_core::{KeyRange, ListMethod, ListQuery};
///
/// let query = ListQuery::new("notes", ListMethod::Values)
///     .index("by_tag")
///     .range(KeyRange::only("a"))
///     .limit(10);
/// assert_eq!(query.store_name(), "notes");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    store: String,
    method: ListMethod,
    index: Option<String>,
    range: Option<KeyRange>,
    limit: Option<usize>,
    offset: usize,
    reverse: bool,
    unique: bool,
}

impl ListQuery {
    /// Lists a whole store in ascending key order.
    pub fn new(store: impl Into<String>, method: ListMethod) -> Self {
        Self {
            store: store.into(),
            method,
            index: None,
            range: None,
            limit: None,
            offset: 0,
            reverse: false,
            unique: false,
        }
    }

    /// Walks an index instead of the primary keys.
    #[must_use]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Restricts effective keys to `range`.
    #[must_use]
    pub fn range(mut self, range: KeyRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Maximum number of results. Zero is rejected when the query runs.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Positions skipped first. Ignored when resuming.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Descending order.
    #[must_use]
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// One result per distinct effective key.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Store name.
    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store
    }

    /// Result shape.
    #[must_use]
    pub fn method(&self) -> ListMethod {
        self.method
    }

    /// Index name, for index queries.
    #[must_use]
    pub fn index_name(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Traversal direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        Direction::from_flags(self.reverse, self.unique)
    }
}

/// Where a listing stopped, so the next call continues right after it.
///
/// A fresh position starts at the beginning of the range. After a call
/// that reached the end of the range the position is exhausted and
/// further calls return nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorPosition {
    key: Option<Key>,
    primary_key: Option<Key>,
    exhausted: bool,
}

impl CursorPosition {
    /// A position at the start of the range.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A position right after `(key, primary_key)`.
    #[must_use]
    pub fn after(key: Key, primary_key: Option<Key>) -> Self {
        Self {
            key: Some(key),
            primary_key,
            exhausted: false,
        }
    }

    /// Last effective key returned.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Last primary key returned.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Key> {
        self.primary_key.as_ref()
    }

    /// True once the range has been fully listed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Back to the start of the range.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn item(store: &ObjectStore, method: ListMethod, key: Key, primary_key: Key) -> ListItem {
    let record = |pk: &Key| store.get(pk).cloned().unwrap_or(Value::Null);
    match method {
        ListMethod::Keys => ListItem::Key(key),
        ListMethod::PrimaryKeys => ListItem::PrimaryKey(primary_key),
        ListMethod::KeyPairs => ListItem::KeyPair { key, primary_key },
        ListMethod::Values => ListItem::Value(record(&primary_key)),
        ListMethod::Entries => {
            let value = record(&primary_key);
            ListItem::Entry {
                key,
                primary_key,
                value,
            }
        }
    }
}

pub(crate) fn run(
    tx: &Transaction<'_>,
    query: &ListQuery,
    default_limit: usize,
    mut position: Option<&mut CursorPosition>,
) -> CoreResult<Vec<ListItem>> {
    let limit = match query.limit {
        Some(0) => return Err(CoreError::argument("list limit must be at least 1")),
        Some(n) => n,
        None => default_limit,
    };
    let store = tx.store(&query.store)?;
    let source = tx.source(&query.store, query.index.as_deref())?;
    let direction = query.direction();
    let range = query.range.as_ref();

    let resume = match position.as_deref() {
        Some(p) if p.is_exhausted() => return Ok(Vec::new()),
        Some(p) => p.key.clone().map(|k| (k, p.primary_key.clone())),
        None => None,
    };

    let mut next = match &resume {
        Some((key, primary)) => {
            let tiebreak = matches!(source, Source::Index(_)) && !direction.is_unique();
            match primary {
                Some(primary) if tiebreak => locate(source, range, direction, Seek::After { key, primary }),
                _ => locate(source, range, direction, Seek::Past(key)),
            }
        }
        None => {
            let mut at = locate(source, range, direction, Seek::Start);
            for _ in 0..query.offset {
                at = match at {
                    Some((key, primary)) => locate(
                        source,
                        range,
                        direction,
                        Seek::After {
                            key: &key,
                            primary: &primary,
                        },
                    ),
                    None => break,
                };
            }
            at
        }
    };

    let mut items = Vec::new();
    let mut last: Option<(Key, Key)> = None;
    while items.len() < limit {
        let Some((key, primary)) = next else { break };
        next = locate(
            source,
            range,
            direction,
            Seek::After {
                key: &key,
                primary: &primary,
            },
        );
        items.push(item(store, query.method, key.clone(), primary.clone()));
        last = Some((key, primary));
    }

    if let Some(p) = position.as_deref_mut() {
        match (next.is_some(), last) {
            (true, Some((key, primary))) => *p = CursorPosition::after(key, Some(primary)),
            _ => {
                *p = CursorPosition {
                    exhausted: true,
                    ..CursorPosition::default()
                }
            }
        }
    }
    Ok(items)
}
