//! Range iterators: a reusable description of a walk plus its position.

use super::bound::Cursor;
use crate::engine::{locate, Seek, Source};
use crate::error::{CoreError, CoreResult};
use crate::key_range::KeyRange;
use crate::transaction::Transaction;
use crate::types::Direction;
use shelfdb_codec::Key;
use std::fmt;

/// What an iterator walks and what each position yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IteratorKind {
    /// Primary keys of a store.
    Key,
    /// Index keys with their primary keys.
    IndexKey,
    /// Records of a store.
    Value,
    /// Records in index order.
    IndexValue,
}

impl IteratorKind {
    /// True for kinds that walk an index.
    #[must_use]
    pub const fn is_index(self) -> bool {
        matches!(self, Self::IndexKey | Self::IndexValue)
    }

    /// True for kinds that only yield keys.
    #[must_use]
    pub const fn is_key_only(self) -> bool {
        matches!(self, Self::Key | Self::IndexKey)
    }
}

/// Where an iterator is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IteratorState {
    /// Never opened; the next open starts at the beginning of the range.
    #[default]
    Initial,
    /// Holds a saved position; the next open continues right after it.
    Resting,
    /// Bound to a live cursor.
    Open,
    /// Ran out of positions or was exited; the next open starts over.
    Completed,
}

/// A walk over a store or index, in one direction, within an optional
/// key range.
///
/// The iterator owns no data. [`open`](Self::open) binds it to a
/// transaction and returns a [`Cursor`]; when the cursor goes away the
/// iterator keeps the last position, so a later open in another
/// transaction continues where the previous one stopped.
///
/// ```rust
/// use shelfdb_core::{IteratorState, KeyRange, RangeIterator};
///
/// let iter = RangeIterator::index_values("notes", "by_tag")
///     .with_range(KeyRange::only("a"))
///     .reverse();
/// assert_eq!(iter.state(), IteratorState::Initial);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RangeIterator {
    store: String,
    index: Option<String>,
    kind: IteratorKind,
    range: Option<KeyRange>,
    direction: Direction,
    pub(super) state: IteratorState,
    pub(super) key: Option<Key>,
    pub(super) primary_key: Option<Key>,
}

impl RangeIterator {
    fn with_kind(store: impl Into<String>, index: Option<String>, kind: IteratorKind) -> Self {
        Self {
            store: store.into(),
            index,
            kind,
            range: None,
            direction: Direction::Next,
            state: IteratorState::Initial,
            key: None,
            primary_key: None,
        }
    }

    /// Iterates the primary keys of a store.
    pub fn keys(store: impl Into<String>) -> Self {
        Self::with_kind(store, None, IteratorKind::Key)
    }

    /// Iterates the records of a store.
    pub fn values(store: impl Into<String>) -> Self {
        Self::with_kind(store, None, IteratorKind::Value)
    }

    /// Iterates the keys of an index.
    pub fn index_keys(store: impl Into<String>, index: impl Into<String>) -> Self {
        Self::with_kind(store, Some(index.into()), IteratorKind::IndexKey)
    }

    /// Iterates records in index order.
    pub fn index_values(store: impl Into<String>, index: impl Into<String>) -> Self {
        Self::with_kind(store, Some(index.into()), IteratorKind::IndexValue)
    }

    /// Restricts effective keys to `range`.
    #[must_use]
    pub fn with_range(mut self, range: KeyRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Walks in descending order.
    #[must_use]
    pub fn reverse(mut self) -> Self {
        self.direction = self.direction.reversed();
        self
    }

    /// Visits each distinct effective key once.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.direction = Direction::from_flags(!self.direction.is_forward(), true);
        self
    }

    /// A copy that continues right after `(key, primary_key)`.
    #[must_use]
    pub fn resume(&self, key: impl Into<Key>, primary_key: Option<Key>) -> Self {
        let key = key.into();
        Self {
            primary_key: primary_key.or_else(|| (!self.kind.is_index()).then(|| key.clone())),
            key: Some(key),
            state: IteratorState::Resting,
            ..self.clone()
        }
    }

    /// Forgets the saved position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` while a cursor is open on the iterator.
    pub fn reset(&mut self) -> CoreResult<()> {
        if self.state == IteratorState::Open {
            return Err(CoreError::invalid_operation("cannot reset an iterator while its cursor is open"));
        }
        self.state = IteratorState::Initial;
        self.key = None;
        self.primary_key = None;
        Ok(())
    }

    /// Store name.
    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store
    }

    /// Index name, for index kinds.
    #[must_use]
    pub fn index_name(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Iterator kind.
    #[must_use]
    pub fn kind(&self) -> IteratorKind {
        self.kind
    }

    /// Key range, if any.
    #[must_use]
    pub fn range(&self) -> Option<&KeyRange> {
        self.range.as_ref()
    }

    /// Traversal direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> IteratorState {
        self.state
    }

    /// Saved effective key.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Saved primary key.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Key> {
        self.primary_key.as_ref()
    }

    /// Binds the iterator to `tx`.
    ///
    /// The cursor starts at the first position of the range, or right
    /// after the saved position when the iterator is resting.
    ///
    /// # Errors
    ///
    /// - `Argument` if the store or index is not in the transaction scope.
    /// - `InvalidOperation` if a cursor is already open on the iterator.
    pub fn open<'a>(&'a mut self, tx: &'a Transaction<'_>) -> CoreResult<Cursor<'a>> {
        if self.state == IteratorState::Open {
            return Err(CoreError::invalid_operation(format!("{self} is already open")));
        }
        let store = tx.store(&self.store)?;
        let source = self.source(tx)?;
        let first = self.first_position(source);
        Ok(Cursor::new(self, source, store, first))
    }

    pub(crate) fn source<'t>(&self, tx: &'t Transaction<'_>) -> CoreResult<Source<'t>> {
        tx.source(&self.store, self.index.as_deref())
    }

    /// First position for a fresh open. Marks the iterator open.
    pub(crate) fn first_position(&mut self, source: Source<'_>) -> Option<(Key, Key)> {
        let found = match (self.state, &self.key, &self.primary_key) {
            (IteratorState::Resting, Some(key), Some(primary)) => self.locate(source, Seek::After { key, primary }),
            (IteratorState::Resting, Some(key), None) => self.locate(source, Seek::Past(key)),
            _ => self.locate(source, Seek::Start),
        };
        self.state = IteratorState::Open;
        self.settle(found.as_ref());
        found
    }

    pub(crate) fn locate(&self, source: Source<'_>, seek: Seek<'_>) -> Option<(Key, Key)> {
        locate(source, self.range.as_ref(), self.direction, seek)
    }

    /// Records where the live cursor is. Running out completes the walk.
    pub(crate) fn settle(&mut self, position: Option<&(Key, Key)>) {
        match position {
            Some((key, primary)) => {
                self.key = Some(key.clone());
                self.primary_key = Some(primary.clone());
            }
            None => self.complete(),
        }
    }

    pub(crate) fn complete(&mut self) {
        self.state = IteratorState::Completed;
        self.key = None;
        self.primary_key = None;
    }

    /// Unbinds from a live cursor, keeping the position.
    pub(crate) fn rest(&mut self) {
        if self.state == IteratorState::Open {
            self.state = if self.key.is_some() {
                IteratorState::Resting
            } else {
                IteratorState::Initial
            };
        }
    }

    /// Sets a resting position, or completes when there is none.
    pub(crate) fn rest_at(&mut self, position: Option<(Key, Key)>) {
        match position {
            Some((key, primary)) => {
                self.key = Some(key);
                self.primary_key = Some(primary);
                self.state = IteratorState::Resting;
            }
            None => self.complete(),
        }
    }
}

impl fmt::Display for RangeIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            IteratorKind::Key => "keys",
            IteratorKind::IndexKey => "index keys",
            IteratorKind::Value => "values",
            IteratorKind::IndexValue => "index values",
        };
        write!(f, "{kind} of {}", self.store)?;
        if let Some(index) = &self.index {
            write!(f, ":{index}")?;
        }
        if let Some(range) = &self.range {
            write!(f, " in {range}")?;
        }
        if !self.direction.is_forward() {
            f.write_str(" reversed")?;
        }
        if self.direction.is_unique() {
            f.write_str(" unique")?;
        }
        Ok(())
    }
}
