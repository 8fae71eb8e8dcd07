//! Live cursors.

use super::iterator::{IteratorState, RangeIterator};
use crate::engine::{ObjectStore, Seek, Source};
use crate::error::{CoreError, CoreResult};
use shelfdb_codec::{Key, Value};
use std::cmp::Ordering;

/// An iterator bound to a transaction.
///
/// Every move returns the new effective key, or `None` once the range is
/// exhausted. A failed move terminates the cursor: the iterator completes
/// and later moves fail with `InvalidOperation`. Dropping the cursor
/// leaves the iterator resting at its last position; [`exit`](Self::exit)
/// completes it instead.
#[derive(Debug)]
pub struct Cursor<'a> {
    iter: &'a mut RangeIterator,
    source: Source<'a>,
    store: &'a ObjectStore,
    current: Option<(Key, Key)>,
    done: bool,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(
        iter: &'a mut RangeIterator,
        source: Source<'a>,
        store: &'a ObjectStore,
        current: Option<(Key, Key)>,
    ) -> Self {
        let done = current.is_none();
        Self {
            iter,
            source,
            store,
            current,
            done,
        }
    }

    /// Current effective key: the index key for index iterators, else the
    /// primary key.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.current.as_ref().map(|(k, _)| k)
    }

    /// Current primary key.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Key> {
        self.current.as_ref().map(|(_, p)| p)
    }

    /// Current record, for value iterators.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        if self.iter.kind().is_key_only() {
            return None;
        }
        self.store.get(self.primary_key()?)
    }

    /// The record at the current position, whatever the iterator kind.
    pub(crate) fn record(&self) -> Option<&Value> {
        self.store.get(self.primary_key()?)
    }

    /// True once the cursor ran out, failed or exited.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The iterator behind this cursor.
    #[must_use]
    pub fn iterator(&self) -> &RangeIterator {
        self.iter
    }

    fn fail(&mut self, err: CoreError) -> CoreError {
        self.current = None;
        self.done = true;
        self.iter.complete();
        err
    }

    fn ensure_positioned(&mut self, operation: &str) -> CoreResult<(Key, Key)> {
        match self.current.clone() {
            Some(current) if !self.done => Ok(current),
            _ => Err(self.fail(CoreError::invalid_operation(format!(
                "{operation} on a cursor with no current position"
            )))),
        }
    }

    fn land(&mut self, found: Option<(Key, Key)>) -> Option<&Key> {
        self.iter.settle(found.as_ref());
        self.done = found.is_none();
        self.current = found;
        self.key()
    }

    /// True when `candidate` is strictly beyond `current` in the direction
    /// of travel.
    fn beyond(&self, candidate: &Key, current: &Key) -> bool {
        let ord = candidate.cmp(current);
        if self.iter.direction().is_forward() {
            ord == Ordering::Greater
        } else {
            ord == Ordering::Less
        }
    }

    /// Moves `steps` positions forward.
    ///
    /// # Errors
    ///
    /// Returns `Argument` for zero steps and `InvalidOperation` when the
    /// cursor has no current position.
    pub fn advance(&mut self, steps: u32) -> CoreResult<Option<&Key>> {
        if steps == 0 {
            return Err(self.fail(CoreError::argument("advance needs at least one step")));
        }
        let (mut key, mut primary) = self.ensure_positioned("advance")?;
        let mut found = None;
        for _ in 0..steps {
            found = self.iter.locate(
                self.source,
                Seek::After {
                    key: &key,
                    primary: &primary,
                },
            );
            match &found {
                Some((k, p)) => {
                    key = k.clone();
                    primary = p.clone();
                }
                None => break,
            }
        }
        Ok(self.land(found))
    }

    /// Jumps to the first position whose effective key is at or beyond `key`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` when the cursor has no current position
    /// or `key` is not beyond the current key in the direction of travel.
    pub fn continue_key(&mut self, key: &Key) -> CoreResult<Option<&Key>> {
        let (current, _) = self.ensure_positioned("continue")?;
        if !self.beyond(key, &current) {
            return Err(self.fail(CoreError::invalid_operation(format!(
                "continue to {key} does not move past {current}"
            ))));
        }
        let found = self.iter.locate(self.source, Seek::AtKey(key));
        Ok(self.land(found))
    }

    /// Jumps within the current effective key to the first position whose
    /// primary key is at or beyond `primary_key`, else to the next key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for store or unique iterators, when the
    /// cursor has no current position, or when `primary_key` is not beyond
    /// the current primary key.
    pub fn continue_primary(&mut self, primary_key: &Key) -> CoreResult<Option<&Key>> {
        if !self.iter.kind().is_index() || self.iter.direction().is_unique() {
            return Err(self.fail(CoreError::invalid_operation(
                "continue by primary key needs a non-unique index iterator",
            )));
        }
        let (key, current) = self.ensure_positioned("continue primary")?;
        if !self.beyond(primary_key, &current) {
            return Err(self.fail(CoreError::invalid_operation(format!(
                "continue to primary key {primary_key} does not move past {current}"
            ))));
        }
        let found = self.iter.locate(
            self.source,
            Seek::AtPrimary {
                key: &key,
                primary: primary_key,
            },
        );
        Ok(self.land(found))
    }

    /// Goes back to the start of the range, or to the first position at or
    /// beyond `(key, primary_key)`.
    pub fn restart(&mut self, key: Option<&Key>, primary_key: Option<&Key>) -> Option<&Key> {
        let found = match (key, primary_key) {
            (Some(key), Some(primary)) if self.iter.kind().is_index() => {
                self.iter.locate(self.source, Seek::AtPrimary { key, primary })
            }
            (Some(key), _) => self.iter.locate(self.source, Seek::AtKey(key)),
            (None, _) => self.iter.locate(self.source, Seek::Start),
        };
        self.iter.state = IteratorState::Open;
        self.land(found)
    }

    /// Releases the cursor and completes the iterator. Safe to call again.
    pub fn exit(&mut self) {
        self.iter.complete();
        self.current = None;
        self.done = true;
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.iter.rest();
    }
}
