//! Running iterators: multi-cursor scans, joins and single-iterator walks.

use super::algo::Algorithm;
use super::solver::{Advancement, CursorAction, ScanValue, Solver};
use crate::connection::Connection;
use crate::cursor::{Cursor, IteratorState, RangeIterator};
use crate::engine::{Seek, WriteMode};
use crate::error::{CoreError, CoreResult};
use crate::executor::{CursorPosition, ListItem, ListMethod, ListQuery};
use crate::types::TransactionMode;
use shelfdb_codec::{Key, Value};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// What [`Operator::open`] does with the visited record.
#[derive(Debug, Clone, PartialEq)]
pub enum Visit {
    /// Move on to the next position.
    Continue,
    /// Stop here; the iterator rests at this position.
    Stop,
    /// Replace the record, then move on.
    Update(Value),
    /// Delete the record, then move on.
    Delete,
}

/// Runs iterators against a connection.
///
/// Every call runs in its own transaction. Iterators keep their position
/// between calls, so a walk can be continued later.
#[derive(Debug, Clone, Copy)]
pub struct Operator<'c> {
    conn: &'c Connection,
}

fn ensure_idle(iter: &RangeIterator) -> CoreResult<()> {
    if iter.state() == IteratorState::Open {
        return Err(CoreError::invalid_operation(format!("{iter} is already open")));
    }
    Ok(())
}

fn scan_value(cursor: &Cursor<'_>) -> Option<ScanValue> {
    cursor.primary_key().map(|pk| ScanValue {
        primary_key: pk.clone(),
        record: cursor.value().cloned(),
    })
}

fn exit_all(cursors: &mut [Cursor<'_>]) {
    for cursor in cursors {
        cursor.exit();
    }
}

fn apply(cursor: &mut Cursor<'_>, slot: usize, action: &CursorAction) -> CoreResult<()> {
    if cursor.is_done() && !matches!(action, CursorAction::Restart { .. }) {
        return Err(CoreError::invalid_operation(format!(
            "cursor {slot} is exhausted and can only restart"
        )));
    }
    match action {
        CursorAction::Advance(steps) => {
            cursor.advance(*steps)?;
        }
        CursorAction::ContinueTo(key) => {
            cursor.continue_key(key)?;
        }
        CursorAction::ContinuePrimaryTo(primary_key) => {
            cursor.continue_primary(primary_key)?;
        }
        CursorAction::Restart { key, primary_key } => {
            cursor.restart(key.as_ref(), primary_key.as_ref());
        }
    }
    Ok(())
}

/// Runs solver rounds until the solver stops or nothing moves.
fn drive<S: Solver + ?Sized>(solver: &mut S, cursors: &mut [Cursor<'_>]) -> CoreResult<usize> {
    let mut rounds = 0;
    loop {
        let keys: Vec<Option<Key>> = cursors.iter().map(|c| c.key().cloned()).collect();
        let values: Vec<Option<ScanValue>> = cursors.iter().map(scan_value).collect();
        rounds += 1;

        let moves = match solver.solve(&keys, &values) {
            Advancement::StopAll => return Ok(rounds),
            Advancement::AdvanceAll => {
                let mut moves = 0;
                for cursor in cursors.iter_mut().filter(|c| !c.is_done()) {
                    cursor.advance(1)?;
                    moves += 1;
                }
                moves
            }
            Advancement::Each(actions) => {
                if actions.len() > cursors.len() {
                    return Err(CoreError::argument(format!(
                        "solver returned {} actions for {} cursors",
                        actions.len(),
                        cursors.len()
                    )));
                }
                let mut moves = 0;
                for (slot, action) in actions.iter().enumerate() {
                    if let Some(action) = action {
                        apply(&mut cursors[slot], slot, action)?;
                        moves += 1;
                    }
                }
                moves
            }
        };
        if moves == 0 {
            exit_all(cursors);
            return Ok(rounds);
        }
    }
}

impl<'c> Operator<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Walks several iterators together under the direction of `solver`.
    ///
    /// Each round the solver sees every cursor's effective key and value:
    /// the primary key for key iterators, the record as well for value
    /// iterators. The scan ends when the solver answers
    /// [`Advancement::StopAll`], leaving each iterator resting where its
    /// cursor stood, or when a round moves no cursor, which completes them
    /// all.
    ///
    /// # Errors
    ///
    /// - `Argument` for an empty iterator list, or more actions than
    ///   cursors.
    /// - `InvalidOperation` when an iterator is already open, or a move is
    ///   invalid for its cursor. Every cursor is exited.
    pub fn scan<S: Solver + ?Sized>(&self, solver: &mut S, iterators: &mut [RangeIterator]) -> CoreResult<()> {
        if iterators.is_empty() {
            return Err(CoreError::argument("a scan needs at least one iterator"));
        }
        for iter in iterators.iter() {
            ensure_idle(iter)?;
        }
        let scope: Vec<String> = iterators
            .iter()
            .map(|it| it.store_name().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let stores: Vec<&str> = scope.iter().map(String::as_str).collect();

        self.conn.run(&stores, TransactionMode::ReadOnly, |tx| {
            let tx = &*tx;
            solver.begin(iterators);
            let mut cursors = Vec::with_capacity(iterators.len());
            for iter in iterators.iter_mut() {
                match iter.open(tx) {
                    Ok(cursor) => cursors.push(cursor),
                    Err(err) => {
                        exit_all(&mut cursors);
                        return Err(err);
                    }
                }
            }
            match drive(solver, &mut cursors) {
                Ok(rounds) => {
                    debug!(cursors = cursors.len(), rounds, "scan finished");
                    Ok(())
                }
                Err(err) => {
                    exit_all(&mut cursors);
                    Err(err)
                }
            }
        })
    }

    /// Scans with a builtin solver and returns the primary keys found at
    /// every cursor.
    ///
    /// # Errors
    ///
    /// As for [`scan`](Self::scan).
    pub fn join(&self, algorithm: Algorithm, iterators: &mut [RangeIterator]) -> CoreResult<Vec<Key>> {
        let mut solver = algorithm.solver();
        self.scan(solver.as_mut(), iterators)?;
        let matches = solver.into_matches();
        debug!(?algorithm, matches = matches.len(), "join finished");
        Ok(matches)
    }

    /// Walks `iter` in a read-write transaction, letting `visit` update or
    /// delete each record. Returns how many positions were visited.
    ///
    /// Positions are computed against the transaction's own view, so a
    /// deleted record is never visited again and an updated record whose
    /// index key moves ahead may be visited twice.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` when a cursor is already open on `iter`.
    /// - `Data` when an update changes the in-line key of a record.
    /// - Any write error. The transaction aborts and `iter` completes.
    pub fn open<F>(&self, iter: &mut RangeIterator, mut visit: F) -> CoreResult<usize>
    where
        F: FnMut(&Key, &Key, &Value) -> Visit,
    {
        ensure_idle(iter)?;
        let store = iter.store_name().to_string();
        let result = self.conn.run(&[&store], TransactionMode::ReadWrite, |tx| {
            let mut visited = 0;
            let mut position = iter.first_position(iter.source(tx)?);
            while let Some((key, primary)) = position {
                let record = tx.store(&store)?.get(&primary).cloned().unwrap_or(Value::Null);
                visited += 1;
                match visit(&key, &primary, &record) {
                    Visit::Continue => {}
                    Visit::Stop => {
                        iter.rest_at(Some((key, primary)));
                        return Ok(visited);
                    }
                    Visit::Update(value) => {
                        let in_line = tx.store(&store)?.schema().key_path().is_some();
                        let explicit = (!in_line).then(|| primary.clone());
                        let written = tx.put(&store, value, explicit, WriteMode::Put)?;
                        if written != primary {
                            return Err(CoreError::data(
                                &store,
                                format!("update changed the key of record {primary} to {written}"),
                            ));
                        }
                        trace!(store = %store, key = %primary, "record updated");
                    }
                    Visit::Delete => {
                        tx.delete(&store, &primary)?;
                        trace!(store = %store, key = %primary, "record deleted");
                    }
                }
                position = iter.locate(
                    iter.source(tx)?,
                    Seek::After {
                        key: &key,
                        primary: &primary,
                    },
                );
                iter.settle(position.as_ref());
            }
            Ok(visited)
        });
        if result.is_err() {
            iter.complete();
        }
        result
    }

    /// Applies `f` to every position of `iter` and collects the results.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` when a cursor is already open on `iter`, or the
    /// errors of [`RangeIterator::open`].
    pub fn map<T, F>(&self, iter: &mut RangeIterator, mut f: F) -> CoreResult<Vec<T>>
    where
        F: FnMut(&Key, &ScanValue) -> T,
    {
        self.reduce(iter, Vec::new(), |mut out, key, value, _| {
            out.push(f(key, value));
            out
        })
    }

    /// Folds every position of `iter` into an accumulator. The callback
    /// gets the effective key, the scan value and the position's ordinal.
    ///
    /// # Errors
    ///
    /// As for [`map`](Self::map).
    pub fn reduce<A, F>(&self, iter: &mut RangeIterator, init: A, mut f: F) -> CoreResult<A>
    where
        F: FnMut(A, &Key, &ScanValue, usize) -> A,
    {
        ensure_idle(iter)?;
        let store = iter.store_name().to_string();
        self.conn.run(&[&store], TransactionMode::ReadOnly, |tx| {
            let mut cursor = iter.open(tx)?;
            let mut acc = init;
            let mut ordinal = 0;
            while let (Some(key), Some(value)) = (cursor.key().cloned(), scan_value(&cursor)) {
                acc = f(acc, &key, &value, ordinal);
                ordinal += 1;
                cursor.advance(1)?;
            }
            Ok(acc)
        })
    }

    fn list_iter(
        &self,
        iter: &mut RangeIterator,
        method: ListMethod,
        limit: usize,
        offset: usize,
    ) -> CoreResult<Vec<ListItem>> {
        ensure_idle(iter)?;
        let resting = iter.state() == IteratorState::Resting;
        if resting && offset > 0 {
            return Err(CoreError::argument("offset cannot be combined with a resting iterator"));
        }
        let mut query = ListQuery::new(iter.store_name(), method).limit(limit).offset(offset);
        if let Some(index) = iter.index_name() {
            query = query.index(index);
        }
        if let Some(range) = iter.range() {
            query = query.range(range.clone());
        }
        if !iter.direction().is_forward() {
            query = query.reverse();
        }
        if iter.direction().is_unique() {
            query = query.unique();
        }
        let mut position = match iter.key() {
            Some(key) if resting => CursorPosition::after(key.clone(), iter.primary_key().cloned()),
            _ => CursorPosition::new(),
        };

        let items = self.conn.list_from(&query, &mut position)?;
        if position.is_exhausted() {
            iter.complete();
        } else {
            iter.rest_at(position.key().cloned().zip(position.primary_key().cloned()));
        }
        Ok(items)
    }

    /// Up to `limit` effective keys from `iter`, continuing after its
    /// saved position. The iterator rests after the last key returned, or
    /// completes once the range is exhausted.
    ///
    /// # Errors
    ///
    /// - `Argument` for a zero limit, or an offset on a resting iterator.
    /// - `InvalidOperation` when a cursor is already open on `iter`.
    pub fn keys_of(&self, iter: &mut RangeIterator, limit: usize, offset: usize) -> CoreResult<Vec<Key>> {
        Ok(self
            .list_iter(iter, ListMethod::Keys, limit, offset)?
            .into_iter()
            .filter_map(|item| match item {
                ListItem::Key(key) => Some(key),
                _ => None,
            })
            .collect())
    }

    /// Like [`keys_of`](Self::keys_of), but yields what each position
    /// delivers: records for value iterators, primary keys for key
    /// iterators.
    ///
    /// # Errors
    ///
    /// As for [`keys_of`](Self::keys_of).
    pub fn values_of(&self, iter: &mut RangeIterator, limit: usize, offset: usize) -> CoreResult<Vec<Value>> {
        let method = if iter.kind().is_key_only() {
            ListMethod::PrimaryKeys
        } else {
            ListMethod::Values
        };
        Ok(self
            .list_iter(iter, method, limit, offset)?
            .into_iter()
            .filter_map(|item| match item {
                ListItem::PrimaryKey(key) => Some(key.to_value()),
                other => other.into_value(),
            })
            .collect())
    }
}
