//! The decision function behind multi-cursor scans.

use crate::cursor::RangeIterator;
use shelfdb_codec::{Key, Value};

/// What one cursor delivered for the current round.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanValue {
    /// Primary key at the cursor position.
    pub primary_key: Key,
    /// The record, for value iterators.
    pub record: Option<Value>,
}

/// Where one cursor goes next.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorAction {
    /// Move forward this many positions.
    Advance(u32),
    /// Jump to the first effective key at or beyond this one.
    ContinueTo(Key),
    /// Jump within the current effective key to the first primary key at
    /// or beyond this one.
    ContinuePrimaryTo(Key),
    /// Go back to the start of the range, or to a given position.
    Restart {
        /// Effective key to restart at.
        key: Option<Key>,
        /// Primary key to restart at within `key`.
        primary_key: Option<Key>,
    },
}

/// A solver's answer for one round.
#[derive(Debug, Clone, PartialEq)]
pub enum Advancement {
    /// Advance every positioned cursor one step.
    AdvanceAll,
    /// End the scan.
    StopAll,
    /// One action per cursor by position. `None`, or a missing trailing
    /// slot, leaves that cursor where it is. The scan ends when no slot
    /// holds an action.
    Each(Vec<Option<CursorAction>>),
}

/// Drives a scan: sees every cursor's position each round and decides
/// how each moves.
///
/// `keys[i]` is the effective key of cursor `i`, `None` once it ran out;
/// `values[i]` is what it delivered. Asking an exhausted cursor to move
/// anywhere but a restart fails the scan with `InvalidOperation`.
///
/// Closures of the right shape are solvers:
///
/// ```rust
/// use shelfdb_core::{Advancement, ScanValue, Solver};
/// use shelfdb_codec::Key;
///
/// let mut seen = 0;
/// let mut count = |keys: &[Option<Key>], _values: &[Option<ScanValue>]| {
///     if keys.iter().all(Option::is_some) {
///         seen += 1;
///         Advancement::AdvanceAll
///     } else {
///         Advancement::StopAll
///     }
/// };
/// assert_eq!(count.solve(&[None], &[None]), Advancement::StopAll);
/// ```
pub trait Solver {
    /// Called once before the cursors open.
    fn begin(&mut self, _iterators: &[RangeIterator]) {}

    /// Decides the next round.
    fn solve(&mut self, keys: &[Option<Key>], values: &[Option<ScanValue>]) -> Advancement;
}

impl<F> Solver for F
where
    F: FnMut(&[Option<Key>], &[Option<ScanValue>]) -> Advancement,
{
    fn solve(&mut self, keys: &[Option<Key>], values: &[Option<ScanValue>]) -> Advancement {
        self(keys, values)
    }
}
