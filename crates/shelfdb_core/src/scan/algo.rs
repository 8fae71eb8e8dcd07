//! Builtin join solvers.
//!
//! Each solver matches positions whose primary keys are equal across
//! every cursor and collects the matched primary keys in scan order.

use super::solver::{Advancement, CursorAction, ScanValue, Solver};
use crate::cursor::RangeIterator;
use shelfdb_codec::Key;

/// Selects a builtin solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// [`NestedLoop`].
    NestedLoop,
    /// [`SortedMerge`].
    SortedMerge,
    /// [`ZigzagMerge`].
    ZigzagMerge,
}

/// A builtin solver that collects matched primary keys.
pub trait JoinSolver: Solver {
    /// Matched primary keys so far.
    fn matches(&self) -> &[Key];

    /// Consumes the solver into its matches.
    fn into_matches(self: Box<Self>) -> Vec<Key>;
}

impl Algorithm {
    /// A fresh solver for this algorithm.
    #[must_use]
    pub fn solver(self) -> Box<dyn JoinSolver> {
        match self {
            Self::NestedLoop => Box::new(NestedLoop::default()),
            Self::SortedMerge => Box::new(SortedMerge::default()),
            Self::ZigzagMerge => Box::new(ZigzagMerge::default()),
        }
    }
}

fn all_equal(values: &[Option<ScanValue>]) -> Option<Key> {
    let first = values.first()?.as_ref()?.primary_key.clone();
    values
        .iter()
        .all(|v| v.as_ref().is_some_and(|v| v.primary_key == first))
        .then_some(first)
}

fn max_primary(values: &[Option<ScanValue>]) -> Option<Key> {
    values.iter().map(|v| v.as_ref().map(|v| v.primary_key.clone())).try_fold(None, |max: Option<Key>, pk| {
        let pk = pk?;
        Some(Some(match max {
            Some(m) if m >= pk => m,
            _ => pk,
        }))
    })?
}

/// Compares every combination of positions.
///
/// The first cursor is the outer loop and the last the inner one. Works
/// with any ranges and directions, at the cost of one inner walk per outer
/// position.
#[derive(Debug, Clone, Default)]
pub struct NestedLoop {
    matches: Vec<Key>,
}

impl Solver for NestedLoop {
    fn solve(&mut self, keys: &[Option<Key>], values: &[Option<ScanValue>]) -> Advancement {
        if keys.first().map_or(true, Option::is_none) {
            return Advancement::StopAll;
        }
        let Some(exhausted) = keys.iter().position(Option::is_none) else {
            if let Some(pk) = all_equal(values) {
                self.matches.push(pk);
            }
            let mut actions = vec![None; keys.len()];
            actions[keys.len() - 1] = Some(CursorAction::Advance(1));
            return Advancement::Each(actions);
        };
        let restart = CursorAction::Restart {
            key: None,
            primary_key: None,
        };
        let actions = (0..keys.len())
            .map(|i| match i {
                i if i + 1 == exhausted => Some(CursorAction::Advance(1)),
                i if i >= exhausted => Some(restart.clone()),
                _ => None,
            })
            .collect();
        Advancement::Each(actions)
    }
}

impl JoinSolver for NestedLoop {
    fn matches(&self) -> &[Key] {
        &self.matches
    }

    fn into_matches(self: Box<Self>) -> Vec<Key> {
        self.matches
    }
}

/// Merges cursors that deliver primary keys in ascending order.
///
/// Store iterators and index iterators over a single index key qualify.
/// Lagging cursors step forward one position at a time.
#[derive(Debug, Clone, Default)]
pub struct SortedMerge {
    matches: Vec<Key>,
}

impl Solver for SortedMerge {
    fn solve(&mut self, _keys: &[Option<Key>], values: &[Option<ScanValue>]) -> Advancement {
        let Some(max) = max_primary(values) else {
            return Advancement::StopAll;
        };
        if let Some(pk) = all_equal(values) {
            self.matches.push(pk);
            return Advancement::AdvanceAll;
        }
        Advancement::Each(
            values
                .iter()
                .map(|v| match v {
                    Some(v) if v.primary_key < max => Some(CursorAction::Advance(1)),
                    _ => None,
                })
                .collect(),
        )
    }
}

impl JoinSolver for SortedMerge {
    fn matches(&self) -> &[Key] {
        &self.matches
    }

    fn into_matches(self: Box<Self>) -> Vec<Key> {
        self.matches
    }
}

/// Like [`SortedMerge`], but lagging cursors jump straight to the largest
/// primary key seen instead of stepping.
#[derive(Debug, Clone, Default)]
pub struct ZigzagMerge {
    index_cursor: Vec<bool>,
    matches: Vec<Key>,
}

impl Solver for ZigzagMerge {
    fn begin(&mut self, iterators: &[RangeIterator]) {
        self.index_cursor = iterators.iter().map(|it| it.kind().is_index()).collect();
    }

    fn solve(&mut self, _keys: &[Option<Key>], values: &[Option<ScanValue>]) -> Advancement {
        let Some(max) = max_primary(values) else {
            return Advancement::StopAll;
        };
        if let Some(pk) = all_equal(values) {
            self.matches.push(pk);
            return Advancement::AdvanceAll;
        }
        Advancement::Each(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Some(v) if v.primary_key < max => Some(if self.index_cursor.get(i).copied().unwrap_or(false) {
                        CursorAction::ContinuePrimaryTo(max.clone())
                    } else {
                        CursorAction::ContinueTo(max.clone())
                    }),
                    _ => None,
                })
                .collect(),
        )
    }
}

impl JoinSolver for ZigzagMerge {
    fn matches(&self) -> &[Key] {
        &self.matches
    }

    fn into_matches(self: Box<Self>) -> Vec<Key> {
        self.matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(pk: i32) -> Option<ScanValue> {
        Some(ScanValue {
            primary_key: Key::from(pk),
            record: None,
        })
    }

    fn keys(values: &[Option<ScanValue>]) -> Vec<Option<Key>> {
        values.iter().map(|v| v.as_ref().map(|v| v.primary_key.clone())).collect()
    }

    #[test]
    fn sorted_merge_steps_lagging_cursors() {
        let mut solver = SortedMerge::default();
        let values = [at(1), at(3), at(2)];
        assert_eq!(
            solver.solve(&keys(&values), &values),
            Advancement::Each(vec![Some(CursorAction::Advance(1)), None, Some(CursorAction::Advance(1))])
        );
        let values = [at(3), at(3), at(3)];
        assert_eq!(solver.solve(&keys(&values), &values), Advancement::AdvanceAll);
        let values = [at(4), None, at(5)];
        assert_eq!(solver.solve(&keys(&values), &values), Advancement::StopAll);
        assert_eq!(solver.matches(), &[Key::from(3)]);
    }

    #[test]
    fn nested_loop_restarts_inner_cursor() {
        let mut solver = NestedLoop::default();
        let values = [at(1), at(1)];
        assert_eq!(
            solver.solve(&keys(&values), &values),
            Advancement::Each(vec![None, Some(CursorAction::Advance(1))])
        );
        let values = [at(1), None];
        assert_eq!(
            solver.solve(&keys(&values), &values),
            Advancement::Each(vec![
                Some(CursorAction::Advance(1)),
                Some(CursorAction::Restart {
                    key: None,
                    primary_key: None
                })
            ])
        );
        let values = [None, at(2)];
        assert_eq!(solver.solve(&keys(&values), &values), Advancement::StopAll);
        assert_eq!(Box::new(solver).into_matches(), vec![Key::from(1)]);
    }

    #[test]
    fn zigzag_jumps_by_cursor_kind() {
        let mut solver = ZigzagMerge::default();
        solver.begin(&[
            RangeIterator::index_keys("a", "x"),
            RangeIterator::keys("b"),
            RangeIterator::keys("c"),
        ]);
        let values = [at(1), at(2), at(5)];
        assert_eq!(
            solver.solve(&keys(&values), &values),
            Advancement::Each(vec![
                Some(CursorAction::ContinuePrimaryTo(Key::from(5))),
                Some(CursorAction::ContinueTo(Key::from(5))),
                None
            ])
        );
    }
}
