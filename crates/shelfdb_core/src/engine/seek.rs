//! Cursor positioning over stores and indexes.
//!
//! A position is an (effective key, primary key) pair. For a store both
//! halves are the record key; for an index the effective key is the index
//! key. [`locate`] finds the next position for a seek without holding any
//! iterator, so a cursor can be rebuilt from its last position after the
//! data under it changed.

use super::{IndexTree, ObjectStore};
use crate::key_range::{in_range, KeyRange};
use crate::types::Direction;
use shelfdb_codec::Key;
use std::ops::Bound;

/// What a cursor walks.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Source<'a> {
    /// Records by primary key.
    Store(&'a ObjectStore),
    /// Index entries by index key, then primary key.
    Index(&'a IndexTree),
}

/// Where to go next, relative to the direction of travel.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Seek<'k> {
    /// First position in range.
    Start,
    /// First position strictly after `(key, primary)`.
    After { key: &'k Key, primary: &'k Key },
    /// First position whose effective key is strictly beyond `key`.
    Past(&'k Key),
    /// First position whose effective key is at or beyond `key`.
    AtKey(&'k Key),
    /// First position at `key` whose primary key is at or beyond `primary`,
    /// else the first position past `key`.
    AtPrimary { key: &'k Key, primary: &'k Key },
}

/// True when no key satisfies both bounds. `BTreeMap::range` panics on
/// inverted bounds, so every range walk checks this first.
pub(crate) fn bounds_empty(lo: Bound<&Key>, hi: Bound<&Key>) -> bool {
    match (lo, hi) {
        (Bound::Included(l) | Bound::Excluded(l), Bound::Included(h) | Bound::Excluded(h)) => {
            l > h || (l == h && !(matches!(lo, Bound::Included(_)) && matches!(hi, Bound::Included(_))))
        }
        _ => false,
    }
}

fn tighter_lower<'a>(a: Bound<&'a Key>, b: Bound<&'a Key>) -> Bound<&'a Key> {
    match (a, b) {
        (Bound::Unbounded, x) | (x, Bound::Unbounded) => x,
        (Bound::Included(x) | Bound::Excluded(x), Bound::Included(y) | Bound::Excluded(y)) => {
            if x > y {
                a
            } else if y > x {
                b
            } else if matches!(a, Bound::Excluded(_)) {
                a
            } else {
                b
            }
        }
    }
}

fn tighter_upper<'a>(a: Bound<&'a Key>, b: Bound<&'a Key>) -> Bound<&'a Key> {
    match (a, b) {
        (Bound::Unbounded, x) | (x, Bound::Unbounded) => x,
        (Bound::Included(x) | Bound::Excluded(x), Bound::Included(y) | Bound::Excluded(y)) => {
            if x < y {
                a
            } else if y < x {
                b
            } else if matches!(a, Bound::Excluded(_)) {
                a
            } else {
                b
            }
        }
    }
}

/// Finds the position a cursor moves to.
///
/// Unique directions visit each effective key once, at its lowest primary
/// key, in both directions. Non-unique reverse walks visit primary keys of
/// a tied effective key in descending order.
pub(crate) fn locate<'a>(
    source: Source<'_>,
    range: Option<&'a KeyRange>,
    direction: Direction,
    seek: Seek<'a>,
) -> Option<(Key, Key)> {
    let forward = direction.is_forward();

    if let (Source::Index(tree), false) = (source, direction.is_unique()) {
        let within = match seek {
            Seek::After { key, primary } => Some((key, Bound::Excluded(primary))),
            Seek::AtPrimary { key, primary } => Some((key, Bound::Included(primary))),
            _ => None,
        };
        if let Some((key, bound)) = within {
            if in_range(range, key) {
                if let Some(set) = tree.entries().get(key) {
                    let hit = if forward {
                        set.range::<Key, _>((bound, Bound::Unbounded)).next()
                    } else {
                        set.range::<Key, _>((Bound::Unbounded, bound)).next_back()
                    };
                    if let Some(primary) = hit {
                        return Some((key.clone(), primary.clone()));
                    }
                }
            }
        }
    }

    let (base_lo, base_hi) = range.map_or((Bound::Unbounded, Bound::Unbounded), |r| {
        (r.start_bound(), r.end_bound())
    });
    let cut = match seek {
        Seek::Start => None,
        // unique walks visit `key` once, at its lowest primary key
        Seek::AtPrimary { key, .. } if direction.is_unique() || matches!(source, Source::Store(_)) => {
            Some(Bound::Included(key))
        }
        Seek::After { key, .. } | Seek::Past(key) | Seek::AtPrimary { key, .. } => {
            Some(Bound::Excluded(key))
        }
        Seek::AtKey(key) => Some(Bound::Included(key)),
    };
    let (lo, hi) = match cut {
        None => (base_lo, base_hi),
        Some(c) if forward => (tighter_lower(base_lo, c), base_hi),
        Some(c) => (base_lo, tighter_upper(base_hi, c)),
    };
    if bounds_empty(lo, hi) {
        return None;
    }

    match source {
        Source::Store(store) => {
            let mut it = store.records().range::<Key, _>((lo, hi));
            let (key, _) = if forward { it.next() } else { it.next_back() }?;
            Some((key.clone(), key.clone()))
        }
        Source::Index(tree) => {
            let mut it = tree.entries().range::<Key, _>((lo, hi));
            let (key, set) = if forward { it.next() } else { it.next_back() }?;
            let primary = if forward || direction.is_unique() {
                set.first()
            } else {
                set.last()
            }?;
            Some((key.clone(), primary.clone()))
        }
    }
}

/// Every position in range, in direction order.
pub(crate) fn collect_positions(
    source: Source<'_>,
    range: Option<&KeyRange>,
    direction: Direction,
) -> Vec<(Key, Key)> {
    let mut out: Vec<(Key, Key)> = Vec::new();
    let mut next = locate(source, range, direction, Seek::Start);
    while let Some(pos) = next {
        next = locate(
            source,
            range,
            direction,
            Seek::After {
                key: &pos.0,
                primary: &pos.1,
            },
        );
        out.push(pos);
    }
    out
}
