//! Cursors over stores and indexes.
//!
//! A [`RangeIterator`] describes a walk and remembers where it stopped:
//!
//! ```text
//! Initial ──open──▶ Open ──drop──▶ Resting ──open──▶ Open
//!                    │                                 │
//!                    └──── exit / exhausted ──▶ Completed
//! ```
//!
//! [`RangeIterator::open`] binds it to a transaction as a [`Cursor`]. Key
//! and value iterators, over stores or indexes, share the same cursor.

mod bound;
mod iterator;

pub use bound::Cursor;
pub use iterator::{IteratorKind, IteratorState, RangeIterator};
