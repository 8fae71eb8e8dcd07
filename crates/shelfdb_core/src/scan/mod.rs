//! Scans over several iterators at once.
//!
//! A [`Solver`] looks at where every cursor stands and decides how each
//! one moves. [`Operator::scan`] runs the rounds; [`Operator::join`] does
//! so with one of the builtin solvers and collects the primary keys found
//! in every iterator.
//!
//! ```rust
//! use shelfdb_core::{Algorithm, ConnectionPool, DatabaseSchema, IndexSchema, KeyRange, RangeIterator, StoreSchema};
//! use shelfdb_codec::{Key, Value};
//!
//! let pool = ConnectionPool::in_memory();
//! let schema = DatabaseSchema::versioned(
//!     1,
//!     vec![StoreSchema::with_key_path("pets", "id")
//!         .index(IndexSchema::new("by_kind", "kind"))
//!         .index(IndexSchema::new("by_age", "age"))],
//! );
//! let conn = pool.connect("pets", schema)?;
//! for (id, kind, age) in [(1, "cat", 3), (2, "dog", 3), (3, "cat", 5)] {
//!     conn.put(
//!         "pets",
//!         Value::object([("id", Value::from(id)), ("kind", Value::from(kind)), ("age", Value::from(age))]),
//!     )?;
//! }
//!
//! let mut iterators = vec![
//!     RangeIterator::index_keys("pets", "by_kind").with_range(KeyRange::only("cat")),
//!     RangeIterator::index_keys("pets", "by_age").with_range(KeyRange::only(3)),
//! ];
//! let found = conn.operator().join(Algorithm::SortedMerge, &mut iterators)?;
//! assert_eq!(found, vec![Key::from(1)]);
//! # Ok::<(), shelfdb_core::CoreError>(())
//! ```

mod algo;
mod operator;
mod solver;

pub use algo::{Algorithm, JoinSolver, NestedLoop, SortedMerge, ZigzagMerge};
pub use operator::{Operator, Visit};
pub use solver::{Advancement, CursorAction, ScanValue, Solver};
