//! # ShelfDB Core
//!
//! An embedded object-store database in the IndexedDB mould.
//!
//! This crate provides:
//! - Declarative schemas with versioned and auto-versioned upgrades
//! - Connections with version-change notification, blocking and timeouts
//! - Transactions over snapshots, made durable through a per-database journal
//! - A request executor for batched reads, writes, removals, counts and
//!   resumable range listings
//! - Range iterators and cursors over stores and indexes
//! - Multi-cursor scans and joins driven by pluggable solvers
//!
//! ```rust
//! use shelfdb_core::{ConnectionPool, DatabaseSchema, IndexSchema, KeyRange, ListMethod, ListQuery, StoreSchema};
//! use shelfdb_codec::Value;
//!
//! let pool = ConnectionPool::in_memory();
//! let schema = DatabaseSchema::versioned(
//!     1,
//!     vec![StoreSchema::with_key_path("notes", "id").index(IndexSchema::new("by_tag", "tag"))],
//! );
//! let conn = pool.connect("notes", schema)?;
//! conn.put("notes", Value::object([("id", Value::from(1)), ("tag", Value::from("todo"))]))?;
//!
//! let query = ListQuery::new("notes", ListMethod::Values)
//!     .index("by_tag")
//!     .range(KeyRange::only("todo"));
//! assert_eq!(conn.list(&query)?.len(), 1);
//! # Ok::<(), shelfdb_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connection;
mod cursor;
mod dir;
mod engine;
mod error;
mod executor;
pub mod journal;
mod key_range;
mod scan;
mod schema;
mod transaction;
mod types;

pub use config::{Config, DEFAULT_BATCH_WINDOW, DEFAULT_LIST_LIMIT};
pub use connection::{
    ConnectReport, Connection, ConnectionListener, ConnectionPool, SchemaChange, VersionChangeEvent,
    VersionChangeResponse,
};
pub use cursor::{Cursor, IteratorKind, IteratorState, RangeIterator};
pub use dir::StorageDir;
pub use error::{CoreError, CoreResult};
pub use executor::{
    BTreeExecutor, BatchResult, CursorPosition, ListItem, ListMethod, ListQuery, RecordRef, RequestExecutor,
};
pub use key_range::{KeyRange, RangeOp};
pub use scan::{
    Advancement, Algorithm, CursorAction, JoinSolver, NestedLoop, Operator, ScanValue, Solver, SortedMerge, Visit,
    ZigzagMerge,
};
pub use schema::{
    index_from_value, index_to_value, store_from_value, store_to_value, DataType, DatabaseSchema, IndexGenerator,
    IndexSchema, KeyPath, SchemaDifference, SchemaRegistry, SchemaVersion, StoreSchema,
};
pub use transaction::{Transaction, TransactionState};
pub use types::{ConnectionId, Direction, TransactionId, TransactionMode};
