//! CRUD requests inside a transaction.
//!
//! [`RequestExecutor`] is the request surface every backing engine
//! provides; [`BTreeExecutor`] runs it over the in-memory engine. Every
//! request validates store and index names before touching data and
//! fails fast with `Argument`. Batch requests report per item through
//! [`BatchResult`].

mod batch;
mod btree;
mod list;
mod load;

pub use batch::{BatchResult, RecordRef};
pub use btree::BTreeExecutor;
pub use list::{CursorPosition, ListItem, ListMethod, ListQuery};

use crate::error::CoreResult;
use crate::key_range::KeyRange;
use crate::transaction::Transaction;
use shelfdb_codec::{Key, Value};

/// CRUD primitives over the stores of one transaction.
pub trait RequestExecutor {
    /// The record at `key`, or `None`.
    fn get(&self, tx: &Transaction<'_>, store: &str, key: &Key) -> CoreResult<Option<Value>>;

    /// The records at `keys`, one slot per key in request order.
    fn get_many(&self, tx: &Transaction<'_>, store: &str, keys: &[Key]) -> CoreResult<BatchResult<Option<Value>>>;

    /// Like [`get_many`](Self::get_many) for keys spread over several stores.
    fn get_by_refs(&self, tx: &Transaction<'_>, refs: &[RecordRef]) -> CoreResult<BatchResult<Option<Value>>>;

    /// Inserts or replaces records. `keys`, when given, pairs one explicit
    /// key with each record.
    fn put(
        &self,
        tx: &mut Transaction<'_>,
        store: &str,
        records: Vec<Value>,
        keys: Option<Vec<Key>>,
    ) -> CoreResult<BatchResult<Key>>;

    /// Inserts records. A record whose key exists fails its slot with
    /// `Constraint`; the others are still written.
    fn add(
        &self,
        tx: &mut Transaction<'_>,
        store: &str,
        records: Vec<Value>,
        keys: Option<Vec<Key>>,
    ) -> CoreResult<BatchResult<Key>>;

    /// Inserts or replaces records identified by store and key.
    fn put_by_refs(&self, tx: &mut Transaction<'_>, items: Vec<(RecordRef, Value)>) -> CoreResult<BatchResult<Key>>;

    /// Bulk loads delimited text: a header line of field names, then one
    /// record per line. Values are coerced by the declared type of the
    /// index named after the field, or the key type for the key path field.
    fn put_data(&self, tx: &mut Transaction<'_>, store: &str, data: &str, delimiter: char) -> CoreResult<Vec<Key>>;

    /// Deletes one record. Returns 1 if it existed, else 0.
    fn remove_by_id(&self, tx: &mut Transaction<'_>, store: &str, key: &Key) -> CoreResult<usize>;

    /// Deletes records across stores, one at a time in request order.
    fn remove_by_refs(&self, tx: &mut Transaction<'_>, refs: &[RecordRef]) -> CoreResult<BatchResult<usize>>;

    /// Deletes every record whose primary key is in `range`.
    fn remove_by_key_range(&self, tx: &mut Transaction<'_>, store: &str, range: &KeyRange) -> CoreResult<usize>;

    /// Deletes a key range, or the whole store when `range` is `None`.
    fn clear_by_key_range(&self, tx: &mut Transaction<'_>, store: &str, range: Option<&KeyRange>) -> CoreResult<usize>;

    /// Empties every listed store.
    fn clear_by_stores(&self, tx: &mut Transaction<'_>, stores: &[&str]) -> CoreResult<()>;

    /// Deletes every record whose key in `index` is in `range`.
    fn remove_by_index_key_range(
        &self,
        tx: &mut Transaction<'_>,
        store: &str,
        index: &str,
        range: &KeyRange,
    ) -> CoreResult<usize>;

    /// Record count of each store.
    fn count(&self, tx: &Transaction<'_>, stores: &[&str]) -> CoreResult<Vec<usize>>;

    /// Number of positions in `range`, over the store or an index. With
    /// `unique` each distinct index key counts once.
    fn count_key_range(
        &self,
        tx: &Transaction<'_>,
        store: &str,
        range: Option<&KeyRange>,
        index: Option<&str>,
        unique: bool,
    ) -> CoreResult<usize>;

    /// Runs a range query. With a `position`, continues right after where
    /// the previous call stopped and moves the position forward.
    fn list(&self, tx: &Transaction<'_>, query: &ListQuery, position: Option<&mut CursorPosition>)
        -> CoreResult<Vec<ListItem>>;
}
