//! Request executor over the in-memory B-tree engine.

use super::batch::{BatchResult, RecordRef};
use super::list::{self, CursorPosition, ListItem, ListQuery};
use super::{load, RequestExecutor};
use crate::config::{Config, DEFAULT_BATCH_WINDOW, DEFAULT_LIST_LIMIT};
use crate::engine::{collect_positions, WriteMode};
use crate::error::{CoreError, CoreResult};
use crate::key_range::KeyRange;
use crate::transaction::Transaction;
use crate::types::Direction;
use shelfdb_codec::{Key, Value};
use tracing::trace;

/// Executes requests against the stores of a transaction's snapshot.
///
/// Batch requests run in windows of `batch_window` items. Each item
/// succeeds or fails on its own; only a failure of the transaction itself
/// fails the whole call.
#[derive(Debug, Clone, Copy)]
pub struct BTreeExecutor {
    batch_window: usize,
    default_list_limit: usize,
}

impl Default for BTreeExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_WINDOW, DEFAULT_LIST_LIMIT)
    }
}

impl BTreeExecutor {
    /// Creates an executor. Zero values fall back to 1.
    #[must_use]
    pub fn new(batch_window: usize, default_list_limit: usize) -> Self {
        Self {
            batch_window: batch_window.max(1),
            default_list_limit: default_list_limit.max(1),
        }
    }

    /// Creates an executor with the windows of `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.batch_window, config.default_list_limit)
    }

    /// Items per batch window.
    #[must_use]
    pub fn batch_window(&self) -> usize {
        self.batch_window
    }

    fn windowed<I, T>(&self, label: &str, items: Vec<I>, mut f: impl FnMut(I) -> CoreResult<T>) -> BatchResult<T> {
        let total = items.len();
        let mut out = BatchResult::with_capacity(total);
        let mut items = items.into_iter().peekable();
        let mut window = 0usize;
        while items.peek().is_some() {
            let mut size = 0usize;
            for item in items.by_ref().take(self.batch_window) {
                out.push(f(item));
                size += 1;
            }
            trace!(request = label, window, size, total, "batch window done");
            window += 1;
        }
        out
    }

    fn write_all(
        &self,
        tx: &mut Transaction<'_>,
        store: &str,
        records: Vec<Value>,
        keys: Option<Vec<Key>>,
        mode: WriteMode,
    ) -> CoreResult<BatchResult<Key>> {
        tx.check_writable(store)?;
        let items: Vec<(Value, Option<Key>)> = match keys {
            Some(keys) if keys.len() != records.len() => {
                return Err(CoreError::argument(format!(
                    "{} records but {} keys",
                    records.len(),
                    keys.len()
                )))
            }
            Some(keys) => records.into_iter().zip(keys.into_iter().map(Some)).collect(),
            None => records.into_iter().map(|r| (r, None)).collect(),
        };
        let label = match mode {
            WriteMode::Put => "put",
            WriteMode::Add => "add",
        };
        Ok(self.windowed(label, items, |(value, key)| tx.put(store, value, key, mode)))
    }

    fn remove_keys(tx: &mut Transaction<'_>, store: &str, keys: Vec<Key>) -> CoreResult<usize> {
        let mut removed = 0;
        for key in keys {
            if tx.delete(store, &key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl RequestExecutor for BTreeExecutor {
    fn get(&self, tx: &Transaction<'_>, store: &str, key: &Key) -> CoreResult<Option<Value>> {
        Ok(tx.store(store)?.get(key).cloned())
    }

    fn get_many(&self, tx: &Transaction<'_>, store: &str, keys: &[Key]) -> CoreResult<BatchResult<Option<Value>>> {
        let target = tx.store(store)?;
        Ok(self.windowed("get", keys.iter().collect(), |key| Ok(target.get(key).cloned())))
    }

    fn get_by_refs(&self, tx: &Transaction<'_>, refs: &[RecordRef]) -> CoreResult<BatchResult<Option<Value>>> {
        for r in refs {
            tx.store(&r.store)?;
        }
        Ok(self.windowed("get", refs.iter().collect(), |r| {
            Ok(tx.store(&r.store)?.get(&r.key).cloned())
        }))
    }

    fn put(
        &self,
        tx: &mut Transaction<'_>,
        store: &str,
        records: Vec<Value>,
        keys: Option<Vec<Key>>,
    ) -> CoreResult<BatchResult<Key>> {
        self.write_all(tx, store, records, keys, WriteMode::Put)
    }

    fn add(
        &self,
        tx: &mut Transaction<'_>,
        store: &str,
        records: Vec<Value>,
        keys: Option<Vec<Key>>,
    ) -> CoreResult<BatchResult<Key>> {
        self.write_all(tx, store, records, keys, WriteMode::Add)
    }

    fn put_by_refs(&self, tx: &mut Transaction<'_>, items: Vec<(RecordRef, Value)>) -> CoreResult<BatchResult<Key>> {
        for (r, _) in &items {
            tx.check_writable(&r.store)?;
        }
        Ok(self.windowed("put", items, |(r, value)| {
            let key_path = tx.store(&r.store)?.schema().key_path().cloned();
            match key_path {
                Some(path) => match path.extract(&value) {
                    Some(inline) if inline == r.key => tx.put(&r.store, value, None, WriteMode::Put),
                    _ => Err(CoreError::data(
                        r.store.as_str(),
                        format!("record key at '{path}' does not match {r}"),
                    )),
                },
                None => tx.put(&r.store, value, Some(r.key), WriteMode::Put),
            }
        }))
    }

    fn put_data(&self, tx: &mut Transaction<'_>, store: &str, data: &str, delimiter: char) -> CoreResult<Vec<Key>> {
        tx.check_writable(store)?;
        load::put_data(tx, store, data, delimiter)
    }

    fn remove_by_id(&self, tx: &mut Transaction<'_>, store: &str, key: &Key) -> CoreResult<usize> {
        Ok(usize::from(tx.delete(store, key)?))
    }

    fn remove_by_refs(&self, tx: &mut Transaction<'_>, refs: &[RecordRef]) -> CoreResult<BatchResult<usize>> {
        tx.ensure_active()?;
        let mut out = BatchResult::with_capacity(refs.len());
        for r in refs {
            out.push(tx.delete(&r.store, &r.key).map(usize::from));
        }
        Ok(out)
    }

    fn remove_by_key_range(&self, tx: &mut Transaction<'_>, store: &str, range: &KeyRange) -> CoreResult<usize> {
        tx.check_writable(store)?;
        let keys = tx.store(store)?.keys_in(Some(range));
        Self::remove_keys(tx, store, keys)
    }

    fn clear_by_key_range(&self, tx: &mut Transaction<'_>, store: &str, range: Option<&KeyRange>) -> CoreResult<usize> {
        match range {
            None => tx.clear(store),
            Some(range) => self.remove_by_key_range(tx, store, range),
        }
    }

    fn clear_by_stores(&self, tx: &mut Transaction<'_>, stores: &[&str]) -> CoreResult<()> {
        for store in stores {
            tx.check_writable(store)?;
        }
        for store in stores {
            tx.clear(store)?;
        }
        Ok(())
    }

    fn remove_by_index_key_range(
        &self,
        tx: &mut Transaction<'_>,
        store: &str,
        index: &str,
        range: &KeyRange,
    ) -> CoreResult<usize> {
        tx.check_writable(store)?;
        let primaries: Vec<Key> = collect_positions(tx.source(store, Some(index))?, Some(range), Direction::Next)
            .into_iter()
            .map(|(_, primary)| primary)
            .collect();
        Self::remove_keys(tx, store, primaries)
    }

    fn count(&self, tx: &Transaction<'_>, stores: &[&str]) -> CoreResult<Vec<usize>> {
        stores.iter().map(|s| Ok(tx.store(s)?.len())).collect()
    }

    fn count_key_range(
        &self,
        tx: &Transaction<'_>,
        store: &str,
        range: Option<&KeyRange>,
        index: Option<&str>,
        unique: bool,
    ) -> CoreResult<usize> {
        match index {
            None if unique => Err(CoreError::argument("unique count needs an index")),
            None => Ok(tx.store(store)?.keys_in(range).len()),
            Some(_) => {
                let source = tx.source(store, index)?;
                Ok(collect_positions(source, range, Direction::from_flags(false, unique)).len())
            }
        }
    }

    fn list(
        &self,
        tx: &Transaction<'_>,
        query: &ListQuery,
        position: Option<&mut CursorPosition>,
    ) -> CoreResult<Vec<ListItem>> {
        list::run(tx, query, self.default_list_limit, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connection, ConnectionPool};
    use crate::executor::ListMethod;
    use crate::schema::{DataType, DatabaseSchema, IndexSchema, StoreSchema};
    use crate::types::TransactionMode;

    fn notes_schema() -> DatabaseSchema {
        DatabaseSchema::versioned(
            1,
            vec![
                StoreSchema::with_key_path("notes", "id")
                    .auto_increment(true)
                    .index(IndexSchema::new("by_tag", "tag")),
                StoreSchema::new("kv"),
            ],
        )
    }

    fn note(id: i64, tag: &str) -> Value {
        Value::object([("id", Value::from(id)), ("tag", Value::from(tag))])
    }

    fn seeded(pool: &ConnectionPool) -> Connection {
        let conn = pool.connect("exec", notes_schema()).unwrap();
        let exec = BTreeExecutor::default();
        conn.run(&["notes"], TransactionMode::ReadWrite, |tx| {
            let keys = exec.put(
                tx,
                "notes",
                vec![note(1, "a"), note(2, "a"), note(3, "b"), note(4, "c"), note(5, "a")],
                None,
            )?;
            assert!(!keys.has_error());
            Ok(())
        })
        .unwrap();
        conn
    }

    fn ids(items: &[ListItem]) -> Vec<i64> {
        items
            .iter()
            .map(|i| i.value().and_then(|v| v.get("id")).and_then(Value::as_integer).unwrap())
            .collect()
    }

    #[test]
    fn get_many_keeps_request_order() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::new(2, 100);
        let tx = conn.transaction(&["notes"], TransactionMode::ReadOnly).unwrap();
        let keys: Vec<Key> = [5, 9, 1, 3, 2].into_iter().map(Key::from).collect();
        let got = exec.get_many(&tx, "notes", &keys).unwrap();
        assert_eq!(got.len(), 5);
        let found: Vec<Option<i64>> = got
            .into_result()
            .unwrap()
            .into_iter()
            .map(|v| v.and_then(|v| v.get("id").and_then(Value::as_integer)))
            .collect();
        assert_eq!(found, vec![Some(5), None, Some(1), Some(3), Some(2)]);
    }

    #[test]
    fn add_isolates_duplicates() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let mut tx = conn.transaction(&["notes"], TransactionMode::ReadWrite).unwrap();
        let result = exec
            .add(&mut tx, "notes", vec![note(10, "x"), note(2, "y"), note(11, "z")], None)
            .unwrap();
        assert!(result.has_error());
        assert_eq!(result.errors().map(|(i, _)| i).collect::<Vec<_>>(), vec![1]);
        assert!(matches!(result.get(1), Some(Err(CoreError::Constraint { .. }))));
        tx.commit().unwrap();
        assert_eq!(conn.count("notes").unwrap(), 7);
    }

    #[test]
    fn mismatched_keys_fail_up_front() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let mut tx = conn.transaction(&["kv"], TransactionMode::ReadWrite).unwrap();
        let err = exec
            .put(&mut tx, "kv", vec![Value::from(1), Value::from(2)], Some(vec![Key::from("a")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Argument { .. }));
        assert_eq!(tx.pending_ops(), 0);
    }

    #[test]
    fn remove_by_key_range_is_inclusive() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let removed = conn
            .run(&["notes"], TransactionMode::ReadWrite, |tx| {
                exec.remove_by_key_range(tx, "notes", &KeyRange::bound(2, 3, false, false)?)
            })
            .unwrap();
        assert_eq!(removed, 2);
        assert!(conn.get("notes", 1).unwrap().is_some());
        assert!(conn.get("notes", 2).unwrap().is_none());
    }

    #[test]
    fn remove_by_refs_spans_stores() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        conn.put_with_key("kv", Value::from("v"), "k").unwrap();
        let exec = BTreeExecutor::default();
        let result = conn
            .run(&["notes", "kv"], TransactionMode::ReadWrite, |tx| {
                exec.remove_by_refs(
                    tx,
                    &[
                        RecordRef::new("notes", 1),
                        RecordRef::new("kv", "k"),
                        RecordRef::new("kv", "gone"),
                        RecordRef::new("missing", 1),
                    ],
                )
            })
            .unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.has_error());
        assert_eq!(result.total(), 2);
        assert_eq!(conn.count("kv").unwrap(), 0);
    }

    #[test]
    fn remove_by_index_key_range() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let removed = conn
            .run(&["notes"], TransactionMode::ReadWrite, |tx| {
                exec.remove_by_index_key_range(tx, "notes", "by_tag", &KeyRange::only("a"))
            })
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(conn.count("notes").unwrap(), 2);
    }

    #[test]
    fn counts() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let tx = conn.transaction(&["notes", "kv"], TransactionMode::ReadOnly).unwrap();
        assert_eq!(exec.count(&tx, &["notes", "kv"]).unwrap(), vec![5, 0]);
        assert_eq!(
            exec.count_key_range(&tx, "notes", Some(&KeyRange::lower_bound(3, false)), None, false)
                .unwrap(),
            3
        );
        assert_eq!(exec.count_key_range(&tx, "notes", None, Some("by_tag"), false).unwrap(), 5);
        assert_eq!(exec.count_key_range(&tx, "notes", None, Some("by_tag"), true).unwrap(), 3);
        assert!(matches!(
            exec.count_key_range(&tx, "notes", None, None, true),
            Err(CoreError::Argument { .. })
        ));
        assert!(matches!(exec.count(&tx, &["nope"]), Err(CoreError::Argument { .. })));
    }

    #[test]
    fn clear_by_stores_checks_every_store_first() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let mut tx = conn.transaction(&["notes"], TransactionMode::ReadWrite).unwrap();
        assert!(exec.clear_by_stores(&mut tx, &["notes", "kv"]).is_err());
        assert_eq!(tx.pending_ops(), 0);
        exec.clear_by_stores(&mut tx, &["notes"]).unwrap();
        tx.commit().unwrap();
        assert_eq!(conn.count("notes").unwrap(), 0);
    }

    #[test]
    fn list_index_values_ties_by_primary_key() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let tx = conn.transaction(&["notes"], TransactionMode::ReadOnly).unwrap();
        let query = ListQuery::new("notes", ListMethod::Values)
            .index("by_tag")
            .range(KeyRange::only("a"));
        assert_eq!(ids(&exec.list(&tx, &query, None).unwrap()), vec![1, 2, 5]);

        let reversed = query.clone().reverse();
        assert_eq!(ids(&exec.list(&tx, &reversed, None).unwrap()), vec![5, 2, 1]);

        let unique = ListQuery::new("notes", ListMethod::Keys).index("by_tag").unique();
        let keys: Vec<Key> = exec
            .list(&tx, &unique, None)
            .unwrap()
            .into_iter()
            .filter_map(|i| i.key().cloned())
            .collect();
        assert_eq!(keys, vec![Key::from("a"), Key::from("b"), Key::from("c")]);
    }

    #[test]
    fn list_resumes_across_duplicate_keys() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let tx = conn.transaction(&["notes"], TransactionMode::ReadOnly).unwrap();
        let query = ListQuery::new("notes", ListMethod::Values).index("by_tag").limit(2);
        let mut position = CursorPosition::new();
        let mut seen = Vec::new();
        loop {
            let page = exec.list(&tx, &query, Some(&mut position)).unwrap();
            if page.is_empty() {
                break;
            }
            seen.extend(ids(&page));
        }
        assert_eq!(seen, vec![1, 2, 5, 3, 4]);
        assert!(position.is_exhausted());
    }

    #[test]
    fn list_offset_and_limit() {
        let pool = ConnectionPool::in_memory();
        let conn = seeded(&pool);
        let exec = BTreeExecutor::default();
        let tx = conn.transaction(&["notes"], TransactionMode::ReadOnly).unwrap();
        let query = ListQuery::new("notes", ListMethod::PrimaryKeys).offset(1).limit(2);
        let keys: Vec<Key> = exec
            .list(&tx, &query, None)
            .unwrap()
            .into_iter()
            .filter_map(|i| i.primary_key().cloned())
            .collect();
        assert_eq!(keys, vec![Key::from(2), Key::from(3)]);

        let zero = ListQuery::new("notes", ListMethod::Keys).limit(0);
        assert!(matches!(exec.list(&tx, &zero, None), Err(CoreError::Argument { .. })));
    }

    #[test]
    fn put_data_coerces_declared_types() {
        let pool = ConnectionPool::in_memory();
        let schema = DatabaseSchema::versioned(
            1,
            vec![StoreSchema::with_key_path("items", "id")
                .key_type(DataType::Integer)
                .index(IndexSchema::new("price", "price").data_type(DataType::Numeric))
                .index(IndexSchema::new("name", "name").data_type(DataType::Text))],
        );
        let conn = pool.connect("load", schema).unwrap();
        let exec = BTreeExecutor::default();
        let csv = "id,name,price,note\n1,\"apple\",1.5,raw\n2,pear,2,\"kept\"\n";
        let keys = conn
            .run(&["items"], TransactionMode::ReadWrite, |tx| exec.put_data(tx, "items", csv, ','))
            .unwrap();
        assert_eq!(keys, vec![Key::from(1), Key::from(2)]);
        let first = conn.get("items", 1).unwrap().unwrap();
        assert_eq!(first.get("name"), Some(&Value::from("apple")));
        assert_eq!(first.get("price"), Some(&Value::Float(1.5)));
        let second = conn.get("items", 2).unwrap().unwrap();
        assert_eq!(second.get("note"), Some(&Value::from("\"kept\"")));
    }

    #[test]
    fn put_data_stops_at_first_bad_line() {
        let pool = ConnectionPool::in_memory();
        let schema = DatabaseSchema::versioned(
            1,
            vec![StoreSchema::with_key_path("items", "id").key_type(DataType::Integer)],
        );
        let conn = pool.connect("load", schema).unwrap();
        let exec = BTreeExecutor::default();
        let mut tx = conn.transaction(&["items"], TransactionMode::ReadWrite).unwrap();
        let err = exec.put_data(&mut tx, "items", "id\n1\nx\n3", ',').unwrap_err();
        assert!(matches!(err, CoreError::Data { .. }));
        assert_eq!(tx.pending_ops(), 1);
    }
}
