//! Connection handles.

use super::connect::{ConnectReport, Connector};
use super::listener::{ConnectionListener, VersionChangeEvent, VersionChangeResponse};
use super::pool::SharedDatabase;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::executor::{
    BTreeExecutor, BatchResult, CursorPosition, ListItem, ListMethod, ListQuery, RequestExecutor,
};
use crate::key_range::KeyRange;
use crate::schema::{DatabaseSchema, StoreSchema};
use crate::scan::Operator;
use crate::transaction::Transaction;
use crate::types::{ConnectionId, TransactionMode};
use parking_lot::RwLock;
use shelfdb_codec::{Key, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// The part of a connection the database keeps to notify it.
pub(crate) struct ConnectionCore {
    id: ConnectionId,
    open: AtomicBool,
    listener: RwLock<Option<Arc<dyn ConnectionListener>>>,
}

impl ConnectionCore {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            open: AtomicBool::new(true),
            listener: RwLock::new(None),
        }
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Returns whether this call closed it.
    pub(crate) fn close(&self) -> bool {
        self.open.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn listener(&self) -> Option<Arc<dyn ConnectionListener>> {
        self.listener.read().clone()
    }

    pub(crate) fn version_change(&self, event: &VersionChangeEvent) -> VersionChangeResponse {
        match self.listener() {
            Some(listener) => listener.on_version_change(event),
            None => VersionChangeResponse::default(),
        }
    }
}

/// An open connection to one database.
///
/// Every CRUD method runs in its own transaction. Use
/// [`transaction`](Self::transaction) or [`run`](Self::run) to group
/// requests, and [`executor`](Self::executor) for the batch requests.
///
/// Dropping a connection closes it.
pub struct Connection {
    core: Arc<ConnectionCore>,
    shared: Arc<SharedDatabase>,
    config: Config,
    declared: DatabaseSchema,
    report: ConnectReport,
    executor: BTreeExecutor,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.core.id())
            .field("database", &self.shared.name())
            .field("open", &self.core.is_open())
            .field("version", &self.report.version)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub(crate) fn new(
        core: Arc<ConnectionCore>,
        shared: Arc<SharedDatabase>,
        config: Config,
        declared: DatabaseSchema,
        report: ConnectReport,
    ) -> Self {
        let executor = BTreeExecutor::from_config(&config);
        Self {
            core,
            shared,
            config,
            declared,
            report,
            executor,
        }
    }

    /// Connection id, unique within its pool.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.core.id()
    }

    /// Database name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Current version of the database.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.shared.state.read().version()
    }

    /// What connecting did.
    #[must_use]
    pub fn report(&self) -> &ConnectReport {
        &self.report
    }

    /// Names of the stores in the database, sorted.
    #[must_use]
    pub fn store_names(&self) -> Vec<String> {
        self.shared.state.read().stores().map(|s| s.name().to_string()).collect()
    }

    /// The live schema at the current version.
    #[must_use]
    pub fn schema(&self) -> DatabaseSchema {
        self.shared.state.read().schema()
    }

    /// Adds `store` to the database, or updates the live store of that
    /// name, by upgrading to the next version.
    ///
    /// Other connections get a version change request as for any upgrade.
    /// This connection stays open. A store that already matches is left
    /// alone and the report lists no changes.
    ///
    /// # Errors
    ///
    /// - `Constraint` unless the connection was opened with an editable
    ///   schema.
    /// - `Argument` if the store definition is invalid.
    /// - `Blocked` or `Timeout` as for an upgrading connect.
    pub fn add_store_schema(&self, store: StoreSchema) -> CoreResult<ConnectReport> {
        self.ensure_open()?;
        if !self.declared.is_editable() {
            return Err(CoreError::constraint(
                store.name(),
                "cannot add store, the schema is not editable",
            ));
        }
        let live = self.schema();
        let mut target = DatabaseSchema::auto(live.stores().to_vec()).editable();
        let stores = target.stores_mut();
        match stores.iter_mut().find(|s| s.name() == store.name()) {
            Some(existing) => *existing = store,
            None => stores.push(store),
        }
        target.validate()?;

        let report = Connector::new(&target, &self.shared, &self.config)
            .requested_by(self.core.id())
            .run()?;
        if !report.changes.is_empty() {
            info!(
                database = %self.shared.name(),
                version = report.version,
                changes = report.changes.len(),
                "added store schema"
            );
        }
        Ok(report)
    }

    /// Creates an out-of-line store on first write, for editable schemas.
    fn ensure_store(&self, store: &str) -> CoreResult<()> {
        if !self.declared.is_editable() || self.shared.state.read().store(store).is_some() {
            return Ok(());
        }
        debug!(database = %self.shared.name(), store, "creating store on first write");
        self.add_store_schema(StoreSchema::new(store)).map(|_| ())
    }

    /// Checks if the connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    /// Closes the connection. Later calls fail with `DatabaseClosed`.
    pub fn close(&self) {
        if self.core.close() {
            self.shared.detach(self.core.id());
            debug!(database = %self.shared.name(), connection = %self.core.id(), "closed connection");
        }
    }

    /// Installs lifecycle hooks, replacing any previous ones.
    pub fn set_listener(&self, listener: Arc<dyn ConnectionListener>) {
        *self.core.listener.write() = Some(listener);
    }

    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if self.core.is_open() {
            Ok(())
        } else {
            Err(CoreError::DatabaseClosed {
                name: self.shared.name().to_string(),
            })
        }
    }

    pub(crate) fn shared(&self) -> &SharedDatabase {
        &self.shared
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn listener(&self) -> Option<Arc<dyn ConnectionListener>> {
        self.core.listener()
    }

    /// Begins a transaction over `stores`.
    ///
    /// # Errors
    ///
    /// - `DatabaseClosed` if the connection is closed.
    /// - `Argument` for an empty scope or an unknown store.
    /// - `Timeout` when a read-write transaction cannot get the writer slot
    ///   within the lock timeout.
    pub fn transaction(&self, stores: &[&str], mode: TransactionMode) -> CoreResult<Transaction<'_>> {
        Transaction::begin(self, stores, mode)
    }

    /// Executes a function within a transaction.
    ///
    /// If the function returns `Ok`, the transaction is committed unless
    /// the function already ended it. If it returns `Err`, the transaction
    /// is aborted.
    pub fn run<F, T>(&self, stores: &[&str], mode: TransactionMode, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut tx = self.transaction(stores, mode)?;
        match f(&mut tx) {
            Ok(value) => {
                if tx.is_active() {
                    tx.commit()?;
                }
                Ok(value)
            }
            Err(err) => {
                tx.finish_aborted(&err.to_string());
                Err(err)
            }
        }
    }

    /// The request executor used by this connection.
    #[must_use]
    pub fn executor(&self) -> &BTreeExecutor {
        &self.executor
    }

    /// Scans and joins over this connection.
    #[must_use]
    pub fn operator(&self) -> Operator<'_> {
        Operator::new(self)
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Gets a record by primary key.
    pub fn get(&self, store: &str, key: impl Into<Key>) -> CoreResult<Option<Value>> {
        let key = key.into();
        self.run(&[store], TransactionMode::ReadOnly, |tx| self.executor.get(tx, store, &key))
    }

    /// Gets several records, one slot per key.
    pub fn get_all(&self, store: &str, keys: &[Key]) -> CoreResult<BatchResult<Option<Value>>> {
        self.run(&[store], TransactionMode::ReadOnly, |tx| {
            self.executor.get_many(tx, store, keys)
        })
    }

    /// Inserts or replaces a record with an in-line or generated key.
    ///
    /// On an editable schema an unknown store is first created as an
    /// out-of-line store, as for every write below.
    pub fn put(&self, store: &str, value: Value) -> CoreResult<Key> {
        self.write_one(store, value, None, false)
    }

    /// Inserts or replaces a record under an explicit key.
    pub fn put_with_key(&self, store: &str, value: Value, key: impl Into<Key>) -> CoreResult<Key> {
        self.write_one(store, value, Some(key.into()), false)
    }

    /// Inserts or replaces several records in one transaction.
    pub fn put_all(&self, store: &str, values: Vec<Value>) -> CoreResult<BatchResult<Key>> {
        self.ensure_store(store)?;
        self.run(&[store], TransactionMode::ReadWrite, |tx| {
            self.executor.put(tx, store, values, None)
        })
    }

    /// Inserts a record, failing with `Constraint` if its key exists.
    pub fn add(&self, store: &str, value: Value) -> CoreResult<Key> {
        self.write_one(store, value, None, true)
    }

    /// Inserts several records. Duplicates fail their own slot only.
    pub fn insert(&self, store: &str, values: Vec<Value>) -> CoreResult<BatchResult<Key>> {
        self.ensure_store(store)?;
        self.run(&[store], TransactionMode::ReadWrite, |tx| {
            self.executor.add(tx, store, values, None)
        })
    }

    fn write_one(&self, store: &str, value: Value, key: Option<Key>, add_only: bool) -> CoreResult<Key> {
        self.ensure_store(store)?;
        let keys = key.map(|k| vec![k]);
        self.run(&[store], TransactionMode::ReadWrite, |tx| {
            let batch = if add_only {
                self.executor.add(tx, store, vec![value], keys)?
            } else {
                self.executor.put(tx, store, vec![value], keys)?
            };
            let key = batch
                .into_items()
                .pop()
                .unwrap_or_else(|| Err(CoreError::invalid_operation("write produced no result")))?;
            Ok(key)
        })
    }

    /// Deletes a record. Returns 1 if it existed, else 0.
    pub fn remove(&self, store: &str, key: impl Into<Key>) -> CoreResult<usize> {
        let key = key.into();
        self.run(&[store], TransactionMode::ReadWrite, |tx| {
            self.executor.remove_by_id(tx, store, &key)
        })
    }

    /// Removes every record of a store. Returns how many there were.
    pub fn clear(&self, store: &str) -> CoreResult<usize> {
        self.run(&[store], TransactionMode::ReadWrite, |tx| {
            self.executor.clear_by_key_range(tx, store, None)
        })
    }

    /// Number of records in a store.
    pub fn count(&self, store: &str) -> CoreResult<usize> {
        self.run(&[store], TransactionMode::ReadOnly, |tx| {
            Ok(self.executor.count(tx, &[store])?.into_iter().sum())
        })
    }

    /// Every record whose key in `index` equals `value`, by primary key.
    pub fn where_equal(&self, store: &str, index: &str, value: impl Into<Key>) -> CoreResult<Vec<Value>> {
        let query = ListQuery::new(store, ListMethod::Values)
            .index(index)
            .range(KeyRange::only(value))
            .limit(usize::MAX);
        Ok(self
            .list(&query)?
            .into_iter()
            .filter_map(ListItem::into_value)
            .collect())
    }

    /// Runs a range query in its own transaction.
    pub fn list(&self, query: &ListQuery) -> CoreResult<Vec<ListItem>> {
        self.run(&[query.store_name()], TransactionMode::ReadOnly, |tx| {
            self.executor.list(tx, query, None)
        })
    }

    /// Runs a range query from `position` and moves the position forward.
    pub fn list_from(&self, query: &ListQuery, position: &mut CursorPosition) -> CoreResult<Vec<ListItem>> {
        self.run(&[query.store_name()], TransactionMode::ReadOnly, |tx| {
            self.executor.list(tx, query, Some(position))
        })
    }

    /// Bulk loads delimited text into a store.
    pub fn load(&self, store: &str, data: &str, delimiter: char) -> CoreResult<Vec<Key>> {
        self.run(&[store], TransactionMode::ReadWrite, |tx| {
            self.executor.put_data(tx, store, data, delimiter)
        })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
