//! Process-wide registry of loaded databases.

use super::connect::{ConnectReport, Connector};
use super::handle::{Connection, ConnectionCore};
use super::listener::{VersionChangeEvent, VersionChangeResponse};
use crate::config::Config;
use crate::dir::{validate_name, StorageDir};
use crate::engine::DatabaseState;
use crate::error::{CoreError, CoreResult};
use crate::journal::{replay, snapshot, FrameScan, Journal, JournalRecord};
use crate::schema::DatabaseSchema;
use crate::types::{ConnectionId, TransactionId};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use shelfdb_storage::FileBackend;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info};

/// State shared by every connection to one database.
///
/// Lock order: `version_lock`, then `write_lock`, then `state`, then
/// `journal`.
pub(crate) struct SharedDatabase {
    name: String,
    /// Committed content.
    pub(crate) state: RwLock<DatabaseState>,
    /// Held shared by transactions, exclusively by upgrades.
    pub(crate) version_lock: RwLock<()>,
    /// The single writer slot.
    pub(crate) write_lock: Mutex<()>,
    journal: Mutex<Option<Journal>>,
    connections: Mutex<Vec<Weak<ConnectionCore>>>,
    next_txid: AtomicU64,
}

impl SharedDatabase {
    fn new(name: &str, state: DatabaseState, journal: Option<Journal>, last_txid: u64) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(state),
            version_lock: RwLock::new(()),
            write_lock: Mutex::new(()),
            journal: Mutex::new(journal),
            connections: Mutex::new(Vec::new()),
            next_txid: AtomicU64::new(last_txid + 1),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn next_txid(&self) -> TransactionId {
        TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst))
    }

    fn last_txid(&self) -> u64 {
        self.next_txid.load(Ordering::SeqCst).saturating_sub(1)
    }

    /// Appends to the journal. In-memory databases have none.
    pub(crate) fn append(&self, record: &JournalRecord) -> CoreResult<()> {
        if let Some(journal) = self.journal.lock().as_mut() {
            journal.append(record)?;
        }
        Ok(())
    }

    pub(crate) fn attach(&self, core: &Arc<ConnectionCore>) {
        let mut connections = self.connections.lock();
        connections.retain(|c| c.upgrade().is_some_and(|c| c.is_open()));
        connections.push(Arc::downgrade(core));
    }

    pub(crate) fn detach(&self, id: ConnectionId) {
        self.connections
            .lock()
            .retain(|c| c.upgrade().is_some_and(|c| c.id() != id && c.is_open()));
    }

    fn open_connections(&self) -> Vec<Arc<ConnectionCore>> {
        self.connections
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|c| c.is_open())
            .collect()
    }

    /// Asks every open connection except `requester` to close for a
    /// version change.
    ///
    /// Listeners run without any database lock held, so they may close
    /// their connection from inside the hook.
    pub(crate) fn request_version_change(
        &self,
        new_version: Option<u32>,
        requester: Option<ConnectionId>,
    ) -> CoreResult<()> {
        let current = self.state.read().version();
        let event = VersionChangeEvent {
            database: self.name.clone(),
            old_version: current,
            new_version,
        };
        for core in self.open_connections() {
            if Some(core.id()) == requester {
                continue;
            }
            match core.version_change(&event) {
                VersionChangeResponse::Close => {
                    debug!(database = %self.name, connection = %core.id(), "closing for version change");
                    core.close();
                    self.detach(core.id());
                }
                VersionChangeResponse::Keep => {
                    return Err(CoreError::Blocked {
                        name: self.name.clone(),
                        requested: new_version.unwrap_or(0),
                        current,
                    });
                }
            }
        }
        Ok(())
    }

    /// Waits for in-flight transactions to finish and locks out new ones.
    pub(crate) fn lock_exclusive(
        &self,
        timeout: Option<Duration>,
        operation: &str,
    ) -> CoreResult<RwLockWriteGuard<'_, ()>> {
        match timeout {
            None => Ok(self.version_lock.write()),
            Some(limit) => self.version_lock.try_write_for(limit).ok_or_else(|| CoreError::Timeout {
                operation: format!("{operation} '{}'", self.name),
                millis: limit.as_millis(),
            }),
        }
    }

    fn compact(&self, lock_timeout: Duration) -> CoreResult<()> {
        let _writer = self.write_lock.try_lock_for(lock_timeout).ok_or_else(|| CoreError::Timeout {
            operation: format!("compact '{}'", self.name),
            millis: lock_timeout.as_millis(),
        })?;
        let records = snapshot(&self.state.read(), self.last_txid());
        if let Some(journal) = self.journal.lock().as_mut() {
            let before = journal.size()?;
            journal.rewrite(&records)?;
            info!(database = %self.name, before, after = journal.size()?, "compacted journal");
        }
        Ok(())
    }
}

/// Opens and tracks named databases.
///
/// A pool owns one in-memory copy of each database it has loaded. With a
/// storage directory every database is also persisted as a journal file,
/// and the directory is locked against other processes.
///
/// # Example
///
/// ```rust
/// use shelfdb_core::{ConnectionPool, DatabaseSchema, StoreSchema};
/// use shelfdb_codec::{Key, Value};
///
/// let pool = ConnectionPool::in_memory();
/// let schema = DatabaseSchema::versioned(1, vec![StoreSchema::with_key_path("notes", "id")]);
/// let conn = pool.connect("app", schema).unwrap();
/// conn.put("notes", Value::object([("id", Value::from(1))])).unwrap();
/// assert!(conn.get("notes", 1).unwrap().is_some());
/// ```
pub struct ConnectionPool {
    config: Config,
    dir: Option<StorageDir>,
    databases: Mutex<HashMap<String, Arc<SharedDatabase>>>,
    next_connection: AtomicU64,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.config)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl ConnectionPool {
    /// Creates a pool. Locks `config.storage_dir` when one is set.
    ///
    /// # Errors
    ///
    /// Returns `Argument` for an invalid configuration and `DatabaseLocked`
    /// when another process uses the storage directory.
    pub fn open(config: Config) -> CoreResult<Self> {
        config.validate()?;
        let dir = match &config.storage_dir {
            Some(path) => Some(StorageDir::open(path)?),
            None => None,
        };
        Ok(Self {
            config,
            dir,
            databases: Mutex::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
        })
    }

    /// A pool keeping every database in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            config: Config::default(),
            dir: None,
            databases: Mutex::new(HashMap::new()),
            next_connection: AtomicU64::new(1),
        }
    }

    /// The pool configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The storage directory, for persistent pools.
    #[must_use]
    pub fn storage_path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StorageDir::path)
    }

    /// Opens `name` and reconciles it with `schema`.
    ///
    /// # Errors
    ///
    /// - `Argument` for an invalid name or schema.
    /// - `VersionTooLow` when the database is newer than the schema.
    /// - `Blocked` when an open connection refuses to close for an upgrade.
    /// - `Timeout` when in-flight transactions outlast `connect_timeout`.
    /// - `SchemaConflict` when the structure cannot be reconciled.
    pub fn connect(&self, name: &str, schema: DatabaseSchema) -> CoreResult<Connection> {
        validate_name(name)?;
        schema.validate()?;
        let shared = self.load(name)?;
        let report: ConnectReport = Connector::new(&schema, &shared, &self.config).run()?;

        let id = ConnectionId(self.next_connection.fetch_add(1, Ordering::SeqCst));
        let core = Arc::new(ConnectionCore::new(id));
        shared.attach(&core);
        debug!(database = name, connection = %id, version = report.version, "connected");
        Ok(Connection::new(core, shared, self.config.clone(), schema, report))
    }

    /// Deletes a database and its journal. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `Blocked` when an open connection refuses to close.
    pub fn delete_database(&self, name: &str) -> CoreResult<bool> {
        validate_name(name)?;
        let loaded = self.databases.lock().get(name).cloned();
        let mut existed = false;
        if let Some(shared) = loaded {
            shared.request_version_change(None, None)?;
            let _exclusive = shared.lock_exclusive(self.config.connect_timeout, "delete")?;
            *shared.journal.lock() = None;
            {
                let mut databases = self.databases.lock();
                if databases.get(name).is_some_and(|d| Arc::ptr_eq(d, &shared)) {
                    databases.remove(name);
                }
            }
            // connections that attached while listeners ran
            for core in shared.open_connections() {
                core.close();
            }
            existed = true;
        }
        if let Some(dir) = &self.dir {
            existed |= dir.remove_journal(name)?;
        }
        if existed {
            info!(database = name, "deleted database");
        }
        Ok(existed)
    }

    /// Names of every database this pool can open, sorted.
    pub fn database_names(&self) -> CoreResult<Vec<String>> {
        let mut names: Vec<String> = self.databases.lock().keys().cloned().collect();
        if let Some(dir) = &self.dir {
            names.extend(dir.database_names()?);
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Closes every connection and unloads every database.
    pub fn close_all(&self) {
        let mut databases = self.databases.lock();
        for shared in databases.values() {
            for core in shared.open_connections() {
                core.close();
            }
        }
        databases.clear();
        debug!("closed all databases");
    }

    /// Rewrites the journal of `name` as a single snapshot.
    pub fn compact(&self, name: &str) -> CoreResult<()> {
        validate_name(name)?;
        self.load(name)?.compact(self.config.lock_timeout)
    }

    /// Reads every frame of the journal of `name` without loading it.
    ///
    /// # Errors
    ///
    /// Returns `Argument` for in-memory pools or unknown databases and
    /// `JournalCorrupted` when a frame fails validation.
    pub fn verify(&self, name: &str) -> CoreResult<FrameScan> {
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| CoreError::argument("verify needs a storage directory"))?;
        let path = dir.journal_path(name)?;
        if !path.exists() {
            return Err(CoreError::argument(format!("database '{name}' does not exist")));
        }
        let journal = Journal::new(Box::new(FileBackend::open(&path)?), false);
        journal.read_frames()
    }

    fn load(&self, name: &str) -> CoreResult<Arc<SharedDatabase>> {
        let mut databases = self.databases.lock();
        if let Some(shared) = databases.get(name) {
            return Ok(Arc::clone(shared));
        }

        let shared = match &self.dir {
            None => SharedDatabase::new(name, DatabaseState::default(), None, 0),
            Some(dir) => {
                let backend = FileBackend::open(&dir.journal_path(name)?)?;
                let mut journal = Journal::new(Box::new(backend), self.config.sync_on_commit);
                let records = journal.recover()?;
                let (state, last_txid) = replay(&records)?;
                debug!(
                    database = name,
                    records = records.len(),
                    version = state.version(),
                    "replayed journal"
                );
                SharedDatabase::new(name, state, Some(journal), last_txid)
            }
        };
        let shared = Arc::new(shared);
        databases.insert(name.to_string(), Arc::clone(&shared));
        Ok(shared)
    }
}
