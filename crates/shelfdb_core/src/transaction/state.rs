//! Transaction state.

use crate::connection::Connection;
use crate::engine::{DatabaseState, ObjectStore, Source, WriteMode};
use crate::error::{CoreError, CoreResult};
use crate::journal::{JournalOp, JournalRecord};
use crate::types::{TransactionId, TransactionMode};
use parking_lot::{MutexGuard, RwLockReadGuard};
use shelfdb_codec::{Key, Value};
use tracing::trace;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// A unit of work over a fixed set of stores.
///
/// A transaction reads from its own snapshot of the database taken when it
/// began, and its writes stay private until [`commit`](Self::commit). Only
/// one read-write transaction runs per database at a time; it holds the
/// writer slot from begin until it ends. Dropping an active transaction
/// aborts it.
pub struct Transaction<'c> {
    id: TransactionId,
    mode: TransactionMode,
    scope: Vec<String>,
    state: TransactionState,
    data: DatabaseState,
    ops: Vec<JournalOp>,
    conn: &'c Connection,
    _writer: Option<MutexGuard<'c, ()>>,
    _version: RwLockReadGuard<'c, ()>,
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("scope", &self.scope)
            .field("state", &self.state)
            .field("pending_ops", &self.ops.len())
            .finish_non_exhaustive()
    }
}

impl<'c> Transaction<'c> {
    pub(crate) fn begin(conn: &'c Connection, stores: &[&str], mode: TransactionMode) -> CoreResult<Self> {
        conn.ensure_open()?;
        if stores.is_empty() {
            return Err(CoreError::argument("a transaction needs at least one store"));
        }
        let shared = conn.shared();
        let version = shared.version_lock.read_recursive();
        let writer = match mode {
            TransactionMode::ReadOnly => None,
            TransactionMode::ReadWrite => {
                let limit = conn.config().lock_timeout;
                Some(shared.write_lock.try_lock_for(limit).ok_or_else(|| CoreError::Timeout {
                    operation: format!("acquire the writer slot of '{}'", shared.name()),
                    millis: limit.as_millis(),
                })?)
            }
        };
        let data = shared.state.read().clone();

        let mut scope: Vec<String> = Vec::with_capacity(stores.len());
        for name in stores {
            if !data.has_store(name) {
                return Err(CoreError::unknown_store(name));
            }
            if !scope.iter().any(|s| s == name) {
                scope.push((*name).to_string());
            }
        }

        let id = shared.next_txid();
        trace!(txid = %id, %mode, ?scope, "begin transaction");
        Ok(Self {
            id,
            mode,
            scope,
            state: TransactionState::Active,
            data,
            ops: Vec::new(),
            conn,
            _writer: writer,
            _version: version,
        })
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the access mode.
    #[must_use]
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Stores this transaction may touch.
    #[must_use]
    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Number of writes waiting for commit.
    #[must_use]
    pub fn pending_ops(&self) -> usize {
        self.ops.len()
    }

    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::TransactionInactive {
                txid: self.id.as_u64(),
            })
        }
    }

    fn check_scope(&self, store: &str) -> CoreResult<()> {
        self.ensure_active()?;
        self.conn.ensure_open()?;
        if self.scope.iter().any(|s| s == store) {
            Ok(())
        } else {
            Err(CoreError::unknown_store(store))
        }
    }

    /// Read access to a store in scope.
    pub(crate) fn store(&self, name: &str) -> CoreResult<&ObjectStore> {
        self.check_scope(name)?;
        self.data.store(name).ok_or_else(|| CoreError::unknown_store(name))
    }

    /// What a cursor over `store`, or over one of its indexes, walks.
    pub(crate) fn source(&self, store: &str, index: Option<&str>) -> CoreResult<Source<'_>> {
        let target = self.store(store)?;
        match index {
            None => Ok(Source::Store(target)),
            Some(name) => Ok(Source::Index(target.index(name)?)),
        }
    }

    /// Fails unless `store` is in scope and writable.
    pub(crate) fn check_writable(&self, store: &str) -> CoreResult<()> {
        self.check_scope(store)?;
        if self.mode == TransactionMode::ReadOnly {
            return Err(CoreError::ReadOnly {
                store: store.to_string(),
            });
        }
        Ok(())
    }

    fn store_mut(&mut self, name: &str) -> CoreResult<&mut ObjectStore> {
        self.check_writable(name)?;
        self.data.store_mut(name).ok_or_else(|| CoreError::unknown_store(name))
    }

    /// Writes one record, returning its primary key.
    pub(crate) fn put(&mut self, store: &str, value: Value, key: Option<Key>, mode: WriteMode) -> CoreResult<Key> {
        let target = self.store_mut(store)?;
        let key = target.put(value, key, mode)?;
        let stored = target.get(&key).cloned().unwrap_or(Value::Null);
        self.ops.push(JournalOp::Put {
            store: store.to_string(),
            key: key.clone(),
            value: stored,
        });
        Ok(key)
    }

    /// Deletes one record. Returns whether it existed.
    pub(crate) fn delete(&mut self, store: &str, key: &Key) -> CoreResult<bool> {
        let existed = self.store_mut(store)?.delete(key);
        if existed {
            self.ops.push(JournalOp::Delete {
                store: store.to_string(),
                key: key.clone(),
            });
        }
        Ok(existed)
    }

    /// Removes every record of a store. Returns how many there were.
    pub(crate) fn clear(&mut self, store: &str) -> CoreResult<usize> {
        let target = self.store_mut(store)?;
        let removed = target.len();
        target.clear();
        self.ops.push(JournalOp::Clear {
            store: store.to_string(),
        });
        Ok(removed)
    }

    /// Makes every write durable and visible to later transactions.
    ///
    /// # Errors
    ///
    /// Returns `TransactionInactive` if the transaction already ended, and
    /// `DatabaseClosed` if the connection closed meanwhile. When writing
    /// the journal fails the transaction aborts, the connection listener's
    /// `on_error` hook fires and the error is returned.
    pub fn commit(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        if let Err(err) = self.conn.ensure_open() {
            self.finish_aborted("connection closed before commit");
            return Err(err);
        }
        if self.ops.is_empty() {
            self.state = TransactionState::Committed;
            trace!(txid = %self.id, "commit without writes");
            return Ok(());
        }

        let record = JournalRecord::Commit {
            txid: self.id,
            ops: std::mem::take(&mut self.ops),
        };
        let shared = self.conn.shared();
        if let Err(err) = shared.append(&record) {
            self.state = TransactionState::Aborted;
            if let Some(listener) = self.conn.listener() {
                listener.on_error(self.id, &err);
            }
            return Err(err);
        }
        *shared.state.write() = std::mem::take(&mut self.data);
        self.state = TransactionState::Committed;
        if let JournalRecord::Commit { ops, .. } = &record {
            trace!(txid = %self.id, ops = ops.len(), "committed");
        }
        Ok(())
    }

    /// Discards every write.
    ///
    /// # Errors
    ///
    /// Returns `TransactionInactive` if the transaction already ended.
    pub fn abort(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        self.finish_aborted("aborted by caller");
        Ok(())
    }

    pub(crate) fn finish_aborted(&mut self, reason: &str) {
        if !self.is_active() {
            return;
        }
        self.state = TransactionState::Aborted;
        self.ops.clear();
        trace!(txid = %self.id, reason, "aborted");
        if let Some(listener) = self.conn.listener() {
            listener.on_abort(self.id, reason);
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.is_active() {
            if self.ops.is_empty() {
                self.state = TransactionState::Aborted;
            } else {
                self.finish_aborted("dropped before commit");
            }
        }
    }
}
