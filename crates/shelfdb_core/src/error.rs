//! Error types for shelfdb core.

use crate::schema::SchemaDifference;
use shelfdb_codec::Key;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by connections, transactions, requests and cursors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] shelfdb_storage::StorageError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] shelfdb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Caller passed an unknown store or index, or malformed arguments.
    #[error("invalid argument: {message}")]
    Argument {
        /// What was wrong with the arguments.
        message: String,
    },

    /// Uniqueness or add-only violation.
    #[error("constraint violated in store '{store}': {message}")]
    Constraint {
        /// Store the write targeted.
        store: String,
        /// Which constraint failed.
        message: String,
    },

    /// A record has no valid key, or a key was supplied where none is allowed.
    #[error("data error in store '{store}': {message}")]
    Data {
        /// Store the write targeted.
        store: String,
        /// Description of the problem.
        message: String,
    },

    /// Another connection refused to close for a version change.
    #[error("connect to '{name}' blocked: version {requested} waits on open connections at version {current}")]
    Blocked {
        /// Database name.
        name: String,
        /// Version the caller asked for.
        requested: u32,
        /// Version the open connections use.
        current: u32,
    },

    /// An operation did not settle in time.
    #[error("timed out after {millis} ms waiting to {operation}")]
    Timeout {
        /// What was being waited for.
        operation: String,
        /// The configured limit.
        millis: u128,
    },

    /// The declared schema cannot be reconciled with the live database.
    #[error("schema conflict on '{name}' at version {version}: {}", describe(.differences))]
    SchemaConflict {
        /// Database name.
        name: String,
        /// Version both sides claim.
        version: u32,
        /// What differs.
        differences: Vec<SchemaDifference>,
    },

    /// The requested version is older than the live database.
    #[error("database '{name}' is at version {current}, cannot open at {requested}")]
    VersionTooLow {
        /// Database name.
        name: String,
        /// Version the caller asked for.
        requested: u32,
        /// Live version.
        current: u32,
    },

    /// An action inconsistent with the current state, such as moving an
    /// exhausted cursor.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// The transaction already committed or aborted.
    #[error("transaction {txid} is no longer active")]
    TransactionInactive {
        /// Transaction id.
        txid: u64,
    },

    /// A write was issued inside a read-only transaction.
    #[error("store '{store}' is read-only in this transaction")]
    ReadOnly {
        /// Store the write targeted.
        store: String,
    },

    /// The transaction was aborted.
    #[error("transaction aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },

    /// The connection was closed.
    #[error("connection to '{name}' is closed")]
    DatabaseClosed {
        /// Database name.
        name: String,
    },

    /// Another process holds the storage directory.
    #[error("storage directory locked by another process")]
    DatabaseLocked,

    /// A journal frame failed validation.
    #[error("journal corrupted at offset {offset}: {message}")]
    JournalCorrupted {
        /// Byte offset of the bad frame.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },
}

fn describe(differences: &[SchemaDifference]) -> String {
    differences
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CoreError {
    /// Creates an argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// Creates a constraint error.
    pub fn constraint(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Constraint {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Creates a data error.
    pub fn data(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Data {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an abort error.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Creates a journal corruption error.
    pub fn journal_corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::JournalCorrupted {
            offset,
            message: message.into(),
        }
    }

    /// Error for a store that is missing or outside the transaction scope.
    pub(crate) fn unknown_store(store: &str) -> Self {
        Self::argument(format!("store '{store}' not found in transaction scope"))
    }

    /// Error for an index missing from its store.
    pub(crate) fn unknown_index(store: &str, index: &str) -> Self {
        Self::argument(format!("index '{index}' not found in store '{store}'"))
    }

    /// Error for an `add` that collides with an existing record.
    pub(crate) fn duplicate_key(store: &str, key: &Key) -> Self {
        Self::constraint(store, format!("key {key} already exists"))
    }

    /// True for failures a UI should show as "storage unavailable":
    /// connection establishment and persistence problems rather than
    /// problems with one record.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_)
                | Self::Io(_)
                | Self::Blocked { .. }
                | Self::Timeout { .. }
                | Self::SchemaConflict { .. }
                | Self::VersionTooLow { .. }
                | Self::DatabaseClosed { .. }
                | Self::DatabaseLocked
                | Self::JournalCorrupted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_errors_are_not_unavailability() {
        assert!(!CoreError::constraint("notes", "dup").is_storage_unavailable());
        assert!(!CoreError::argument("bad").is_storage_unavailable());
        assert!(CoreError::DatabaseLocked.is_storage_unavailable());
        assert!(CoreError::Timeout {
            operation: "open".into(),
            millis: 5
        }
        .is_storage_unavailable());
    }

    #[test]
    fn duplicate_key_message_names_the_key() {
        let err = CoreError::duplicate_key("notes", &Key::from(3));
        assert_eq!(
            err.to_string(),
            "constraint violated in store 'notes': key 3 already exists"
        );
    }
}
