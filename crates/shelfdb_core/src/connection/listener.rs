//! Lifecycle hooks for an open connection.

use crate::error::CoreError;
use crate::types::TransactionId;

/// Another connection wants to change the database version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChangeEvent {
    /// Database name.
    pub database: String,
    /// Version this connection is open at.
    pub old_version: u32,
    /// Requested version, or `None` when the database is being deleted.
    pub new_version: Option<u32>,
}

/// How a connection answers a version change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionChangeResponse {
    /// Close this connection so the upgrade can proceed.
    #[default]
    Close,
    /// Stay open. The requesting connect fails with `Blocked`.
    Keep,
}

/// Hooks invoked on a [`Connection`](super::Connection).
///
/// Every method has a default, so implementors override only what they
/// need. Hooks run on the thread that triggered them and must not block
/// on the database.
pub trait ConnectionListener: Send + Sync {
    /// Another connection requested a higher version, or deletion.
    fn on_version_change(&self, _event: &VersionChangeEvent) -> VersionChangeResponse {
        VersionChangeResponse::Close
    }

    /// A transaction on this connection aborted.
    fn on_abort(&self, _txid: TransactionId, _reason: &str) {}

    /// A commit on this connection failed.
    fn on_error(&self, _txid: TransactionId, _error: &CoreError) {}
}
