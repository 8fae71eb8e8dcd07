//! Connection pool configuration.

use crate::error::{CoreError, CoreResult};
use std::path::PathBuf;
use std::time::Duration;

/// Number of sub-requests a batch dispatches per window.
pub const DEFAULT_BATCH_WINDOW: usize = 10;

/// Number of results `list` returns when no limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Configuration for a [`ConnectionPool`](crate::ConnectionPool).
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one journal per database. `None` keeps every
    /// database in memory for the lifetime of the pool.
    pub storage_dir: Option<PathBuf>,

    /// How long `connect` waits for in-flight transactions before failing
    /// with `Timeout`. `None` waits forever.
    pub connect_timeout: Option<Duration>,

    /// How long a read-write transaction waits for the writer slot.
    pub lock_timeout: Duration,

    /// Sub-requests dispatched per window in batch operations.
    pub batch_window: usize,

    /// Result limit applied by `list` when the query sets none.
    pub default_list_limit: usize,

    /// Whether to sync the journal on every commit (safer but slower).
    pub sync_on_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: None,
            connect_timeout: Some(Duration::from_secs(180)),
            lock_timeout: Duration::from_secs(30),
            batch_window: DEFAULT_BATCH_WINDOW,
            default_list_limit: DEFAULT_LIST_LIMIT,
            sync_on_commit: true,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists databases as journals under `dir`.
    #[must_use]
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the writer slot timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the batch window.
    #[must_use]
    pub const fn batch_window(mut self, window: usize) -> Self {
        self.batch_window = window;
        self
    }

    /// Sets the default list limit.
    #[must_use]
    pub const fn default_list_limit(mut self, limit: usize) -> Self {
        self.default_list_limit = limit;
        self
    }

    /// Sets whether to sync the journal on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Checks that windows and limits are usable.
    pub fn validate(&self) -> CoreResult<()> {
        if self.batch_window == 0 {
            return Err(CoreError::argument("batch window must be at least 1"));
        }
        if self.default_list_limit == 0 {
            return Err(CoreError::argument("default list limit must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.storage_dir.is_none());
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(180)));
        assert_eq!(config.batch_window, 10);
        assert_eq!(config.default_list_limit, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .storage_dir("/tmp/shelf")
            .connect_timeout(None)
            .batch_window(4)
            .sync_on_commit(false);

        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/shelf")));
        assert!(config.connect_timeout.is_none());
        assert_eq!(config.batch_window, 4);
        assert!(!config.sync_on_commit);
    }

    #[test]
    fn zero_window_rejected() {
        let err = Config::new().batch_window(0).validate().unwrap_err();
        assert!(matches!(err, CoreError::Argument { .. }));
        assert!(Config::new().default_list_limit(0).validate().is_err());
    }
}
