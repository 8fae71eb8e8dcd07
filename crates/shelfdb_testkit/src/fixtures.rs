//! Test fixtures and database helpers.
//!
//! Provides pools that clean up after themselves and a couple of
//! pre-populated databases used across the test suites.

use shelfdb_codec::Value;
use shelfdb_core::{Config, Connection, ConnectionPool, DatabaseSchema, IndexSchema, StoreSchema};
use std::path::Path;
use tempfile::TempDir;

/// A connection pool with automatic cleanup.
pub struct TestPool {
    /// The pool instance.
    pub pool: ConnectionPool,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestPool {
    /// Creates a pool that keeps databases in memory.
    pub fn memory() -> Self {
        Self {
            pool: ConnectionPool::in_memory(),
            temp_dir: None,
        }
    }

    /// Creates a pool persisting to a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let pool = ConnectionPool::open(Config::new().storage_dir(temp_dir.path()))
            .expect("Failed to open file pool");
        Self {
            pool,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the storage directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Drops the pool and opens a new one over the same directory, as a
    /// restarted process would. In-memory pools start empty.
    pub fn reopen(self) -> Self {
        let Self { pool, temp_dir } = self;
        let config = pool.config().clone();
        drop(pool);
        match temp_dir {
            Some(dir) => Self {
                pool: ConnectionPool::open(config).expect("Failed to reopen file pool"),
                temp_dir: Some(dir),
            },
            None => Self::memory(),
        }
    }
}

impl std::ops::Deref for TestPool {
    type Target = ConnectionPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

/// Runs a test with a temporary in-memory pool.
///
/// # Example
///
/// ```rust
/// use shelfdb_testkit::with_temp_pool;
///
/// with_temp_pool(|pool| {
///     assert!(pool.database_names().unwrap().is_empty());
/// });
/// ```
pub fn with_temp_pool<F, R>(f: F) -> R
where
    F: FnOnce(&ConnectionPool) -> R,
{
    let test_pool = TestPool::memory();
    f(&test_pool.pool)
}

/// Runs a test with a pool persisting to a temporary directory.
pub fn with_file_pool<F, R>(f: F) -> R
where
    F: FnOnce(&ConnectionPool, &Path) -> R,
{
    let test_pool = TestPool::file();
    let path = test_pool.path().expect("File pool should have a path");
    f(&test_pool.pool, path)
}

/// Pre-populated databases.
pub mod scenarios {
    use super::*;

    /// Schema of the `zoo` database: an `animals` store keyed by `id`
    /// with `by_color`, `by_legs` and multi-entry `by_habitat` indexes.
    pub fn animals_schema() -> DatabaseSchema {
        DatabaseSchema::versioned(
            1,
            vec![StoreSchema::with_key_path("animals", "id")
                .index(IndexSchema::new("by_color", "color"))
                .index(IndexSchema::new("by_legs", "legs"))
                .index(IndexSchema::new("by_habitat", "habitat").multi_entry(true))],
        )
    }

    /// The animals, as `(id, name, color, legs, habitats)`.
    pub const ANIMALS: [(i32, &str, &str, i32, &[&str]); 8] = [
        (1, "swan", "white", 2, &["lake", "river"]),
        (2, "elephant", "grey", 4, &["savanna"]),
        (3, "goat", "white", 4, &["mountain", "farm"]),
        (4, "spider", "black", 8, &["forest", "farm"]),
        (5, "sheep", "white", 4, &["farm"]),
        (6, "pigeon", "grey", 2, &["city"]),
        (7, "cow", "black", 4, &["farm"]),
        (8, "crow", "black", 2, &["city", "forest"]),
    ];

    /// Builds one animal record.
    pub fn animal(id: i32, name: &str, color: &str, legs: i32, habitats: &[&str]) -> Value {
        Value::object([
            ("id", Value::from(id)),
            ("name", Value::from(name)),
            ("color", Value::from(color)),
            ("legs", Value::from(legs)),
            (
                "habitat",
                Value::Array(habitats.iter().map(|h| Value::from(*h)).collect()),
            ),
        ])
    }

    /// Connects to `zoo` and stores every animal.
    pub fn animals(pool: &ConnectionPool) -> Connection {
        let conn = pool.connect("zoo", animals_schema()).expect("Failed to connect to zoo");
        let records = ANIMALS
            .iter()
            .map(|(id, name, color, legs, habitats)| animal(*id, name, color, *legs, habitats))
            .collect();
        let batch = conn.put_all("animals", records).expect("Failed to store animals");
        assert!(!batch.has_error(), "Failed to store animals");
        conn
    }

    /// Schema of the `notebook` database: a `notes` store with generated
    /// keys at `id` and a `by_tag` index.
    pub fn notes_schema() -> DatabaseSchema {
        DatabaseSchema::versioned(
            1,
            vec![StoreSchema::with_key_path("notes", "id")
                .auto_increment(true)
                .index(IndexSchema::new("by_tag", "tag"))],
        )
    }

    /// Connects to `notebook` and stores `count` notes tagged round-robin
    /// with `a`, `b` and `c`. Keys run from 1 to `count`.
    pub fn notes(pool: &ConnectionPool, count: usize) -> Connection {
        let conn = pool.connect("notebook", notes_schema()).expect("Failed to connect to notebook");
        let tags = ["a", "b", "c"];
        let records = (0..count)
            .map(|i| {
                Value::object([
                    ("tag", Value::from(tags[i % tags.len()])),
                    ("body", Value::from(format!("note {i}"))),
                ])
            })
            .collect();
        let batch = conn.put_all("notes", records).expect("Failed to store notes");
        assert!(!batch.has_error(), "Failed to store notes");
        conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfdb_codec::Key;

    #[test]
    fn test_memory_pool() {
        let test_pool = TestPool::memory();
        assert!(test_pool.path().is_none());
        assert!(test_pool.database_names().unwrap().is_empty());
    }

    #[test]
    fn test_animals_scenario() {
        with_temp_pool(|pool| {
            let conn = scenarios::animals(pool);
            assert_eq!(conn.count("animals").unwrap(), scenarios::ANIMALS.len());
            assert_eq!(conn.where_equal("animals", "by_habitat", "farm").unwrap().len(), 4);
        });
    }

    #[test]
    fn test_notes_scenario_generates_keys() {
        with_temp_pool(|pool| {
            let conn = scenarios::notes(pool, 5);
            let note = conn.get("notes", 5).unwrap().unwrap();
            assert_eq!(note.get("id"), Some(&Key::from(5).to_value()));
        });
    }

    #[test]
    fn test_file_pool_survives_reopen() {
        let test_pool = TestPool::file();
        scenarios::notes(&test_pool, 3);
        let test_pool = test_pool.reopen();
        let conn = test_pool.connect("notebook", scenarios::notes_schema()).unwrap();
        assert_eq!(conn.count("notes").unwrap(), 3);
        assert!(conn.report().changes.is_empty());
    }
}
