//! CLI command implementations.

pub mod compact;
pub mod dump;
pub mod inspect;
pub mod load;
pub mod verify;

use shelfdb_core::{Config, Connection, ConnectionPool, DatabaseSchema};
use std::path::Path;

/// Result type shared by the commands.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Opens the pool over `dir`, failing when `name` has no journal there.
pub fn open_existing(dir: &Path, name: &str) -> CliResult<ConnectionPool> {
    if !dir.is_dir() {
        return Err(format!("No storage directory at {}", dir.display()).into());
    }
    let pool = ConnectionPool::open(Config::new().storage_dir(dir))?;
    if !pool.database_names()?.iter().any(|n| n == name) {
        return Err(format!("No database '{name}' in {}", dir.display()).into());
    }
    Ok(pool)
}

/// Connects with whatever schema the database already has.
pub fn connect_live(pool: &ConnectionPool, name: &str) -> CliResult<Connection> {
    Ok(pool.connect(name, DatabaseSchema::auto(Vec::new()).editable())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfdb_codec::Value;
    use shelfdb_core::{IndexSchema, StoreSchema};
    use tempfile::TempDir;

    fn seeded() -> TempDir {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::open(Config::new().storage_dir(dir.path())).unwrap();
        let conn = pool
            .connect(
                "shop",
                DatabaseSchema::versioned(
                    2,
                    vec![StoreSchema::with_key_path("items", "sku").index(IndexSchema::new("price", "price"))],
                ),
            )
            .unwrap();
        for (sku, price) in [("a1", 3), ("b2", 5)] {
            conn.put("items", Value::object([("sku", Value::from(sku)), ("price", Value::from(price))]))
                .unwrap();
        }
        dir
    }

    #[test]
    fn open_existing_rejects_unknown_names() {
        let dir = seeded();
        assert!(open_existing(dir.path(), "shop").is_ok());
        assert!(open_existing(dir.path(), "other").is_err());
        assert!(open_existing(&dir.path().join("missing"), "shop").is_err());
    }

    #[test]
    fn live_connection_keeps_existing_schema() {
        let dir = seeded();
        let pool = open_existing(dir.path(), "shop").unwrap();
        let conn = connect_live(&pool, "shop").unwrap();
        assert_eq!(conn.version(), 2);
        assert!(conn.report().changes.is_empty());
        assert_eq!(conn.store_names(), vec!["items".to_string()]);
        assert_eq!(conn.count("items").unwrap(), 2);
    }

    #[test]
    fn load_then_compact_then_verify() {
        let dir = seeded();
        let csv = dir.path().join("items.csv");
        std::fs::write(&csv, "sku;price\n\"c3\";8\n\"d4\";1\n").unwrap();
        load::run(dir.path(), "shop", "items", &csv, ';').unwrap();
        compact::run(dir.path(), "shop").unwrap();
        verify::run(dir.path(), "shop").unwrap();

        let pool = open_existing(dir.path(), "shop").unwrap();
        let conn = connect_live(&pool, "shop").unwrap();
        assert_eq!(conn.count("items").unwrap(), 4);
        let scan = pool.verify("shop").unwrap();
        assert!(scan.torn_tail.is_none());
    }
}
