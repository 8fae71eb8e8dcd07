//! Shared data builders for the shelfdb benchmarks.

use rand::Rng;
use shelfdb_codec::Value;
use shelfdb_core::{Connection, ConnectionPool, DatabaseSchema, IndexSchema, StoreSchema};

/// Store every database benchmark writes to.
pub const BENCH_STORE: &str = "bench";

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// A record keyed by `id`, with an indexed `group` and a payload of
/// `payload_size` random bytes.
#[allow(clippy::cast_possible_wrap)]
pub fn record(id: usize, payload_size: usize) -> Value {
    Value::object([
        ("id", Value::from(id as i64)),
        ("group", Value::from((id % 10) as i64)),
        ("parity", Value::from((id % 2) as i64)),
        ("payload", Value::Bytes(random_data(payload_size))),
    ])
}

/// Generate `count` records with ids `0..count`.
pub fn records(count: usize, payload_size: usize) -> Vec<Value> {
    (0..count).map(|id| record(id, payload_size)).collect()
}

/// Schema with one store keyed by `id`, indexed on `group` and `parity`.
pub fn bench_schema() -> DatabaseSchema {
    DatabaseSchema::versioned(
        1,
        vec![StoreSchema::with_key_path(BENCH_STORE, "id")
            .index(IndexSchema::new("by_group", "group"))
            .index(IndexSchema::new("by_parity", "parity"))],
    )
}

/// Connects to the bench database and stores `count` records.
pub fn populated(pool: &ConnectionPool, count: usize, payload_size: usize) -> Connection {
    let conn = pool.connect("bench", bench_schema()).expect("connect");
    conn.put_all(BENCH_STORE, records(count, payload_size)).expect("populate");
    conn
}
