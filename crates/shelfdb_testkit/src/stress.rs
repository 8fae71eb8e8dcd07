//! Stress helpers for shelfdb.
//!
//! These run many requests against one connection, sequentially or from
//! several threads, and report throughput.

use shelfdb_codec::Value;
use shelfdb_core::{
    Connection, CoreError, CursorPosition, DatabaseSchema, IndexSchema, ListMethod, ListQuery, RequestExecutor, StoreSchema,
    TransactionMode,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Store every stress helper writes to.
pub const STRESS_STORE: &str = "items";

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Size of the payload field in bytes.
    pub payload_size: usize,
    /// Number of distinct records.
    pub record_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            payload_size: 256,
            record_count: 1_000,
        }
    }
}

/// Schema with one `items` store keyed by `id` and a `by_bucket` index.
pub fn stress_schema() -> DatabaseSchema {
    DatabaseSchema::versioned(
        1,
        vec![StoreSchema::with_key_path(STRESS_STORE, "id").index(IndexSchema::new("by_bucket", "bucket"))],
    )
}

/// One stress record.
#[allow(clippy::cast_possible_wrap)]
pub fn item(id: usize, payload_size: usize) -> Value {
    Value::object([
        ("id", Value::from(id as i64)),
        ("bucket", Value::from((id % 16) as i64)),
        ("payload", Value::Bytes(vec![0xAB; payload_size])),
    ])
}

fn populate(conn: &Connection, config: &StressConfig) {
    let records = (0..config.record_count).map(|i| item(i, config.payload_size)).collect();
    conn.put_all(STRESS_STORE, records)
        .expect("Failed to populate stress store");
}

/// Run a sequential put stress test, one transaction per put.
pub fn stress_sequential_puts(conn: &Connection, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match conn.put(STRESS_STORE, item(i % config.record_count, config.payload_size)) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a mixed put/get/remove stress test.
#[allow(clippy::cast_possible_wrap)]
pub fn stress_mixed_operations(conn: &Connection, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let id = i % config.record_count;
        let result = match i % 3 {
            0 => conn.put(STRESS_STORE, item(id, config.payload_size)).map(|_| ()),
            1 => conn.get(STRESS_STORE, id as i64).map(|_| ()),
            _ => conn.remove(STRESS_STORE, id as i64).map(|_| ()),
        };

        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent read stress test while one thread keeps writing.
#[allow(clippy::cast_possible_wrap)]
pub fn stress_concurrent_reads(conn: Arc<Connection>, config: &StressConfig) -> StressTestResult {
    populate(&conn, config);

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();

    let writer = {
        let conn = Arc::clone(&conn);
        let config = config.clone();
        thread::spawn(move || {
            for i in 0..ops_per_thread {
                let _ = conn.put(STRESS_STORE, item(i % config.record_count, config.payload_size));
            }
        })
    };

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let conn = Arc::clone(&conn);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let record_count = config.record_count;

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let id = (t * ops_per_thread + i) % record_count;
                    match conn.get(STRESS_STORE, id as i64) {
                        Ok(Some(_)) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(None) | Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    writer.join().expect("Writer panicked");

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a transaction abort stress test: every other transaction fails
/// after writing.
pub fn stress_transaction_aborts(conn: &Connection, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let should_fail = i % 2 == 0;
        let record = item(i % config.record_count, config.payload_size);

        let result = conn.run(&[STRESS_STORE], TransactionMode::ReadWrite, |tx| {
            conn.executor().put(tx, STRESS_STORE, vec![record], None)?;
            if should_fail {
                Err(CoreError::invalid_operation("intentional"))
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a paged listing stress test: walk the `by_bucket` index in pages
/// until it is exhausted, repeatedly.
pub fn stress_paged_listing(conn: &Connection, config: &StressConfig) -> StressTestResult {
    populate(conn, config);
    let query = ListQuery::new(STRESS_STORE, ListMethod::PrimaryKeys)
        .index("by_bucket")
        .limit(64);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    while successful + failed < config.operations {
        let mut position = CursorPosition::new();
        let mut seen = 0;
        while !position.is_exhausted() {
            match conn.list_from(&query, &mut position) {
                Ok(page) => {
                    seen += page.len();
                    successful += 1;
                }
                Err(_) => {
                    failed += 1;
                    break;
                }
            }
        }
        if seen != config.record_count {
            failed += 1;
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
