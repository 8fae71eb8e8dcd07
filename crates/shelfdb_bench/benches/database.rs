//! Database operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shelfdb_bench::{populated, record, records, BENCH_STORE};
use shelfdb_codec::Key;
use shelfdb_core::{
    Algorithm, Config, ConnectionPool, CursorPosition, KeyRange, ListMethod, ListQuery, RangeIterator,
    TransactionMode,
};
use tempfile::TempDir;

/// Benchmark single record puts, one transaction each.
fn bench_single_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_put");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let pool = ConnectionPool::in_memory();
            let conn = populated(&pool, 0, size);
            let value = record(1, size);

            b.iter(|| {
                conn.put(BENCH_STORE, black_box(value.clone())).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark batched puts in one transaction.
fn bench_batch_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_put");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let pool = ConnectionPool::in_memory();
                let conn = populated(&pool, 0, 256);
                let batch = records(batch_size, 256);

                b.iter(|| {
                    let written = conn.put_all(BENCH_STORE, black_box(batch.clone())).unwrap();
                    black_box(written);
                });
            },
        );
    }
    group.finish();
}

/// Benchmark journaled commits against a storage directory.
fn bench_file_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_put");
    group.sample_size(20);

    group.bench_function("256b", |b| {
        let temp_dir = TempDir::new().unwrap();
        let pool = ConnectionPool::open(Config::new().storage_dir(temp_dir.path())).unwrap();
        let conn = populated(&pool, 0, 256);
        let value = record(1, 256);

        b.iter(|| {
            conn.put(BENCH_STORE, black_box(value.clone())).unwrap();
        });
    });
    group.finish();
}

/// Benchmark point reads from a populated store.
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for count in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let pool = ConnectionPool::in_memory();
            let conn = populated(&pool, count, 256);
            let mut id = 0usize;

            b.iter(|| {
                id = (id + 7) % count;
                let found = conn.get(BENCH_STORE, Key::from(id as i64)).unwrap();
                black_box(found);
            });
        });
    }
    group.finish();
}

/// Benchmark batched reads in one transaction.
fn bench_get_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_all");
    let pool = ConnectionPool::in_memory();
    let conn = populated(&pool, 10_000, 64);

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        let keys: Vec<Key> = (0..*batch_size).map(|i| Key::from((i * 9) as i64)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &keys, |b, keys| {
            b.iter(|| {
                let found = conn.get_all(BENCH_STORE, black_box(keys)).unwrap();
                black_box(found);
            });
        });
    }
    group.finish();
}

/// Benchmark listing an index in pages versus in one call.
fn bench_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("list");
    let pool = ConnectionPool::in_memory();
    let conn = populated(&pool, 10_000, 64);
    let query = ListQuery::new(BENCH_STORE, ListMethod::PrimaryKeys).index("by_group");

    group.bench_function("one_shot", |b| {
        let all = query.clone().limit(usize::MAX);
        b.iter(|| {
            let items = conn.list(black_box(&all)).unwrap();
            black_box(items);
        });
    });

    for page in [64, 512].iter() {
        group.bench_with_input(BenchmarkId::new("paged", page), page, |b, &page| {
            let paged = query.clone().limit(page);
            b.iter(|| {
                let mut position = CursorPosition::new();
                let mut seen = 0;
                while !position.is_exhausted() {
                    seen += conn.list_from(&paged, &mut position).unwrap().len();
                }
                black_box(seen);
            });
        });
    }
    group.finish();
}

/// Benchmark counting a key range.
fn bench_count_range(c: &mut Criterion) {
    let pool = ConnectionPool::in_memory();
    let conn = populated(&pool, 10_000, 64);
    let range = KeyRange::bound(2_000, 8_000, false, true).unwrap();

    c.bench_function("count_range", |b| {
        b.iter(|| {
            let counted = conn
                .run(&[BENCH_STORE], TransactionMode::ReadOnly, |tx| {
                    conn.executor()
                        .count_key_range(tx, BENCH_STORE, Some(black_box(&range)), None, false)
                })
                .unwrap();
            black_box(counted);
        });
    });
}

/// Benchmark the builtin join algorithms on two index ranges.
fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");
    group.sample_size(30);
    let pool = ConnectionPool::in_memory();
    let conn = populated(&pool, 5_000, 16);

    for algorithm in [Algorithm::SortedMerge, Algorithm::ZigzagMerge] {
        group.bench_function(format!("{algorithm:?}"), |b| {
            b.iter(|| {
                let mut iterators = vec![
                    RangeIterator::index_keys(BENCH_STORE, "by_group").with_range(KeyRange::only(4)),
                    RangeIterator::index_keys(BENCH_STORE, "by_parity").with_range(KeyRange::only(0)),
                ];
                let found = conn.operator().join(algorithm, &mut iterators).unwrap();
                black_box(found);
            });
        });
    }

    // Quadratic, so it gets a smaller slice.
    group.bench_function("NestedLoop", |b| {
        b.iter(|| {
            let mut iterators = vec![
                RangeIterator::index_keys(BENCH_STORE, "by_group").with_range(KeyRange::only(4)),
                RangeIterator::keys(BENCH_STORE).with_range(KeyRange::upper_bound(200, false)),
            ];
            let found = conn.operator().join(Algorithm::NestedLoop, &mut iterators).unwrap();
            black_box(found);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_single_put,
    bench_batch_put,
    bench_file_put,
    bench_get,
    bench_get_all,
    bench_list,
    bench_count_range,
    bench_join,
);

criterion_main!(benches);
