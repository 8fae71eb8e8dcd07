//! Record codec and key benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shelfdb_bench::record;
use shelfdb_codec::{from_cbor, to_canonical_cbor, CanonicalEncoder, Key, Value};

/// A nested record with `width` fields per level.
fn nested_record(depth: usize, width: usize) -> Value {
    if depth == 0 {
        Value::from("leaf")
    } else {
        Value::object((0..width).map(|i| (format!("field_{i}"), nested_record(depth - 1, width))))
    }
}

/// Benchmark encoding records.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [64, 256, 1024, 4096, 16384].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("record", size), size, |b, &size| {
            let value = record(7, size);
            b.iter(|| {
                let result = to_canonical_cbor(black_box(&value)).unwrap();
                black_box(result);
            });
        });
    }

    group.bench_function("nested_depth3_width5", |b| {
        let value = nested_record(3, 5);
        b.iter(|| {
            let result = to_canonical_cbor(black_box(&value)).unwrap();
            black_box(result);
        });
    });

    group.finish();
}

/// Benchmark decoding records.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("record", size), size, |b, &size| {
            let encoded = to_canonical_cbor(&record(7, size)).unwrap();
            b.iter(|| {
                let result: Value = from_cbor(black_box(&encoded)).unwrap();
                black_box(result);
            });
        });
    }

    group.bench_function("nested_depth3_width5", |b| {
        let encoded = to_canonical_cbor(&nested_record(3, 5)).unwrap();
        b.iter(|| {
            let result: Value = from_cbor(black_box(&encoded)).unwrap();
            black_box(result);
        });
    });

    group.finish();
}

/// Benchmark encoder reuse across a journal-sized batch.
fn bench_encoder_reuse(c: &mut Criterion) {
    c.bench_function("encoder_reuse_100", |b| {
        let values: Vec<_> = (0..100).map(|i| record(i, 32)).collect();

        b.iter(|| {
            let mut encoder = CanonicalEncoder::new();
            for value in &values {
                encoder.encode(black_box(value)).unwrap();
            }
            black_box(encoder.into_bytes());
        });
    });
}

/// Benchmark key extraction and ordering.
fn bench_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("keys");

    group.bench_function("from_value_path", |b| {
        let value = Value::object([("meta", Value::object([("id", Value::from("k-00042"))]))]);
        b.iter(|| {
            let field = black_box(&value).get_path("meta.id").unwrap();
            black_box(Key::from_value(field).unwrap());
        });
    });

    group.bench_function("compare_mixed", |b| {
        let keys = [
            Key::from(3),
            Key::from("three"),
            Key::Binary(vec![3, 3, 3]),
            Key::Array(vec![Key::from(3), Key::from("three")]),
        ];
        b.iter(|| {
            let mut less = 0;
            for x in &keys {
                for y in &keys {
                    if black_box(x) < black_box(y) {
                        less += 1;
                    }
                }
            }
            black_box(less);
        });
    });

    for count in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("sort_compound", count), count, |b, &count| {
            let keys: Vec<Key> = (0..count)
                .rev()
                .map(|i| Key::Array(vec![Key::from((i % 10) as i64), Key::from(format!("k{i}"))]))
                .collect();
            b.iter(|| {
                let mut sorted = keys.clone();
                sorted.sort();
                black_box(sorted);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_encoder_reuse, bench_keys);

criterion_main!(benches);
