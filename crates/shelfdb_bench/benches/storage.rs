//! Storage backend benchmarks, shaped like journal traffic.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shelfdb_bench::random_data;
use shelfdb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use tempfile::TempDir;

fn file_backend(temp_dir: &TempDir) -> FileBackend {
    FileBackend::open(&temp_dir.path().join("bench.journal")).unwrap()
}

/// Benchmark appends to both backends.
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("inmemory", size), size, |b, &size| {
            let mut backend = InMemoryBackend::new();
            let data = random_data(size);
            b.iter(|| {
                black_box(backend.append(black_box(&data)).unwrap());
            });
        });
    }

    group.sample_size(50);
    for size in [256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("file", size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let mut backend = file_backend(&temp_dir);
            let data = random_data(size);
            b.iter(|| {
                black_box(backend.append(black_box(&data)).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark one commit: append a frame, then flush and sync.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");
    group.sample_size(20);

    group.bench_function("file_1kb_flush", |b| {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = file_backend(&temp_dir);
        let data = random_data(1024);
        b.iter(|| {
            backend.append(&data).unwrap();
            backend.flush().unwrap();
        });
    });

    group.bench_function("file_1kb_sync", |b| {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = file_backend(&temp_dir);
        let data = random_data(1024);
        b.iter(|| {
            backend.append(&data).unwrap();
            backend.sync().unwrap();
        });
    });

    group.finish();
}

/// Benchmark replaying a whole journal.
fn bench_read_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_all");

    for frames in [100, 1000].iter() {
        group.throughput(Throughput::Bytes((*frames * 256) as u64));
        group.bench_with_input(BenchmarkId::new("inmemory", frames), frames, |b, &frames| {
            let mut backend = InMemoryBackend::new();
            let data = random_data(256);
            for _ in 0..frames {
                backend.append(&data).unwrap();
            }
            b.iter(|| black_box(backend.read_all().unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("file", frames), frames, |b, &frames| {
            let temp_dir = TempDir::new().unwrap();
            let mut backend = file_backend(&temp_dir);
            let data = random_data(256);
            for _ in 0..frames {
                backend.append(&data).unwrap();
            }
            backend.sync().unwrap();
            b.iter(|| black_box(backend.read_all().unwrap()));
        });
    }

    group.finish();
}

/// Benchmark compaction-style rewrites and torn-tail truncation.
fn bench_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrite");
    group.sample_size(20);

    group.bench_function("file_replace_64kb", |b| {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = file_backend(&temp_dir);
        let image = random_data(64 * 1024);
        b.iter(|| {
            backend.replace(black_box(&image)).unwrap();
        });
    });

    group.bench_function("inmemory_truncate_tail", |b| {
        let data = random_data(4096);
        b.iter(|| {
            let mut backend = InMemoryBackend::new();
            backend.append(&data).unwrap();
            backend.truncate(black_box(4000)).unwrap();
            black_box(backend.size().unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_append, bench_commit, bench_read_all, bench_rewrite);

criterion_main!(benches);
