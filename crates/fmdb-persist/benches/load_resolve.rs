//! Benchmarks for model-file loading and reference resolution.
//!
//! Run with: cargo bench -p fmdb-persist

#![allow(missing_docs, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fmdb_persist::{read_str, write_string};
use fmdb_store::Database;
use std::fmt::Write as _;

/// `n` parts, each owning one triad; triads are written before their
/// parts so every reference is forward.
fn chain_model(n: usize) -> String {
    let mut blocks = String::new();
    for i in 1..=n {
        let _ = write!(
            blocks,
            "TRIAD\n{{\n  ID = {i};\n  POSITION = {i} 0 0;\n  OWNER_LINK = FcLINK {i};\n}}\n\n"
        );
    }
    for i in 1..=n {
        let _ = write!(blocks, "LINK\n{{\n  ID = {i};\n  MASS = 1.5;\n}}\n\n");
    }
    format!("{}\n{blocks}END {{FEDEMMODELFILE}}\n", fmdb_persist::header_line())
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for n in [100usize, 1_000, 10_000] {
        let text = chain_model(n);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("read_str", n), &text, |b, text| {
            b.iter(|| {
                let mut db = Database::new();
                let report = read_str(&mut db, black_box(text)).unwrap_or_default();
                black_box(report.blocks_read)
            });
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for n in [1_000usize, 10_000] {
        let mut db = Database::new();
        let _ = read_str(&mut db, &chain_model(n));
        group.bench_with_input(BenchmarkId::new("resolve_all", n), &db, |b, db| {
            b.iter_batched(
                || db.clone(),
                |mut db| black_box(db.resolve_all()),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let mut db = Database::new();
    let _ = read_str(&mut db, &chain_model(1_000));
    c.bench_function("write_string/1000", |b| b.iter(|| black_box(write_string(&db))));
}

criterion_group!(benches, bench_load, bench_resolve, bench_write);
criterion_main!(benches);
