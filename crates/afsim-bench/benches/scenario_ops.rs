//! Criterion benchmarks for scenario validation, rendering and persistence.

use std::hint::black_box;

use afsim_bench::large_scenario;
use afsim_scenario::{afsim_text, persist, validate};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_validate(c: &mut Criterion) {
    let scenario = large_scenario(1_000);
    c.bench_function("validate_1k_platforms", |b| {
        b.iter(|| black_box(validate(&scenario)));
    });
}

fn bench_render(c: &mut Criterion) {
    let scenario = large_scenario(1_000);
    c.bench_function("render_1k_platforms", |b| {
        b.iter(|| black_box(afsim_text::render(&scenario)));
    });
}

/// Atomic JSON save followed by a load.
fn bench_save_load(c: &mut Criterion) {
    let scenario = large_scenario(1_000);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.json");
    let mut group = c.benchmark_group("persist_1k_platforms");
    group.sample_size(20);
    group.bench_function("save_load", |b| {
        b.iter(|| {
            persist::write(&scenario, &path).unwrap();
            black_box(persist::read(&path).unwrap())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_validate, bench_render, bench_save_load);
criterion_main!(benches);
