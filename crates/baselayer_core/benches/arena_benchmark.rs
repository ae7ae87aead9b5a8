//! # Arena Benchmark
//!
//! Bump allocation and lazy commit cost.
//!
//! Run with: `cargo bench --package baselayer_core --bench arena_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]

use baselayer_core::{Arena, MmapBacking, StrBuff};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fmt::Write;

/// Bytes allocated per iteration.
const TOTAL_BYTES: usize = 4 * 1024 * 1024;

/// Benchmark: many small allocations on a warm arena.
fn bench_small_allocs(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_small_allocs");

    for len in [8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let mut arena = Arena::new();
            b.iter(|| {
                arena.clear();
                for _ in 0..TOTAL_BYTES / len {
                    black_box(arena.alloc(len));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark: cold arenas committing as they grow.
fn bench_cold_growth(c: &mut Criterion) {
    c.bench_function("arena_cold_growth_heap", |b| {
        b.iter(|| {
            let mut arena = Arena::new();
            arena.alloc(TOTAL_BYTES);
            black_box(arena.committed())
        });
    });

    c.bench_function("arena_cold_growth_mmap", |b| {
        b.iter(|| {
            let Ok(mut arena) = Arena::<MmapBacking>::create(0) else {
                return 0;
            };
            arena.alloc(TOTAL_BYTES);
            black_box(arena.committed())
        });
    });
}

/// Benchmark: formatted appends into a string buffer.
fn bench_str_buff(c: &mut Criterion) {
    c.bench_function("str_buff_formatted_lines", |b| {
        let mut buff = StrBuff::new();
        b.iter(|| {
            buff.clear();
            for i in 0..10_000u32 {
                let _ = writeln!(buff, "{}_{}_{}", i, i * 2, "some_text");
            }
            black_box(buff.len())
        });
    });
}

criterion_group!(benches, bench_small_allocs, bench_cold_growth, bench_str_buff);
criterion_main!(benches);
