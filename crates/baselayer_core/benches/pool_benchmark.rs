//! # Pool Benchmark
//!
//! Allocate/free throughput of fixed-block pools.
//!
//! Run with: `cargo bench --package baselayer_core --bench pool_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]

use baselayer_core::{Arena, BlockAddr, Pool};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Blocks per pool.
const BLOCK_COUNT: u32 = 100_000;

/// Benchmark: fill a pool, then free everything in allocation order.
fn bench_fill_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_fill_and_drain");

    for block_size in [16usize, 64, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, &block_size| {
                let mut pool = Pool::create(block_size, BLOCK_COUNT);
                let mut blocks = Vec::with_capacity(BLOCK_COUNT as usize);
                b.iter(|| {
                    while let Some(addr) = pool.allocate() {
                        blocks.push(addr);
                    }
                    for addr in blocks.drain(..) {
                        pool.free(black_box(addr));
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: free in shuffled order, then refill from the scattered list.
fn bench_scattered_reuse(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut pool = Pool::create(48, BLOCK_COUNT);
    let mut blocks: Vec<BlockAddr> = (0..BLOCK_COUNT).filter_map(|_| pool.allocate()).collect();
    blocks.shuffle(&mut rng);

    c.bench_function("pool_scattered_reuse", |b| {
        b.iter(|| {
            for &addr in &blocks {
                pool.free(addr);
            }
            for slot in &mut blocks {
                if let Some(addr) = pool.allocate() {
                    *slot = addr;
                }
            }
            black_box(pool.occupancy())
        });
    });
}

/// Benchmark: pool carved out of a shared arena, addressed by index.
fn bench_index_round_trip(c: &mut Criterion) {
    let mut arena = Arena::new();
    let mut pool = Pool::create_in(&mut arena, 32, 4096);

    c.bench_function("pool_index_round_trip", |b| {
        b.iter(|| {
            let index = pool.allocate_index();
            pool.free_index(black_box(index));
        });
    });
}

criterion_group!(
    benches,
    bench_fill_and_drain,
    bench_scattered_reuse,
    bench_index_round_trip,
);
criterion_main!(benches);
