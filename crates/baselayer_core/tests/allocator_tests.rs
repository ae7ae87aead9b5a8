//! # Allocator Integration Tests
//!
//! End-to-end checks of arenas and pools through the public API.
//!
//! Run with: cargo test --package baselayer_core --test allocator_tests

use baselayer_core::memory::{ARENA_COMMIT_CHUNK, MIN_BLOCK_SIZE};
use baselayer_core::{Arena, BaselayerConfig, BlockAddr, MmapBacking, Pool, PoolError};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// ARENA
// ============================================================================

#[test]
fn test_arena_monotonicity() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_a4e4);
    let mut arena = Arena::new();
    let mut expected = 0;

    for _ in 0..500 {
        let len = rng.gen_range(0..4096);
        let before = arena.committed();
        let slice = arena.alloc(len);
        expected += len;

        assert_eq!(slice.len(), len);
        assert_eq!(arena.used(), expected);
        assert!(arena.committed() >= before);
        assert!(arena.committed() >= arena.used());
        assert_eq!(arena.committed() % ARENA_COMMIT_CHUNK, 0);
    }
}

#[test]
fn test_arena_release_in_lifo_order() {
    let mut arena = Arena::new();
    let outer = arena.push(b"outer");
    let inner = arena.alloc(100);
    arena.release(inner.len());
    assert_eq!(arena.used(), outer.end());
    assert_eq!(arena.bytes(outer), b"outer");
}

#[test]
fn test_mmap_arena_matches_heap_arena() {
    let mut heap = Arena::new();
    let mut mapped = Arena::<MmapBacking>::create(0).unwrap();

    for len in [1, 17, 4096, 20_000] {
        let a = heap.alloc(len);
        let b = mapped.alloc(len);
        assert_eq!(a, b);
    }
    assert_eq!(heap.used(), mapped.used());
    assert_eq!(heap.committed(), mapped.committed());
}

#[test]
#[should_panic(expected = "fixed arena")]
fn test_fixed_arena_overflow_aborts() {
    let mut arena = Arena::fixed(64);
    arena.alloc(60);
    arena.alloc(8);
}

#[test]
fn test_arena_from_config() {
    let config = BaselayerConfig::from_toml_str(
        r#"
        [arena]
        reserve_bytes = 1048576
        commit_chunk = 4096
        "#,
    )
    .unwrap();
    let mut arena = Arena::<MmapBacking>::with_config(&config.arena).unwrap();
    arena.alloc(5000);
    assert_eq!(arena.committed(), 8192);
    assert_eq!(arena.reserved(), 1_048_576);
}

// ============================================================================
// POOL
// ============================================================================

#[test]
fn test_pool_concrete_scenario() {
    let mut pool = Pool::create(64, 4);
    assert_eq!(pool.block_size(), 128);

    let blocks: Vec<BlockAddr> = (0..4).map(|_| pool.allocate().unwrap()).collect();
    assert!(pool.allocate().is_none());

    pool.free(blocks[1]);
    let reused = pool.allocate().unwrap();
    assert_eq!(reused, blocks[1]);
    assert_eq!(pool.occupancy(), 4);
}

#[test]
fn test_pool_round_trip_any_order() {
    let mut rng = ChaCha8Rng::seed_from_u64(980_250_771);
    let count = 257;
    let mut pool = Pool::create(40, count);

    for _ in 0..3 {
        let mut blocks: Vec<BlockAddr> = (0..count).map(|_| pool.allocate().unwrap()).collect();
        assert!(pool.allocate().is_none());
        assert_eq!(pool.occupancy(), count);

        blocks.shuffle(&mut rng);
        for block in blocks {
            pool.free(block);
        }
        assert_eq!(pool.occupancy(), 0);
        assert_eq!(pool.free_count(), count);
    }
}

#[test]
fn test_pool_random_alloc_free() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xb10c_b10c);
    let mut pool = Pool::create(MIN_BLOCK_SIZE, 64);
    let mut live: Vec<(BlockAddr, u8)> = Vec::new();

    for step in 0..5_000u32 {
        if live.is_empty() || (rng.gen_bool(0.55) && pool.free_count() > 0) {
            let addr = pool.allocate().unwrap();
            assert!(pool.block(addr).unwrap().iter().all(|&b| b == 0));
            let stamp = (step % 251) as u8;
            pool.block_mut(addr).unwrap().fill(stamp);
            live.push((addr, stamp));
        } else {
            let (addr, stamp) = live.swap_remove(rng.gen_range(0..live.len()));
            assert!(pool.block(addr).unwrap().iter().all(|&b| b == stamp));
            pool.free(addr);
        }
        assert_eq!(pool.occupancy() as usize, live.len());
    }
}

#[test]
fn test_pool_free_safety() {
    let mut pool = Pool::create(64, 8);
    let other = Pool::create(64, 8);
    let addr = pool.allocate().unwrap();

    pool.free(addr);
    assert!(!pool.free_with(addr, false));
    assert!(matches!(pool.try_free(addr), Err(PoolError::NotAllocated { index: 0 })));

    let misaligned = BlockAddr::new(pool.tag(), addr.offset() + 1);
    assert!(matches!(pool.try_free(misaligned), Err(PoolError::Misaligned { .. })));

    let past_end = BlockAddr::new(pool.tag(), 8 * pool.block_size());
    assert!(matches!(pool.try_free(past_end), Err(PoolError::OutOfBounds { .. })));

    let foreign = BlockAddr::new(other.tag(), 0);
    assert!(matches!(pool.try_free(foreign), Err(PoolError::ForeignAddress { .. })));
    assert_eq!(pool.occupancy(), 0);
}

#[test]
#[should_panic(expected = "pool free rejected")]
fn test_pool_strict_double_free_aborts() {
    let mut pool = Pool::create(64, 2);
    let addr = pool.allocate().unwrap();
    pool.free(addr);
    pool.free(addr);
}

#[test]
fn test_pools_share_one_arena() {
    let mut arena = Arena::new();
    {
        let mut small = Pool::create_in(&mut arena, 16, 32);
        let addr = small.allocate().unwrap();
        assert_eq!(small.pointer_to_index(addr), 1);
        assert_eq!(small.index_to_pointer(1), Some(addr));
    }
    let used = arena.used();
    {
        let mut large = Pool::create_in(&mut arena, 1000, 4);
        assert_eq!(large.block_size(), 1024);
        assert_eq!(large.allocate_index(), 1);
    }
    assert_eq!(arena.used(), used + 4 * 1024);
}
