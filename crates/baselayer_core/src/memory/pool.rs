//! # Pool Allocator
//!
//! Fixed-size block allocator for objects that are frequently allocated and freed.
//!
//! Blocks are threaded onto a free list at creation. Allocation pops the list
//! head, freeing pushes the block back, both O(1). Frees are audited: every
//! block carries an out-of-line [`BlockState`], and every address carries the
//! tag of the pool that issued it, so double frees and foreign addresses are
//! detected without trusting the block contents.
//!
//! Block indices handed to callers are 1-based; index 0 is the null sentinel.

use super::arena::{Arena, ArenaSlice};
use super::backing::{Backing, REGION_ALIGN};
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Block size granularity.
pub const MIN_BLOCK_SIZE: usize = 64;

/// Source of per-instance pool tags.
static NEXT_POOL_TAG: AtomicU64 = AtomicU64::new(1);

/// Rounds a requested block size up to the next step of `granularity`.
///
/// A request that is already a multiple still gains one step, so a 64-byte
/// request becomes a 128-byte block.
#[inline]
#[must_use]
pub const fn round_block_size(block_size_min: usize, granularity: usize) -> usize {
    granularity * (block_size_min / granularity + 1)
}

/// Address of a block inside a pool.
///
/// Carries the tag of the issuing pool and the byte offset from the start of
/// the pool region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockAddr {
    pool: u64,
    offset: usize,
}

impl BlockAddr {
    /// Builds an address from a pool tag and a byte offset.
    ///
    /// Nothing is validated here; pools validate on use.
    #[inline]
    #[must_use]
    pub const fn new(pool: u64, offset: usize) -> Self {
        Self { pool, offset }
    }

    /// Tag of the pool this address claims to come from.
    #[inline]
    #[must_use]
    pub const fn pool(self) -> u64 {
        self.pool
    }

    /// Byte offset from the start of the pool region.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }
}

/// Liveness of a single block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockState {
    /// On the free list, linked to the next free block.
    Free {
        /// Zero-based number of the next free block.
        next: Option<u32>,
    },
    /// Handed out.
    Allocated,
}

/// Memory behind a pool.
enum PoolRegion<'a> {
    /// Reserved and committed by the pool itself.
    Reserved {
        /// Fixed arena holding the blocks.
        arena: Arena,
        /// Span of the blocks inside the arena.
        span: ArenaSlice,
    },
    /// Carved out of a caller's arena.
    Carved(&'a mut [u8]),
}

impl PoolRegion<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Reserved { arena, span } => arena.bytes(*span),
            Self::Carved(bytes) => bytes,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Reserved { arena, span } => arena.bytes_mut(*span),
            Self::Carved(bytes) => bytes,
        }
    }
}

/// A pool of equally sized blocks.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = Pool::create(48, 1000);
///
/// // Allocate - O(1), zeroed block
/// let block = pool.allocate().expect("pool exhausted");
///
/// // Free - O(1), audited
/// pool.free(block);
///
/// // Speculative free reports instead of aborting
/// assert!(pool.try_free(block).is_err());
/// ```
pub struct Pool<'a> {
    /// Block storage.
    region: PoolRegion<'a>,
    /// Size of each block in bytes.
    block_size: usize,
    /// Number of blocks.
    block_count: u32,
    /// Number of allocated blocks.
    occupancy: u32,
    /// Identity of this instance.
    tag: u64,
    /// Per-block liveness and free links.
    states: Box<[BlockState]>,
    /// First free block.
    free_head: Option<u32>,
}

impl Pool<'static> {
    /// Creates a pool over its own reserved region.
    ///
    /// # Arguments
    ///
    /// * `block_size_min` - Smallest acceptable block size, rounded up to [`MIN_BLOCK_SIZE`]
    /// * `block_count` - Number of blocks
    ///
    /// # Panics
    ///
    /// Panics if `block_count` is less than two.
    #[must_use]
    pub fn create(block_size_min: usize, block_count: u32) -> Self {
        Self::create_with_granularity(block_size_min, block_count, MIN_BLOCK_SIZE)
    }

    /// Creates a pool using the block granularity from configuration.
    ///
    /// # Panics
    ///
    /// Panics if `block_count` is less than two.
    #[must_use]
    pub fn from_config(config: &PoolConfig, block_size_min: usize, block_count: u32) -> Self {
        Self::create_with_granularity(block_size_min, block_count, config.min_block_size)
    }

    fn create_with_granularity(block_size_min: usize, block_count: u32, granularity: usize) -> Self {
        let block_size = round_block_size(block_size_min, granularity);
        let total = block_size * block_count as usize;
        let mut arena = Arena::fixed(total);
        let span = arena.alloc(total);
        Self::build(PoolRegion::Reserved { arena, span }, block_size, block_count)
    }
}

impl<'a> Pool<'a> {
    /// Creates a pool whose blocks are carved out of `arena`.
    ///
    /// The arena stays borrowed for the lifetime of the pool.
    ///
    /// # Panics
    ///
    /// Panics if `block_count` is less than two, or if the arena cannot
    /// provide the region.
    pub fn create_in<B: Backing>(
        arena: &'a mut Arena<B>,
        block_size_min: usize,
        block_count: u32,
    ) -> Self {
        let block_size = round_block_size(block_size_min, MIN_BLOCK_SIZE);
        let bytes = arena.carve(block_size * block_count as usize, REGION_ALIGN);
        Self::build(PoolRegion::Carved(bytes), block_size, block_count)
    }

    fn build(region: PoolRegion<'a>, block_size: usize, block_count: u32) -> Self {
        assert!(block_count > 1, "pool needs at least two blocks, got {block_count}");

        let tag = NEXT_POOL_TAG.fetch_add(1, Ordering::Relaxed);
        let mut pool = Self {
            region,
            block_size,
            block_count,
            occupancy: 0,
            tag,
            states: vec![BlockState::Allocated; block_count as usize].into_boxed_slice(),
            free_head: None,
        };
        pool.thread_free_list();

        debug!(tag, block_size, block_count, "pool created");
        pool
    }

    /// Returns the block size in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of blocks.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Returns the number of allocated blocks.
    #[inline]
    #[must_use]
    pub const fn occupancy(&self) -> u32 {
        self.occupancy
    }

    /// Returns the number of free blocks.
    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> u32 {
        self.block_count - self.occupancy
    }

    /// Returns the identity tag carried by every address of this pool.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> u64 {
        self.tag
    }

    /// Allocates a zeroed block.
    ///
    /// This is a **O(1)** operation.
    ///
    /// # Returns
    ///
    /// The block address, or None if the pool is exhausted.
    pub fn allocate(&mut self) -> Option<BlockAddr> {
        let Some(index) = self.free_head else {
            trace!(tag = self.tag, "pool exhausted");
            return None;
        };
        let BlockState::Free { next } = self.states[index as usize] else {
            unreachable!("pool free list reached allocated block {index}");
        };

        self.free_head = next;
        self.states[index as usize] = BlockState::Allocated;
        let range = self.block_range(index as usize);
        self.region.bytes_mut()[range].fill(0);
        self.occupancy += 1;

        Some(BlockAddr::new(self.tag, index as usize * self.block_size))
    }

    /// Allocates a block and returns its 1-based index, or 0 if exhausted.
    pub fn allocate_index(&mut self) -> u32 {
        self.allocate()
            .map_or(0, |addr| self.pointer_to_index(addr))
    }

    /// Frees a block, aborting on an invalid address.
    ///
    /// # Panics
    ///
    /// Panics if the address is foreign, out of range, misaligned, or not
    /// currently allocated.
    pub fn free(&mut self, addr: BlockAddr) {
        if let Err(err) = self.try_free(addr) {
            panic!("pool free rejected: {err}");
        }
    }

    /// Frees a block, reporting an invalid address instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns the [`PoolError`] describing why the address was rejected.
    /// The pool is unchanged on error.
    pub fn try_free(&mut self, addr: BlockAddr) -> PoolResult<()> {
        let index = match self.allocated_index(addr) {
            Ok(index) => index,
            Err(err) => {
                debug!(tag = self.tag, offset = addr.offset(), %err, "pool free rejected");
                return Err(err);
            }
        };

        self.states[index] = BlockState::Free {
            next: self.free_head,
        };
        self.free_head = Some(index as u32);
        self.occupancy -= 1;
        Ok(())
    }

    /// Frees a block in strict (abort) or lenient (report) mode.
    ///
    /// # Returns
    ///
    /// True if the block was freed. Always true in strict mode, which aborts
    /// instead of returning false.
    pub fn free_with(&mut self, addr: BlockAddr, strict: bool) -> bool {
        if strict {
            self.free(addr);
            true
        } else {
            self.try_free(addr).is_ok()
        }
    }

    /// Frees the block with a 1-based index.
    ///
    /// # Panics
    ///
    /// Panics on index 0, an index past the pool, or a block that is not
    /// allocated.
    pub fn free_index(&mut self, index: u32) {
        match self.index_to_pointer(index) {
            Some(addr) => self.free(addr),
            None => panic!("pool free of null index"),
        }
    }

    /// Returns true if `addr` names a block of this pool, allocated or not.
    #[must_use]
    pub fn check_address(&self, addr: BlockAddr) -> bool {
        self.locate(addr).is_ok()
    }

    /// Converts an address to its 1-based block index, or 0 if the address
    /// does not name a block of this pool.
    #[must_use]
    pub fn pointer_to_index(&self, addr: BlockAddr) -> u32 {
        self.locate(addr).map_or(0, |index| index as u32 + 1)
    }

    /// Converts a 1-based block index to an address. Index 0 maps to None.
    ///
    /// # Panics
    ///
    /// Panics if `index` exceeds the block count.
    #[must_use]
    pub fn index_to_pointer(&self, index: u32) -> Option<BlockAddr> {
        assert!(
            index <= self.block_count,
            "pool index {index} out of range for {} blocks",
            self.block_count
        );
        if index == 0 {
            return None;
        }
        Some(BlockAddr::new(
            self.tag,
            (index - 1) as usize * self.block_size,
        ))
    }

    /// Returns the bytes of an allocated block.
    ///
    /// # Errors
    ///
    /// Returns a [`PoolError`] if the address is not an allocated block of
    /// this pool.
    pub fn block(&self, addr: BlockAddr) -> PoolResult<&[u8]> {
        let index = self.allocated_index(addr)?;
        Ok(&self.region.bytes()[self.block_range(index)])
    }

    /// Returns the bytes of an allocated block mutably.
    ///
    /// # Errors
    ///
    /// Returns a [`PoolError`] if the address is not an allocated block of
    /// this pool.
    pub fn block_mut(&mut self, addr: BlockAddr) -> PoolResult<&mut [u8]> {
        let index = self.allocated_index(addr)?;
        let range = self.block_range(index);
        Ok(&mut self.region.bytes_mut()[range])
    }

    /// Iterates over the addresses of allocated blocks in region order.
    pub fn allocated(&self) -> impl Iterator<Item = BlockAddr> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == BlockState::Allocated)
            .map(|(index, _)| BlockAddr::new(self.tag, index * self.block_size))
    }

    /// Returns every block to the free list.
    pub fn clear(&mut self) {
        self.thread_free_list();
        self.occupancy = 0;
    }

    /// Links all blocks in region order: block 0 is allocated first.
    fn thread_free_list(&mut self) {
        let count = self.block_count;
        for (index, state) in (0..count).zip(self.states.iter_mut()) {
            let next = (index + 1 < count).then_some(index + 1);
            *state = BlockState::Free { next };
        }
        self.free_head = Some(0);
    }

    /// Resolves an address to a zero-based block number.
    fn locate(&self, addr: BlockAddr) -> PoolResult<usize> {
        if addr.pool() != self.tag {
            return Err(PoolError::ForeignAddress {
                expected: self.tag,
                found: addr.pool(),
            });
        }
        let limit = self.block_size * self.block_count as usize;
        if addr.offset() >= limit {
            return Err(PoolError::OutOfBounds {
                offset: addr.offset(),
                limit,
            });
        }
        if addr.offset() % self.block_size != 0 {
            return Err(PoolError::Misaligned {
                offset: addr.offset(),
                block_size: self.block_size,
            });
        }
        Ok(addr.offset() / self.block_size)
    }

    /// Resolves an address that must currently be allocated.
    fn allocated_index(&self, addr: BlockAddr) -> PoolResult<usize> {
        let index = self.locate(addr)?;
        match self.states[index] {
            BlockState::Allocated => Ok(index),
            BlockState::Free { .. } => Err(PoolError::NotAllocated { index }),
        }
    }

    #[inline]
    fn block_range(&self, index: usize) -> Range<usize> {
        let start = index * self.block_size;
        start..start + self.block_size
    }
}
