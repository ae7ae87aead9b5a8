//! # Arena Allocator
//!
//! A bump allocator over a reserved region that commits memory lazily.
//!
//! Growable arenas reserve a large span (1 GiB by default) and commit it in
//! whole chunks as `used` advances. Fixed arenas commit their full capacity
//! up front and never grow.

use super::backing::{Backing, HeapBacking, REGION_ALIGN};
use crate::config::ArenaConfig;
use crate::error::BackingResult;
use std::fmt;
use std::ops::Range;
use tracing::debug;

/// Default reservation for a growable arena.
pub const ARENA_RESERVE_SIZE: usize = 1024 * 1024 * 1024;

/// Commit granularity for a growable arena.
pub const ARENA_COMMIT_CHUNK: usize = 16 * 1024;

/// Handle to a run of bytes handed out by an [`Arena`].
///
/// Handles stay meaningful until the arena is released past them or cleared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArenaSlice {
    offset: usize,
    len: usize,
}

impl ArenaSlice {
    /// Byte offset from the start of the arena.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.len
    }

    /// Returns true for a zero-length slice.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    /// Offset one past the last byte.
    #[inline]
    #[must_use]
    pub const fn end(self) -> usize {
        self.offset + self.len
    }

    /// The byte range covered in the arena.
    #[inline]
    #[must_use]
    pub const fn range(self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Snapshot of an arena's counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    /// Reserved bytes.
    pub reserved: usize,
    /// Committed bytes.
    pub committed: usize,
    /// Used bytes.
    pub used: usize,
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arena reserved/committed/used: {} {} {}",
            self.reserved, self.committed, self.used
        )
    }
}

/// A bump-pointer arena allocator.
///
/// Allocations bump `used`. Memory is reclaimed only by [`release`](Self::release)
/// (LIFO), [`clear`](Self::clear), or dropping the arena, which releases the
/// whole reservation.
///
/// Invariant: `used <= committed <= reserved`.
///
/// # Thread Safety
///
/// This arena is NOT thread-safe. Use one arena per thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = Arena::new();
///
/// let name = arena.push(b"block-a");
/// assert_eq!(arena.bytes(name), b"block-a");
///
/// // Rewind everything
/// arena.clear();
/// ```
pub struct Arena<B: Backing = HeapBacking> {
    /// Reserved region.
    backing: B,
    /// Bytes handed out.
    used: usize,
    /// Capacity of a fixed arena.
    fixed_size: Option<usize>,
    /// Commit granularity of a growable arena.
    commit_chunk: usize,
}

impl Arena<HeapBacking> {
    /// Creates a growable heap-backed arena with the default reservation.
    #[must_use]
    pub fn new() -> Self {
        Self::from_backing(
            HeapBacking::new(ARENA_RESERVE_SIZE),
            None,
            ARENA_COMMIT_CHUNK,
        )
    }

    /// Creates a heap-backed arena that commits exactly `fixed_size` bytes
    /// and never grows.
    ///
    /// # Arguments
    ///
    /// * `fixed_size` - Capacity in bytes
    #[must_use]
    pub fn fixed(fixed_size: usize) -> Self {
        Self::from_backing(HeapBacking::new(fixed_size), Some(fixed_size), ARENA_COMMIT_CHUNK)
    }
}

impl Default for Arena<HeapBacking> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backing> Arena<B> {
    /// Creates an arena on a freshly reserved backing.
    ///
    /// A `fixed_size` of zero creates a growable arena over the default
    /// reservation; any other value creates a fixed arena of that capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing cannot reserve the span.
    pub fn create(fixed_size: usize) -> BackingResult<Self> {
        if fixed_size > 0 {
            Ok(Self::from_backing(B::reserve(fixed_size)?, Some(fixed_size), ARENA_COMMIT_CHUNK))
        } else {
            Ok(Self::from_backing(B::reserve(ARENA_RESERVE_SIZE)?, None, ARENA_COMMIT_CHUNK))
        }
    }

    /// Creates a growable arena using the reservation and chunk size from
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing cannot reserve the span.
    pub fn with_config(config: &ArenaConfig) -> BackingResult<Self> {
        let backing = B::reserve(config.reserve_bytes)?;
        Ok(Self::from_backing(backing, None, config.commit_chunk))
    }

    /// Wraps an already reserved backing and commits the initial chunk (or
    /// the full capacity of a fixed arena).
    ///
    /// # Panics
    ///
    /// Panics if the initial commit does not fit the reservation.
    #[must_use]
    pub fn from_backing(backing: B, fixed_size: Option<usize>, commit_chunk: usize) -> Self {
        assert!(commit_chunk > 0, "arena commit chunk must be non-zero");

        let mut arena = Self {
            backing,
            used: 0,
            fixed_size,
            commit_chunk,
        };
        let initial = fixed_size.unwrap_or(commit_chunk);
        arena.commit(initial);

        debug!(
            reserved = arena.reserved(),
            committed = arena.committed(),
            fixed = fixed_size.is_some(),
            "arena created"
        );
        arena
    }

    /// Returns the reserved bytes.
    #[inline]
    #[must_use]
    pub fn reserved(&self) -> usize {
        self.backing.reserved()
    }

    /// Returns the committed bytes.
    #[inline]
    #[must_use]
    pub fn committed(&self) -> usize {
        self.backing.committed()
    }

    /// Returns the used bytes.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Returns the committed bytes not yet handed out.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.committed() - self.used
    }

    /// Returns true if the arena was created with a fixed capacity.
    #[inline]
    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        self.fixed_size.is_some()
    }

    /// Returns the commit granularity.
    #[inline]
    #[must_use]
    pub const fn commit_chunk(&self) -> usize {
        self.commit_chunk
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            reserved: self.reserved(),
            committed: self.committed(),
            used: self.used,
        }
    }

    /// Allocates `len` zeroed bytes.
    ///
    /// # Panics
    ///
    /// Panics if a fixed arena would exceed its capacity, or a growable arena
    /// its reservation.
    pub fn alloc(&mut self, len: usize) -> ArenaSlice {
        let slice = self.alloc_dirty(len);
        self.backing.bytes_mut()[slice.range()].fill(0);
        slice
    }

    /// Allocates `len` bytes without zeroing them. The bytes hold whatever
    /// a released or cleared allocation left behind.
    ///
    /// # Panics
    ///
    /// Panics if a fixed arena would exceed its capacity, or a growable arena
    /// its reservation.
    pub fn alloc_dirty(&mut self, len: usize) -> ArenaSlice {
        self.grow_for(len);
        let slice = ArenaSlice {
            offset: self.used,
            len,
        };
        self.used += len;
        slice
    }

    /// Allocates `len` zeroed bytes starting at a multiple of `align`.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two no larger than the region
    /// alignment, or on capacity exhaustion as for [`alloc`](Self::alloc).
    pub fn alloc_aligned(&mut self, len: usize, align: usize) -> ArenaSlice {
        assert!(
            align.is_power_of_two() && align <= REGION_ALIGN,
            "arena alignment must be a power of two up to {REGION_ALIGN}, got {align}"
        );
        let padding = self.used.wrapping_neg() & (align - 1);
        if padding > 0 {
            self.alloc_dirty(padding);
        }
        self.alloc(len)
    }

    /// Allocates a copy of `data`.
    pub fn push(&mut self, data: &[u8]) -> ArenaSlice {
        let slice = self.alloc_dirty(data.len());
        self.backing.bytes_mut()[slice.range()].copy_from_slice(data);
        slice
    }

    /// Allocates `len` zeroed, `align`-aligned bytes and lends them out for
    /// as long as the arena stays borrowed. Structures carved this way cannot
    /// outlive the arena.
    pub fn carve(&mut self, len: usize, align: usize) -> &mut [u8] {
        let slice = self.alloc_aligned(len, align);
        &mut self.backing.bytes_mut()[slice.range()]
    }

    /// Rewinds `used` by `len`. Callers release in LIFO order.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the used bytes.
    pub fn release(&mut self, len: usize) {
        assert!(
            len <= self.used,
            "arena release of {len} bytes exceeds {} used",
            self.used
        );
        self.used -= len;
    }

    /// Resets `used` to zero without decommitting.
    #[inline]
    pub fn clear(&mut self) {
        self.used = 0;
    }

    /// Commits ahead so at least `space` bytes follow `used`, without
    /// advancing `used`.
    ///
    /// # Panics
    ///
    /// Panics if a fixed arena cannot provide the space.
    pub fn ensure_space(&mut self, space: usize) {
        self.grow_for(space);
    }

    /// The committed bytes following `used`, for writing in place before
    /// claiming them with [`claim`](Self::claim).
    #[inline]
    pub fn spare_mut(&mut self) -> &mut [u8] {
        let used = self.used;
        &mut self.backing.bytes_mut()[used..]
    }

    /// Advances `used` over `len` bytes already written through
    /// [`spare_mut`](Self::spare_mut).
    ///
    /// # Panics
    ///
    /// Panics if fewer than `len` committed bytes remain.
    pub fn claim(&mut self, len: usize) -> ArenaSlice {
        assert!(
            len <= self.remaining(),
            "arena claim of {len} bytes exceeds {} committed spare",
            self.remaining()
        );
        let slice = ArenaSlice {
            offset: self.used,
            len,
        };
        self.used += len;
        slice
    }

    /// Returns the bytes behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle lies outside committed memory.
    #[inline]
    #[must_use]
    pub fn bytes(&self, slice: ArenaSlice) -> &[u8] {
        &self.backing.bytes()[slice.range()]
    }

    /// Returns the bytes behind a handle mutably.
    ///
    /// # Panics
    ///
    /// Panics if the handle lies outside committed memory.
    #[inline]
    pub fn bytes_mut(&mut self, slice: ArenaSlice) -> &mut [u8] {
        &mut self.backing.bytes_mut()[slice.range()]
    }

    /// Returns every used byte, from offset zero to `used`.
    #[inline]
    #[must_use]
    pub fn used_bytes(&self) -> &[u8] {
        &self.backing.bytes()[..self.used]
    }

    /// Releases the reservation.
    pub fn destroy(self) {
        debug!(reserved = self.reserved(), "arena destroyed");
    }

    /// Makes sure `len` bytes fit after `used`, committing whole chunks.
    fn grow_for(&mut self, len: usize) {
        let committed = self.committed();
        let needed = self.used.checked_add(len).unwrap_or(usize::MAX);
        if needed <= committed {
            return;
        }

        if let Some(fixed_size) = self.fixed_size {
            panic!(
                "fixed arena of {fixed_size} bytes exceeded: {} used, {len} requested",
                self.used
            );
        }

        let shortfall = needed - committed;
        let mut amount = (shortfall / self.commit_chunk + 1) * self.commit_chunk;
        let headroom = self.reserved() - committed;
        if amount > headroom && shortfall <= headroom {
            amount = headroom;
        }
        self.commit(amount);
        debug!(committed = self.committed(), used = self.used, "arena grew");
    }

    fn commit(&mut self, bytes: usize) {
        if let Err(err) = self.backing.commit(bytes) {
            panic!("arena commit of {bytes} bytes failed: {err}");
        }
    }
}

impl<B: Backing> fmt::Debug for Arena<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("reserved", &self.reserved())
            .field("committed", &self.committed())
            .field("used", &self.used)
            .field("fixed_size", &self.fixed_size)
            .finish()
    }
}
