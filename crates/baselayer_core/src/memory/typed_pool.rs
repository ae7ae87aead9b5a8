//! # Typed Pool
//!
//! A [`Pool`] sized for one plain-old-data type.

use super::backing::REGION_ALIGN;
use super::pool::{BlockAddr, Pool};
use crate::error::PoolResult;
use bytemuck::Pod;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};

/// A pool whose blocks each hold one `T`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Pod, Zeroable)]
/// #[repr(C)]
/// struct Widget { key: u64, parent: u32, depth: u32 }
///
/// let mut widgets: TypedPool<Widget> = TypedPool::new(1000);
/// let addr = widgets.alloc(Widget { key: 7, parent: 0, depth: 1 })?;
/// widgets.get_mut(addr)?.depth += 1;
/// widgets.free(addr);
/// ```
pub struct TypedPool<T: Pod> {
    /// Untyped block storage.
    pool: Pool<'static>,
    /// Marker for T.
    _phantom: PhantomData<T>,
}

impl<T: Pod> TypedPool<T> {
    /// Creates a pool of `block_count` values.
    ///
    /// # Panics
    ///
    /// Panics if `T` needs stricter alignment than pool blocks provide, or
    /// if `block_count` is less than two.
    #[must_use]
    pub fn new(block_count: u32) -> Self {
        assert!(
            align_of::<T>() <= REGION_ALIGN,
            "typed pool alignment {} exceeds {REGION_ALIGN}",
            align_of::<T>()
        );
        Self {
            pool: Pool::create(size_of::<T>(), block_count),
            _phantom: PhantomData,
        }
    }

    /// Stores `value` in a fresh block.
    ///
    /// # Returns
    ///
    /// The block address, or None if the pool is exhausted.
    pub fn alloc(&mut self, value: T) -> Option<BlockAddr> {
        let addr = self.pool.allocate()?;
        if let Ok(block) = self.pool.block_mut(addr) {
            block[..size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
        }
        Some(addr)
    }

    /// Gets the value in an allocated block.
    #[must_use]
    pub fn get(&self, addr: BlockAddr) -> Option<&T> {
        let block = self.pool.block(addr).ok()?;
        bytemuck::try_from_bytes(&block[..size_of::<T>()]).ok()
    }

    /// Gets the value in an allocated block mutably.
    pub fn get_mut(&mut self, addr: BlockAddr) -> Option<&mut T> {
        let block = self.pool.block_mut(addr).ok()?;
        bytemuck::try_from_bytes_mut(&mut block[..size_of::<T>()]).ok()
    }

    /// Frees a block, aborting on an invalid address.
    ///
    /// # Panics
    ///
    /// Panics as [`Pool::free`].
    pub fn free(&mut self, addr: BlockAddr) {
        self.pool.free(addr);
    }

    /// Frees a block, reporting an invalid address.
    ///
    /// # Errors
    ///
    /// As [`Pool::try_free`].
    pub fn try_free(&mut self, addr: BlockAddr) -> PoolResult<()> {
        self.pool.try_free(addr)
    }

    /// Returns the number of live values.
    #[inline]
    #[must_use]
    pub const fn occupancy(&self) -> u32 {
        self.pool.occupancy()
    }

    /// Returns the maximum number of values.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.pool.block_count()
    }

    /// Returns the untyped pool.
    #[inline]
    #[must_use]
    pub const fn inner(&self) -> &Pool<'static> {
        &self.pool
    }
}
