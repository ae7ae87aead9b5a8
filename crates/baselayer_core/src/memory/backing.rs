//! # Memory Backing
//!
//! The reserve / commit / unmap triple an [`Arena`](super::Arena) sits on.
//!
//! A backing reserves a span of address space up front and commits it in
//! increasing prefixes. Only the committed prefix is addressable. Dropping the
//! backing releases the whole reservation.

use crate::error::{BackingError, BackingResult};
use memmap2::MmapMut;

/// Alignment guaranteed for the first byte of every backing region.
pub const REGION_ALIGN: usize = 8;

/// A reserved memory span that is committed front to back.
pub trait Backing {
    /// Reserves `bytes` of address space without committing any of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the span cannot be reserved.
    fn reserve(bytes: usize) -> BackingResult<Self>
    where
        Self: Sized;

    /// Returns the size of the reservation in bytes.
    fn reserved(&self) -> usize;

    /// Returns the size of the committed prefix in bytes.
    fn committed(&self) -> usize;

    /// Extends the committed prefix by `bytes`. Newly committed memory is zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`BackingError::ExceedsReservation`] if the prefix would grow
    /// past the reservation.
    fn commit(&mut self, bytes: usize) -> BackingResult<()>;

    /// Returns the committed prefix.
    fn bytes(&self) -> &[u8];

    /// Returns the committed prefix mutably.
    fn bytes_mut(&mut self) -> &mut [u8];
}

/// Checks that growing `committed` by `bytes` stays inside `reserved`.
fn checked_commit(committed: usize, bytes: usize, reserved: usize) -> BackingResult<usize> {
    match committed.checked_add(bytes) {
        Some(total) if total <= reserved => Ok(total),
        _ => Err(BackingError::ExceedsReservation {
            requested: committed.saturating_add(bytes),
            reserved,
        }),
    }
}

/// Heap backing: the reservation is a bookkeeping limit and commits grow a
/// word-aligned buffer.
#[derive(Debug, Default)]
pub struct HeapBacking {
    /// Committed storage, in words so the base is [`REGION_ALIGN`]-aligned.
    words: Vec<u64>,
    /// Reserved bytes.
    reserved: usize,
    /// Committed bytes.
    committed: usize,
}

impl HeapBacking {
    /// Reserves `bytes` of heap budget. Never fails: nothing is allocated
    /// until the first commit.
    #[must_use]
    pub const fn new(bytes: usize) -> Self {
        Self {
            words: Vec::new(),
            reserved: bytes,
            committed: 0,
        }
    }
}

impl Backing for HeapBacking {
    fn reserve(bytes: usize) -> BackingResult<Self> {
        Ok(Self::new(bytes))
    }

    #[inline]
    fn reserved(&self) -> usize {
        self.reserved
    }

    #[inline]
    fn committed(&self) -> usize {
        self.committed
    }

    fn commit(&mut self, bytes: usize) -> BackingResult<()> {
        let total = checked_commit(self.committed, bytes, self.reserved)?;
        self.words.resize(total.div_ceil(REGION_ALIGN), 0);
        self.committed = total;
        Ok(())
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.committed]
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.committed]
    }
}

/// Anonymous memory map backing: the whole span is mapped at reservation and
/// the operating system supplies pages on first touch, so committing is
/// bookkeeping only.
#[derive(Debug)]
pub struct MmapBacking {
    /// The mapping covering the whole reservation.
    map: MmapMut,
    /// Committed bytes.
    committed: usize,
}

impl Backing for MmapBacking {
    fn reserve(bytes: usize) -> BackingResult<Self> {
        if bytes == 0 {
            return Err(BackingError::EmptyReservation);
        }
        let map = MmapMut::map_anon(bytes)?;
        Ok(Self { map, committed: 0 })
    }

    #[inline]
    fn reserved(&self) -> usize {
        self.map.len()
    }

    #[inline]
    fn committed(&self) -> usize {
        self.committed
    }

    fn commit(&mut self, bytes: usize) -> BackingResult<()> {
        self.committed = checked_commit(self.committed, bytes, self.map.len())?;
        Ok(())
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        &self.map[..self.committed]
    }

    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.map[..self.committed]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_commit_grows_prefix() {
        let mut backing = HeapBacking::new(64);
        assert_eq!(backing.committed(), 0);
        assert!(backing.bytes().is_empty());

        backing.commit(10).unwrap();
        assert_eq!(backing.bytes().len(), 10);
        assert!(backing.bytes().iter().all(|&b| b == 0));

        backing.commit(54).unwrap();
        assert_eq!(backing.committed(), 64);
    }

    #[test]
    fn test_heap_commit_past_reservation() {
        let mut backing = HeapBacking::new(16);
        let err = backing.commit(17).unwrap_err();
        assert!(matches!(
            err,
            BackingError::ExceedsReservation { requested: 17, reserved: 16 }
        ));
        assert_eq!(backing.committed(), 0);
    }

    #[test]
    fn test_heap_base_is_word_aligned() {
        let mut backing = HeapBacking::new(128);
        backing.commit(128).unwrap();
        let addr = backing.bytes().as_ptr() as usize;
        assert_eq!(addr % REGION_ALIGN, 0);
    }

    #[test]
    fn test_mmap_reserve_and_commit() {
        let mut backing = MmapBacking::reserve(1 << 20).unwrap();
        assert_eq!(backing.reserved(), 1 << 20);
        assert_eq!(backing.committed(), 0);

        backing.commit(4096).unwrap();
        backing.bytes_mut()[4095] = 7;
        assert_eq!(backing.bytes()[4095], 7);
        assert!(backing.commit(1 << 20).is_err());
    }

    #[test]
    fn test_mmap_rejects_empty_reservation() {
        assert!(matches!(
            MmapBacking::reserve(0),
            Err(BackingError::EmptyReservation)
        ));
    }
}
