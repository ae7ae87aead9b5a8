//! # Address Hash Map
//!
//! Fixed-capacity `u64 -> u64` table with collision chains threaded through
//! the slot array itself.
//!
//! ## Layout
//!
//! Each slot holds `{key, value, link}`. Key 0 marks an empty slot. `link`
//! stores the index of the next record in the chain plus one, so an all-zero
//! slot is both empty and the end of a chain.
//!
//! ## Invariants
//!
//! - A non-empty chain starts in its home slot (`key % slot_count`).
//! - Every record on a chain shares that chain's home slot.
//! - A key appears at most once.
//!
//! A new key whose home slot is occupied by a record from another chain (an
//! intruder) evicts the intruder to a free slot and takes its home. Removing
//! a chain head pulls its successor into the home slot.

use crate::error::{MapError, MapResult};
use crate::hash::hash_string;
use baselayer_core::memory::{Arena, Backing};
use baselayer_core::MapConfig;
use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::mem::{align_of, size_of};
use std::ops::{Deref, DerefMut};
use tracing::{debug, trace, warn};

/// Key substituted when a string hashes to zero, which is reserved for
/// empty slots.
pub const ZERO_HASH_KEY: u64 = u64::MAX;

/// Maps a byte string to a non-zero map key.
#[inline]
#[must_use]
pub fn string_key(bytes: &[u8]) -> u64 {
    match hash_string(bytes) {
        0 => ZERO_HASH_KEY,
        hash => hash,
    }
}

/// One record of the slot array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Slot {
    key: u64,
    value: u64,
    /// Next chain index plus one; 0 ends the chain.
    link: u64,
}

impl Slot {
    /// The empty, chain-terminating slot.
    pub const EMPTY: Self = Self {
        key: 0,
        value: 0,
        link: 0,
    };

    #[inline]
    const fn new(key: u64, value: u64) -> Self {
        Self {
            key,
            value,
            link: 0,
        }
    }

    /// Stored key, 0 when empty.
    #[inline]
    #[must_use]
    pub const fn key(self) -> u64 {
        self.key
    }

    /// Stored value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.value
    }

    /// Returns true if no record is stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.key == 0
    }

    /// Index of the next record in this chain.
    #[inline]
    #[must_use]
    pub fn next(self) -> Option<usize> {
        self.link.checked_sub(1).map(|index| index as usize)
    }

    #[inline]
    fn set_next(&mut self, next: Option<usize>) {
        self.link = next.map_or(0, |index| index as u64 + 1);
    }
}

/// Slot array, owned or carved from an arena.
enum SlotArray<'a> {
    Owned(Box<[Slot]>),
    Carved(&'a mut [Slot]),
}

impl Deref for SlotArray<'_> {
    type Target = [Slot];

    fn deref(&self) -> &[Slot] {
        match self {
            Self::Owned(slots) => slots,
            Self::Carved(slots) => slots,
        }
    }
}

impl DerefMut for SlotArray<'_> {
    fn deref_mut(&mut self) -> &mut [Slot] {
        match self {
            Self::Owned(slots) => slots,
            Self::Carved(slots) => slots,
        }
    }
}

/// Snapshot of a map's counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapStats {
    /// Number of slots.
    pub slot_count: usize,
    /// Live records.
    pub load: usize,
    /// Puts that had to chain or evict.
    pub collisions: usize,
    /// Puts rejected at full load.
    pub overflows: usize,
}

impl fmt::Display for MapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "load: {}, collisions: {}, overflows: {}",
            self.load, self.collisions, self.overflows
        )
    }
}

/// Fixed-capacity map from non-zero `u64` keys to `u64` values.
///
/// A value of 0 doubles as "absent" for [`get`](Self::get); callers that
/// store zeros use [`contains`](Self::contains) to tell them apart.
///
/// # Thread Safety
///
/// This map is NOT thread-safe.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = Arena::new();
/// let mut map = AddressHashMap::create(&mut arena, 1023);
///
/// map.put(0xdead_beef, 42)?;
/// assert_eq!(map.get(0xdead_beef), 42);
/// assert_eq!(map.remove(0xdead_beef), Some(0xdead_beef as usize % 1023));
/// ```
pub struct AddressHashMap<'a> {
    slots: SlotArray<'a>,
    load: usize,
    collisions: usize,
    overflows: usize,
}

impl AddressHashMap<'static> {
    /// Creates a map that owns its slot array.
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is zero.
    #[must_use]
    pub fn with_slots(slot_count: usize) -> Self {
        assert!(slot_count > 0, "address map needs at least one slot");
        let slots = vec![Slot::EMPTY; slot_count].into_boxed_slice();
        Self::build(SlotArray::Owned(slots))
    }

    /// Creates an owning map with the configured default slot count.
    ///
    /// # Panics
    ///
    /// Panics if the configured slot count is zero.
    #[must_use]
    pub fn from_config(config: &MapConfig) -> Self {
        Self::with_slots(config.default_slots)
    }
}

impl<'a> AddressHashMap<'a> {
    /// Creates a map whose slot array is carved out of `arena`.
    ///
    /// The arena stays borrowed for the lifetime of the map.
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is zero or the arena cannot provide the slots.
    pub fn create<B: Backing>(arena: &'a mut Arena<B>, slot_count: usize) -> Self {
        assert!(slot_count > 0, "address map needs at least one slot");
        let bytes = arena.carve(slot_count * size_of::<Slot>(), align_of::<Slot>());
        Self::build(SlotArray::Carved(bytemuck::cast_slice_mut(bytes)))
    }

    fn build(slots: SlotArray<'a>) -> Self {
        debug!(slot_count = slots.len(), "address map created");
        Self {
            slots,
            load: 0,
            collisions: 0,
            overflows: 0,
        }
    }

    /// Returns the number of slots.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of live records.
    #[inline]
    #[must_use]
    pub const fn load(&self) -> usize {
        self.load
    }

    /// Returns the number of puts that chained or evicted.
    #[inline]
    #[must_use]
    pub const fn collisions(&self) -> usize {
        self.collisions
    }

    /// Returns the number of rejected puts.
    #[inline]
    #[must_use]
    pub const fn overflows(&self) -> usize {
        self.overflows
    }

    /// Returns true if no record is stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.load == 0
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> MapStats {
        MapStats {
            slot_count: self.slot_count(),
            load: self.load,
            collisions: self.collisions,
            overflows: self.overflows,
        }
    }

    /// Returns the raw slot array.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Inserts or updates `key`.
    ///
    /// # Returns
    ///
    /// The slot index now holding the key.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Saturated`] when every slot is occupied. The put
    /// is rejected even if it would only update, and the overflow counter
    /// is incremented.
    ///
    /// # Panics
    ///
    /// Panics if `key` is zero.
    pub fn put(&mut self, key: u64, value: u64) -> MapResult<usize> {
        assert!(key != 0, "address map key must be non-zero");

        let slot_count = self.slot_count();
        if self.load == slot_count {
            self.overflows += 1;
            warn!(slot_count, overflows = self.overflows, "address map saturated, put rejected");
            return Err(MapError::Saturated { slot_count });
        }

        let home = self.home_of(key);
        let resident = self.slots[home];
        if resident.is_empty() {
            self.slots[home] = Slot::new(key, value);
            self.load += 1;
            return Ok(home);
        }

        if self.home_of(resident.key) != home {
            self.evict(home);
            self.slots[home] = Slot::new(key, value);
            self.load += 1;
            self.collisions += 1;
            return Ok(home);
        }

        let mut tail = home;
        for _ in 0..slot_count {
            let slot = &mut self.slots[tail];
            if slot.key == key {
                slot.value = value;
                return Ok(tail);
            }
            match slot.next() {
                Some(next) => tail = next,
                None => break,
            }
        }

        let Some(free) = self.find_empty(tail) else {
            unreachable!("address map below full load has no empty slot");
        };
        self.slots[tail].set_next(Some(free));
        self.slots[free] = Slot::new(key, value);
        self.load += 1;
        self.collisions += 1;
        trace!(key, home, slot = free, "address map chained");
        Ok(free)
    }

    /// Returns the value for `key`, or 0 if absent.
    #[must_use]
    pub fn get(&self, key: u64) -> u64 {
        self.index_of(key).map_or(0, |index| self.slots[index].value)
    }

    /// Returns true if `key` is stored.
    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.index_of(key).is_some()
    }

    /// Returns the slot index holding `key`.
    #[must_use]
    pub fn index_of(&self, key: u64) -> Option<usize> {
        self.get_index(key).map(|(index, _)| index)
    }

    /// Removes `key`.
    ///
    /// # Returns
    ///
    /// The slot index the key occupied, or None if it was absent.
    pub fn remove(&mut self, key: u64) -> Option<usize> {
        let (index, prev) = self.get_index(key)?;
        let next = self.slots[index].next();

        match (prev, next) {
            (Some(prev), _) => {
                self.slots[prev].set_next(next);
                self.slots[index] = Slot::EMPTY;
            }
            (None, Some(next)) => {
                let successor = self.slots[next];
                self.slots[index] = successor;
                self.slots[next] = Slot::EMPTY;
            }
            (None, None) => self.slots[index] = Slot::EMPTY,
        }
        self.load -= 1;
        Some(index)
    }

    /// Zeroes every slot and counter in place.
    pub fn clear(&mut self) {
        self.slots.fill(Slot::EMPTY);
        self.load = 0;
        self.collisions = 0;
        self.overflows = 0;
        debug!(slot_count = self.slot_count(), "address map cleared");
    }

    /// Inserts or updates a string key, hashed with DJB2.
    ///
    /// # Errors
    ///
    /// As [`put`](Self::put).
    pub fn put_str(&mut self, key: impl AsRef<[u8]>, value: u64) -> MapResult<usize> {
        self.put(string_key(key.as_ref()), value)
    }

    /// Returns the value for a string key, or 0 if absent.
    #[must_use]
    pub fn get_str(&self, key: impl AsRef<[u8]>) -> u64 {
        self.get(string_key(key.as_ref()))
    }

    /// Removes a string key.
    pub fn remove_str(&mut self, key: impl AsRef<[u8]>) -> Option<usize> {
        self.remove(string_key(key.as_ref()))
    }

    /// Iterates over `(slot index, key, value)` of every live record in slot
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u64, u64)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_empty())
            .map(|(index, slot)| (index, slot.key, slot.value))
    }

    #[inline]
    fn home_of(&self, key: u64) -> usize {
        (key % self.slots.len() as u64) as usize
    }

    /// Finds `key` and its chain predecessor.
    ///
    /// # Returns
    ///
    /// The slot index holding the key and the index of the record linking
    /// to it (None for a chain head), or None if the key is absent.
    #[must_use]
    pub fn get_index(&self, key: u64) -> Option<(usize, Option<usize>)> {
        if key == 0 {
            return None;
        }
        let home = self.home_of(key);
        let head = self.slots[home];
        if head.is_empty() || self.home_of(head.key) != home {
            return None;
        }

        let mut prev = None;
        let mut cursor = home;
        // Chains are acyclic; the bound only guards against corruption.
        for _ in 0..self.slot_count() {
            let slot = self.slots[cursor];
            if slot.key == key {
                return Some((cursor, prev));
            }
            prev = Some(cursor);
            cursor = slot.next()?;
        }
        None
    }

    /// First empty slot after `from`, wrapping around.
    fn find_empty(&self, from: usize) -> Option<usize> {
        let slot_count = self.slot_count();
        (1..=slot_count)
            .map(|step| (from + step) % slot_count)
            .find(|&index| self.slots[index].is_empty())
    }

    /// The record linking to `target` on the chain starting at `start`.
    fn predecessor(&self, start: usize, target: usize) -> Option<usize> {
        let mut cursor = start;
        for _ in 0..self.slot_count() {
            let next = self.slots[cursor].next()?;
            if next == target {
                return Some(cursor);
            }
            cursor = next;
        }
        None
    }

    /// Moves the intruder at `index` to a free slot, keeping its chain intact.
    fn evict(&mut self, index: usize) {
        let intruder = self.slots[index];
        let owner = self.home_of(intruder.key);
        let Some(prev) = self.predecessor(owner, index) else {
            unreachable!("slot {index} is not on the chain of its home {owner}");
        };
        let Some(free) = self.find_empty(index) else {
            unreachable!("address map below full load has no empty slot");
        };

        self.slots[free] = intruder;
        self.slots[prev].set_next(Some(free));
        self.slots[index] = Slot::EMPTY;
        trace!(key = intruder.key, from = index, to = free, "address map evicted intruder");
    }
}

impl fmt::Debug for AddressHashMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressHashMap")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
