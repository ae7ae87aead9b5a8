//! # String Dictionary
//!
//! Byte-string keyed table with separate chaining and a fixed slot count.
//!
//! Key and value bytes are copied into an [`Arena`] owned by the dictionary
//! and never freed individually. Entries are index-addressed records linked
//! twice: once on their slot's collision chain, once on the global
//! insertion-order list used for enumeration. Updating a value never moves
//! its entry in insertion order.

use crate::hash::{djb2, mixed_string_hash};
use baselayer_core::memory::{Arena, ArenaSlice};
use baselayer_core::DictConfig;
use std::fmt;
use tracing::debug;

/// One dictionary record.
#[derive(Clone, Copy, Debug)]
struct Entry {
    /// Next entry in the same slot.
    chain_next: Option<usize>,
    /// Next entry in insertion order.
    order_next: Option<usize>,
    /// Previous entry in insertion order.
    order_prev: Option<usize>,
    /// Key bytes in the arena.
    key: ArenaSlice,
    /// Value bytes in the arena.
    value: ArenaSlice,
}

/// Insertion-ordered dictionary from byte strings to byte values.
///
/// A `value_size` of zero accepts values of any length; otherwise every
/// value must be exactly `value_size` bytes.
///
/// # Example
///
/// ```rust,ignore
/// let mut dict = StringDict::new(1023, 8);
/// dict.put(b"lambda", &42u64.to_le_bytes());
///
/// for (key, value) in dict.iter() {
///     println!("{:?} -> {:?}", key, value);
/// }
/// ```
pub struct StringDict {
    /// Chain head per slot.
    slots: Box<[Option<usize>]>,
    /// Records, in allocation order.
    entries: Vec<Entry>,
    /// Key and value storage.
    arena: Arena,
    /// Fixed value length, 0 for variable.
    value_size: usize,
    /// Oldest entry.
    head: Option<usize>,
    /// Newest entry.
    tail: Option<usize>,
    /// Whether slot selection runs DJB2 through the avalanche mixer.
    mix_hash: bool,
}

impl StringDict {
    /// Creates a dictionary with mixed hashing.
    ///
    /// # Arguments
    ///
    /// * `slot_count` - Number of chain heads
    /// * `value_size` - Fixed value length, or 0 for variable-length values
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is zero.
    #[must_use]
    pub fn new(slot_count: usize, value_size: usize) -> Self {
        Self::build(slot_count, value_size, true)
    }

    /// Creates a dictionary using the configured slot count and hashing.
    ///
    /// # Panics
    ///
    /// Panics if the configured slot count is zero.
    #[must_use]
    pub fn from_config(config: &DictConfig, value_size: usize) -> Self {
        Self::build(config.default_slots, value_size, config.mix_hash)
    }

    fn build(slot_count: usize, value_size: usize, mix_hash: bool) -> Self {
        assert!(slot_count > 0, "string dict needs at least one slot");
        debug!(slot_count, value_size, mix_hash, "string dict created");
        Self {
            slots: vec![None; slot_count].into_boxed_slice(),
            entries: Vec::new(),
            arena: Arena::new(),
            value_size,
            head: None,
            tail: None,
            mix_hash,
        }
    }

    /// Returns the number of slots.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the fixed value length, 0 for variable.
    #[inline]
    #[must_use]
    pub const fn value_size(&self) -> usize {
        self.value_size
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the bytes of key and value storage consumed.
    #[inline]
    #[must_use]
    pub const fn arena_used(&self) -> usize {
        self.arena.used()
    }

    /// Inserts `key` or overwrites its value.
    ///
    /// # Returns
    ///
    /// The entry index, stable for the life of the dictionary.
    ///
    /// # Panics
    ///
    /// Panics if a fixed-size dictionary is given a value of the wrong
    /// length, or if an update changes the stored value length.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> usize {
        if self.value_size != 0 {
            assert_eq!(
                value.len(),
                self.value_size,
                "string dict value must be {} bytes",
                self.value_size
            );
        }

        let slot = self.slot_of(key);
        let mut last = None;
        let mut cursor = self.slots[slot];
        while let Some(index) = cursor {
            let entry = self.entries[index];
            if self.arena.bytes(entry.key) == key {
                assert_eq!(
                    entry.value.len(),
                    value.len(),
                    "string dict update changes value size"
                );
                self.arena.bytes_mut(entry.value).copy_from_slice(value);
                return index;
            }
            last = Some(index);
            cursor = entry.chain_next;
        }

        let index = self.entries.len();
        let entry = Entry {
            chain_next: None,
            order_next: None,
            order_prev: self.tail,
            key: self.arena.push(key),
            value: self.arena.push(value),
        };
        self.entries.push(entry);

        match last {
            Some(last) => self.entries[last].chain_next = Some(index),
            None => self.slots[slot] = Some(index),
        }
        match self.tail {
            Some(tail) => self.entries[tail].order_next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        index
    }

    /// Returns the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let index = self.find(key)?;
        Some(self.arena.bytes(self.entries[index].value))
    }

    /// Returns the value stored for `key` mutably. Its length is fixed.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut [u8]> {
        let index = self.find(key)?;
        let value = self.entries[index].value;
        Some(self.arena.bytes_mut(value))
    }

    /// Returns true if `key` is stored.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Returns the key and value of an entry index.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<(&[u8], &[u8])> {
        let entry = self.entries.get(index)?;
        Some((self.arena.bytes(entry.key), self.arena.bytes(entry.value)))
    }

    /// Iterates over `(key, value)` oldest first.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            dict: self,
            cursor: self.head,
            forward: true,
        }
    }

    /// Iterates over `(key, value)` newest first.
    pub fn iter_rev(&self) -> Iter<'_> {
        Iter {
            dict: self,
            cursor: self.tail,
            forward: false,
        }
    }

    /// Iterates over keys oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.iter().map(|(key, _)| key)
    }

    fn slot_of(&self, key: &[u8]) -> usize {
        let hash = if self.mix_hash {
            mixed_string_hash(key)
        } else {
            djb2(key)
        };
        (hash % self.slots.len() as u64) as usize
    }

    fn find(&self, key: &[u8]) -> Option<usize> {
        let mut cursor = self.slots[self.slot_of(key)];
        while let Some(index) = cursor {
            let entry = &self.entries[index];
            if self.arena.bytes(entry.key) == key {
                return Some(index);
            }
            cursor = entry.chain_next;
        }
        None
    }
}

impl fmt::Debug for StringDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringDict")
            .field("slot_count", &self.slot_count())
            .field("value_size", &self.value_size)
            .field("len", &self.len())
            .field("arena_used", &self.arena_used())
            .finish_non_exhaustive()
    }
}

/// Insertion-order iterator over a [`StringDict`].
pub struct Iter<'a> {
    dict: &'a StringDict,
    cursor: Option<usize>,
    forward: bool,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let entry = &self.dict.entries[index];
        self.cursor = if self.forward {
            entry.order_next
        } else {
            entry.order_prev
        };
        Some((
            self.dict.arena.bytes(entry.key),
            self.dict.arena.bytes(entry.value),
        ))
    }
}

impl<'a> IntoIterator for &'a StringDict {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
