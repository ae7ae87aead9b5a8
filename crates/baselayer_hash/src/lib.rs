//! # Baselayer Hash
//!
//! Fixed-capacity hash tables built on Baselayer arenas:
//! - [`AddressHashMap`]: `u64 -> u64` with chains threaded through the slots
//! - [`StringDict`]: byte-string keys, arena-held bytes, insertion order
//!
//! Neither table rehashes. An [`AddressHashMap`] reports saturation through
//! [`MapError`]; a [`StringDict`] chains without bound.
//!
//! ## Example
//!
//! ```rust,ignore
//! use baselayer_core::Arena;
//! use baselayer_hash::AddressHashMap;
//!
//! let mut arena = Arena::new();
//! let mut map = AddressHashMap::create(&mut arena, 1023);
//! map.put(0x7fff_0000_1000, 1)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod dict;
pub mod error;
pub mod hash;
pub mod map;

pub use dict::StringDict;
pub use error::{MapError, MapResult};
pub use hash::{djb2, hash32, hash64, hash_string, mixed_string_hash};
pub use map::{string_key, AddressHashMap, MapStats, Slot};
