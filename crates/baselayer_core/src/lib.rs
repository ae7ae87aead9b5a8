//! # Baselayer Core
//!
//! Region and block allocation for performance-sensitive code:
//! - Arenas that reserve address space once and commit it lazily
//! - Fixed-block pools with O(1) allocate/free and audited frees
//! - An arena-backed string buffer
//!
//! ## Architecture Rules
//!
//! 1. **Reserve once** - Regions are reserved up front and never moved
//! 2. **Contract violations abort** - Bad frees and fixed-arena overflow panic
//! 3. **Capacity is reported** - Exhaustion is a return value, never a panic
//!
//! ## Example
//!
//! ```rust,ignore
//! use baselayer_core::{Arena, Pool};
//!
//! let mut arena = Arena::new();
//! let mut pool = Pool::create_in(&mut arena, 48, 1024);
//! let block = pool.allocate().expect("pool exhausted");
//! pool.free(block);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;
pub mod str_buff;

pub use config::{ArenaConfig, BaselayerConfig, DictConfig, MapConfig, PoolConfig};
pub use error::{BackingError, ConfigError, PoolError};
pub use memory::{
    Arena, ArenaSlice, ArenaStats, Backing, BlockAddr, HeapBacking, MmapBacking, Pool, TypedPool,
};
pub use str_buff::StrBuff;
