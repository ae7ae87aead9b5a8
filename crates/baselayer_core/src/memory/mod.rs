//! # Memory Management
//!
//! Region and block allocators.
//!
//! ## Design Philosophy
//!
//! Memory is reserved once and handed out by bumping or by free list:
//! - No per-allocation system calls
//! - No garbage collection
//! - Contract violations abort; capacity exhaustion is reported

mod arena;
mod backing;
mod pool;
mod typed_pool;

pub use arena::{Arena, ArenaSlice, ArenaStats, ARENA_COMMIT_CHUNK, ARENA_RESERVE_SIZE};
pub use backing::{Backing, HeapBacking, MmapBacking, REGION_ALIGN};
pub use pool::{round_block_size, BlockAddr, Pool, MIN_BLOCK_SIZE};
pub use typed_pool::TypedPool;
