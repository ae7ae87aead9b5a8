//! # Core Error Types
//!
//! Recoverable failures of the core allocators.
//!
//! Caller-contract violations (overflowing a fixed arena, a strict pool free
//! of a bad address) are not represented here: they panic at the call site.

use thiserror::Error;

/// Errors raised by a memory [`Backing`](crate::memory::Backing).
#[derive(Error, Debug)]
pub enum BackingError {
    /// Commit would extend past the reserved span.
    #[error("commit exceeds reservation: need {requested} bytes, reserved {reserved}")]
    ExceedsReservation {
        /// Total committed bytes the request would require.
        requested: usize,
        /// Bytes reserved for the region.
        reserved: usize,
    },

    /// A zero-byte reservation was requested from a backing that cannot map it.
    #[error("cannot reserve an empty region")]
    EmptyReservation,

    /// The operating system refused the mapping.
    #[error("memory map failed: {0}")]
    Map(#[from] std::io::Error),
}

/// Reasons a pool rejects a free.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The address was handed out by a different pool instance.
    #[error("address belongs to pool {found}, not pool {expected}")]
    ForeignAddress {
        /// Tag of the pool asked to free the address.
        expected: u64,
        /// Tag carried by the address.
        found: u64,
    },

    /// The offset lies past the end of the pool region.
    #[error("offset {offset} outside pool region of {limit} bytes")]
    OutOfBounds {
        /// Byte offset of the address.
        offset: usize,
        /// Size of the pool region in bytes.
        limit: usize,
    },

    /// The offset does not start a block.
    #[error("offset {offset} is not aligned to block size {block_size}")]
    Misaligned {
        /// Byte offset of the address.
        offset: usize,
        /// Block size of the pool.
        block_size: usize,
    },

    /// The block is already on the free list.
    #[error("block {index} is not allocated")]
    NotAllocated {
        /// Zero-based block number.
        index: usize,
    },
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for backing operations.
pub type BackingResult<T> = Result<T, BackingError>;

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
