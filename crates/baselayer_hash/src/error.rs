//! # Hash Table Error Types
//!
//! Recoverable capacity conditions of the fixed-size tables.

use thiserror::Error;

/// Errors that can occur in the hash tables.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Every slot is occupied; the put was rejected.
    #[error("map saturated: all {slot_count} slots occupied")]
    Saturated {
        /// Slot count of the table.
        slot_count: usize,
    },
}

/// Result type for hash table operations.
pub type MapResult<T> = Result<T, MapError>;
