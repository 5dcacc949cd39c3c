//! Errors raised while acquiring or growing array storage.

use std::collections::TryReserveError;

use thiserror::Error;

/// Failure to obtain memory for an array.
///
/// Every variant means the caller's operation could not complete; the array
/// that reported it is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// The heap allocator refused a reservation.
    #[error("failed to reserve {requested} bytes on the heap")]
    Heap {
        requested: u64,
        #[source]
        source: TryReserveError,
    },

    /// An anonymous memory map could not be created.
    #[error("failed to map {requested} bytes off-heap")]
    OffHeap {
        requested: u64,
        #[source]
        source: std::io::Error,
    },

    /// The requested length does not fit in the address space.
    #[error("array length {length} exceeds the addressable capacity")]
    CapacityOverflow { length: u64 },
}

/// Result type for array operations.
pub type Result<T> = std::result::Result<T, ArrayError>;
