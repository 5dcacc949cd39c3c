//! Off-heap storage for `i64` values.
//!
//! Segments live in anonymous memory maps instead of the allocator's heap.
//! This matters for arrays with hundreds of millions of slots:
//! - The pages are returned to the OS as soon as the segment is dropped
//! - Large maps do not fragment the allocator's arenas
//! - Untouched pages of a freshly mapped segment cost nothing until written

use std::mem;

use memmap2::{MmapMut, MmapOptions};

use crate::error::{ArrayError, Result};

const SLOT_SIZE: usize = mem::size_of::<i64>();

/// Number of bytes needed for `capacity` slots.
pub(crate) fn bytes_for(capacity: usize) -> Result<usize> {
    capacity
        .checked_mul(SLOT_SIZE)
        .ok_or(ArrayError::CapacityOverflow {
            length: capacity as u64,
        })
}

/// A fixed-capacity block of `i64` slots in an anonymous memory map.
///
/// All slots are always initialized: a new segment is filled with the
/// requested default value before it is handed out.
pub struct OffHeapSegment {
    map: MmapMut,
    capacity: usize,
}

impl OffHeapSegment {
    /// Map a new segment with `capacity` slots, each set to `default_value`.
    pub fn new(capacity: usize, default_value: i64) -> Result<Self> {
        // Zero-length anonymous maps are rejected on some platforms.
        let bytes = bytes_for(capacity.max(1))?;
        let map = MmapOptions::new()
            .len(bytes)
            .map_anon()
            .map_err(|source| ArrayError::OffHeap {
                requested: bytes as u64,
                source,
            })?;

        let mut segment = Self { map, capacity };
        // Anonymous pages are already zeroed.
        if default_value != 0 {
            segment.as_mut_slice().fill(default_value);
        }
        Ok(segment)
    }

    /// Slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes reserved by the mapping.
    #[inline]
    pub fn mapped_bytes(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[i64] {
        // SAFETY: anonymous maps are page aligned, which satisfies the
        // alignment of i64, and the map holds at least `capacity` slots that
        // were initialized in `new`. The map outlives the returned borrow.
        unsafe { std::slice::from_raw_parts(self.map.as_ptr().cast::<i64>(), self.capacity) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [i64] {
        // SAFETY: see `as_slice`; the exclusive borrow of `self` guarantees
        // no other slice into the map is alive.
        unsafe {
            std::slice::from_raw_parts_mut(self.map.as_mut_ptr().cast::<i64>(), self.capacity)
        }
    }
}
