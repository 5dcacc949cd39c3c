//! Parallel key/id arrays, indexed by insertion position.

use longarray::{DynamicLongArray, LongArrayFactory, MemoryStatsVisitor};

use crate::error::{IdMapError, Result};

/// Set on an id slot once preparation found it duplicates an earlier entry.
/// Ids are non-negative, so the sign bit is free.
pub(crate) const DUPLICATE_MARK: i64 = i64::MIN;

#[inline]
pub(crate) fn is_duplicate(slot: i64) -> bool {
    slot < 0
}

#[inline]
pub(crate) fn slot_id(slot: i64) -> u64 {
    (slot & i64::MAX) as u64
}

/// Encoded keys and their ids, stored as two equally long arrays.
///
/// Keys are `u64` stored bit-for-bit in `i64` slots; every comparison goes
/// through `as u64` so ordering is unsigned.
pub(crate) struct Tracker {
    keys: DynamicLongArray,
    ids: DynamicLongArray,
}

impl Tracker {
    pub fn new(factory: LongArrayFactory, initial_capacity: u64) -> Result<Self> {
        Ok(Self {
            keys: factory.new_dynamic_array(initial_capacity, 0)?,
            ids: factory.new_dynamic_array(initial_capacity, -1)?,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.as_slice().len()
    }

    /// Append one entry. Either both arrays grow or neither does.
    pub fn push(&mut self, key: u64, id: u64) -> Result<()> {
        let id = i64::try_from(id).map_err(|_| IdMapError::IdOutOfRange { id })?;
        let required = self.keys.len() + 1;
        self.keys.reserve(required)?;
        self.ids.reserve(required)?;
        self.keys.push(key as i64)?;
        self.ids.push(id)?;
        debug_assert_eq!(self.keys.len(), self.ids.len());
        Ok(())
    }

    #[inline]
    pub fn keys(&self) -> &[i64] {
        self.keys.as_slice()
    }

    #[inline]
    pub fn ids(&self) -> &[i64] {
        self.ids.as_slice()
    }

    /// Both arrays, mutably, for sorting.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut [i64], &mut [i64]) {
        (self.keys.as_mut_slice(), self.ids.as_mut_slice())
    }

    pub fn visit_memory_stats(&self, visitor: &mut dyn MemoryStatsVisitor) {
        self.keys.visit_memory_stats("keys", visitor);
        self.ids.visit_memory_stats("ids", visitor);
    }

    pub fn release(self) {
        self.keys.release();
        self.ids.release();
    }
}
