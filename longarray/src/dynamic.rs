//! Growable `i64` arrays and the factory that places them.

use tracing::debug;

use crate::error::{ArrayError, Result};
use crate::offheap::{bytes_for, OffHeapSegment};
use crate::stats::MemoryStatsVisitor;

/// Smallest capacity handed out after the first growth.
const MIN_GROWTH_CAPACITY: usize = 1024;

/// Default size above which [`LongArrayFactory::Auto`] moves arrays off-heap (64MB).
pub const DEFAULT_OFF_HEAP_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Decides where array storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongArrayFactory {
    /// Always allocate from the heap.
    Heap,
    /// Always allocate anonymous memory maps.
    OffHeap,
    /// Start on the heap and move off-heap once the array would reserve more
    /// than `off_heap_threshold` bytes.
    Auto { off_heap_threshold: u64 },
}

impl Default for LongArrayFactory {
    fn default() -> Self {
        LongArrayFactory::Auto {
            off_heap_threshold: DEFAULT_OFF_HEAP_THRESHOLD,
        }
    }
}

impl LongArrayFactory {
    /// Create an empty array with room for `initial_capacity` values.
    ///
    /// Reads of slots that were never written return `default_value`.
    pub fn new_dynamic_array(
        self,
        initial_capacity: u64,
        default_value: i64,
    ) -> Result<DynamicLongArray> {
        let capacity = to_usize(initial_capacity)?;
        let backing = Backing::allocate(self.off_heap_for(capacity)?, capacity, default_value)?;
        Ok(DynamicLongArray {
            backing,
            len: 0,
            default_value,
            factory: self,
        })
    }

    fn off_heap_for(self, capacity: usize) -> Result<bool> {
        Ok(match self {
            LongArrayFactory::Heap => false,
            LongArrayFactory::OffHeap => true,
            LongArrayFactory::Auto { off_heap_threshold } => {
                bytes_for(capacity)? as u64 > off_heap_threshold
            }
        })
    }
}

enum Backing {
    Heap(Vec<i64>),
    OffHeap(OffHeapSegment),
}

impl Backing {
    fn allocate(off_heap: bool, capacity: usize, default_value: i64) -> Result<Self> {
        if off_heap {
            return Ok(Backing::OffHeap(OffHeapSegment::new(capacity, default_value)?));
        }
        let mut values = Vec::new();
        values
            .try_reserve_exact(capacity)
            .map_err(|source| ArrayError::Heap {
                requested: bytes_for(capacity).unwrap_or(usize::MAX) as u64,
                source,
            })?;
        values.resize(capacity, default_value);
        Ok(Backing::Heap(values))
    }

    #[inline]
    fn capacity(&self) -> usize {
        match self {
            Backing::Heap(values) => values.len(),
            Backing::OffHeap(segment) => segment.capacity(),
        }
    }

    #[inline]
    fn slots(&self) -> &[i64] {
        match self {
            Backing::Heap(values) => values,
            Backing::OffHeap(segment) => segment.as_slice(),
        }
    }

    #[inline]
    fn slots_mut(&mut self) -> &mut [i64] {
        match self {
            Backing::Heap(values) => values,
            Backing::OffHeap(segment) => segment.as_mut_slice(),
        }
    }

    fn allocated_bytes(&self) -> usize {
        match self {
            Backing::Heap(values) => values.capacity() * std::mem::size_of::<i64>(),
            Backing::OffHeap(segment) => segment.mapped_bytes(),
        }
    }
}

/// A growable array of `i64` values.
///
/// Every slot up to the capacity is initialized, so growth only has to copy
/// the live prefix. Appends are amortized O(1): capacity doubles on growth.
/// Any failure to obtain memory leaves the array unchanged.
pub struct DynamicLongArray {
    backing: Backing,
    /// Highest written index + 1.
    len: usize,
    default_value: i64,
    factory: LongArrayFactory,
}

impl DynamicLongArray {
    #[inline]
    pub fn len(&self) -> u64 {
        self.len as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.backing.capacity() as u64
    }

    #[inline]
    pub fn default_value(&self) -> i64 {
        self.default_value
    }

    /// Whether the values currently live in an anonymous memory map.
    #[inline]
    pub fn is_off_heap(&self) -> bool {
        matches!(self.backing, Backing::OffHeap(_))
    }

    /// Value at `index`, or the default value if it was never written.
    #[inline]
    pub fn get(&self, index: u64) -> i64 {
        match usize::try_from(index) {
            Ok(i) if i < self.len => self.backing.slots()[i],
            _ => self.default_value,
        }
    }

    /// Write `value` at `index`, growing the array if needed.
    ///
    /// Slots skipped over by the write read back as the default value.
    pub fn set(&mut self, index: u64, value: i64) -> Result<()> {
        let i = to_usize(index)?;
        let required = i.checked_add(1).ok_or(ArrayError::CapacityOverflow { length: index })?;
        self.ensure_capacity(required)?;
        self.backing.slots_mut()[i] = value;
        self.len = self.len.max(required);
        Ok(())
    }

    /// Append `value` after the last written slot.
    #[inline]
    pub fn push(&mut self, value: i64) -> Result<()> {
        self.set(self.len as u64, value)
    }

    /// Make sure at least `min_capacity` slots exist without changing `len`.
    pub fn reserve(&mut self, min_capacity: u64) -> Result<()> {
        self.ensure_capacity(to_usize(min_capacity)?)
    }

    /// Swap the values at `a` and `b`.
    ///
    /// # Panics
    /// Panics if either index is not below [`len`](Self::len).
    #[inline]
    pub fn swap(&mut self, a: u64, b: u64) {
        self.as_mut_slice().swap(a as usize, b as usize);
    }

    /// The written prefix as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[i64] {
        &self.backing.slots()[..self.len]
    }

    /// The written prefix as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [i64] {
        let len = self.len;
        &mut self.backing.slots_mut()[..len]
    }

    /// Bytes holding written values.
    #[inline]
    pub fn bytes_used(&self) -> u64 {
        (self.len * std::mem::size_of::<i64>()) as u64
    }

    /// Bytes reserved for this array, written or not.
    #[inline]
    pub fn bytes_allocated(&self) -> u64 {
        self.backing.allocated_bytes() as u64
    }

    /// Report this array as one region to `visitor`.
    pub fn visit_memory_stats(&self, region: &str, visitor: &mut dyn MemoryStatsVisitor) {
        visitor.visit(region, self.bytes_used(), self.bytes_allocated());
    }

    /// Give the storage back to where it came from.
    pub fn release(self) {
        debug!(
            len = self.len,
            bytes = self.bytes_allocated(),
            off_heap = self.is_off_heap(),
            "releasing long array"
        );
    }

    fn ensure_capacity(&mut self, required: usize) -> Result<()> {
        let current = self.backing.capacity();
        if required <= current {
            return Ok(());
        }

        let new_capacity = required
            .max(current.saturating_mul(2))
            .max(MIN_GROWTH_CAPACITY);
        let off_heap = self.factory.off_heap_for(new_capacity)?;

        if !off_heap {
            if let Backing::Heap(values) = &mut self.backing {
                let additional = new_capacity - values.len();
                values
                    .try_reserve_exact(additional)
                    .map_err(|source| ArrayError::Heap {
                        requested: bytes_for(new_capacity).unwrap_or(usize::MAX) as u64,
                        source,
                    })?;
                values.resize(new_capacity, self.default_value);
                return Ok(());
            }
        }

        // Off-heap segments are fixed size: map a bigger one and copy the live prefix.
        let mut grown = Backing::allocate(off_heap, new_capacity, self.default_value)?;
        grown.slots_mut()[..self.len].copy_from_slice(&self.backing.slots()[..self.len]);
        if off_heap && !self.is_off_heap() {
            debug!(
                len = self.len,
                capacity = new_capacity,
                "moving long array off-heap"
            );
        }
        self.backing = grown;
        Ok(())
    }
}

impl std::fmt::Debug for DynamicLongArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLongArray")
            .field("len", &self.len)
            .field("capacity", &self.backing.capacity())
            .field("off_heap", &self.is_off_heap())
            .finish()
    }
}

#[inline]
fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| ArrayError::CapacityOverflow { length: value })
}
