//! # longarray
//!
//! Growable `i64` arrays for structures that need hundreds of millions of
//! slots without paying per-entry overhead.
//!
//! ## Features
//!
//! - **Pluggable placement**: heap (`Vec`), off-heap (anonymous memory maps),
//!   or automatic placement that moves large arrays off-heap
//! - **Fallible growth**: running out of memory is an error, not an abort
//! - **Memory accounting**: used vs. allocated bytes per region through
//!   [`MemoryStatsVisitor`]
//!
//! ## Example
//!
//! ```rust
//! use longarray::{GatheringMemoryStatsVisitor, LongArrayFactory};
//!
//! let mut array = LongArrayFactory::default().new_dynamic_array(16, -1)?;
//! array.push(42)?;
//! array.set(10, 7)?;
//!
//! assert_eq!(array.get(0), 42);
//! assert_eq!(array.get(5), -1);
//! assert_eq!(array.len(), 11);
//!
//! let mut stats = GatheringMemoryStatsVisitor::default();
//! array.visit_memory_stats("values", &mut stats);
//! assert!(stats.total_used() <= stats.total_allocated());
//! # Ok::<(), longarray::ArrayError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod dynamic;
pub mod error;
pub mod offheap;
pub mod stats;

pub use dynamic::{DynamicLongArray, LongArrayFactory, DEFAULT_OFF_HEAP_THRESHOLD};
pub use error::{ArrayError, Result};
pub use stats::{GatheringMemoryStatsVisitor, MemoryStatsVisitor, RegionUsage};
