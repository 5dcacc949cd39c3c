//! # dense-idmap
//!
//! Maps external record identifiers to the dense sequential ids a bulk graph
//! import assigns them, using 16 bytes per entry.
//!
//! Inputs are never stored. Each insertion keeps a 64-bit encoded key and the
//! id; after a one-time sort, lookups binary search the keys. Two inputs
//! sharing a key (a collision, or the same input inserted twice) are told
//! apart by fetching the inputs back through an [`InputLookup`].
//!
//! ## Example
//!
//! ```rust
//! use dense_idmap::{Duplicate, StringIdMapper, ID_NOT_FOUND};
//!
//! let inputs = ["a", "b", "a"];
//! let mut mapper = StringIdMapper::new()?;
//! for (id, input) in inputs.iter().enumerate() {
//!     mapper.put(input, id as u64)?;
//! }
//!
//! let mut duplicates: Vec<Duplicate> = Vec::new();
//! mapper.prepare(&inputs[..], &mut duplicates)?;
//!
//! assert_eq!(mapper.get("a", &inputs[..]), 0);
//! assert_eq!(mapper.get("b", &inputs[..]), 1);
//! assert_eq!(mapper.get("c", &inputs[..]), ID_NOT_FOUND);
//! assert_eq!(duplicates[0].duplicate, 2);
//! # Ok::<(), dense_idmap::IdMapError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod actual;
mod collision;
pub mod config;
pub mod encoder;
pub mod error;
pub mod lookup;
pub mod mapper;
pub mod report;
mod sort;
mod tracker;

pub use actual::ActualIdMapper;
pub use config::MapperConfig;
pub use encoder::{Encoder, StringEncoder};
pub use error::{IdMapError, Result};
pub use lookup::{FnLookup, InputLookup, NoLookup};
pub use mapper::StringIdMapper;
pub use report::{Duplicate, DuplicateReport, PreparationSummary};

pub use longarray::{GatheringMemoryStatsVisitor, LongArrayFactory, MemoryStatsVisitor};

/// Returned by lookups that find no mapping.
pub const ID_NOT_FOUND: i64 = -1;

/// Common interface of the id mappers an import can choose from.
pub trait IdMapper {
    /// What the import's source data identifies records with.
    type Input: ?Sized;

    /// Record that `input` maps to `id`.
    fn put(&mut self, input: &Self::Input, id: u64) -> Result<()>;

    /// Whether [`prepare`](Self::prepare) must run before lookups succeed.
    fn needs_preparation(&self) -> bool;

    /// Finish insertion and make the mapper ready for lookups.
    fn prepare<L, R>(&mut self, lookup: &L, report: &mut R) -> Result<PreparationSummary>
    where
        L: InputLookup + Sync + ?Sized,
        R: DuplicateReport + ?Sized;

    /// Id mapped to `input`, or [`ID_NOT_FOUND`].
    fn get<L>(&self, input: &Self::Input, lookup: &L) -> i64
    where
        L: InputLookup + ?Sized;

    fn visit_memory_stats(&self, visitor: &mut dyn MemoryStatsVisitor);
}

#[cfg(test)]
mod proptests;
