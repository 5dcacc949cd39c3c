//! Errors surfaced by id mappers.

use longarray::ArrayError;
use thiserror::Error;

/// Failure of an id mapper operation.
///
/// Duplicates, collisions and missing mappings are not errors: they are
/// reported through [`DuplicateReport`](crate::DuplicateReport), the
/// [`PreparationSummary`](crate::PreparationSummary) and the
/// [`ID_NOT_FOUND`](crate::ID_NOT_FOUND) sentinel.
#[derive(Debug, Error)]
pub enum IdMapError {
    /// `put` or `prepare` was called after preparation completed.
    #[error("id mapper is already prepared; no further insertions are allowed")]
    AlreadyPrepared,

    /// The id does not fit the signed 64-bit id space.
    #[error("id {id} exceeds the maximum mappable id {}", i64::MAX)]
    IdOutOfRange { id: u64 },

    /// Tracker storage or sort scratch space could not be allocated.
    #[error("id mapper ran out of memory")]
    Allocation(#[from] ArrayError),

    /// A dedicated worker pool for preparation could not be started.
    #[error("failed to start preparation workers")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for id mapper operations.
pub type Result<T> = std::result::Result<T, IdMapError>;
