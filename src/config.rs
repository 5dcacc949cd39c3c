//! Tuning knobs for string id mappers.

use longarray::LongArrayFactory;

/// Configuration for a [`StringIdMapper`](crate::StringIdMapper).
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Where the key and id arrays live.
    pub array_factory: LongArrayFactory,
    /// Initial capacity hint for number of entries.
    pub initial_capacity: u64,
    /// Worker threads for preparation. `None` uses rayon's global pool.
    pub processors: Option<usize>,
    /// Below this many entries, preparation runs on the calling thread.
    pub parallel_threshold: usize,
    /// Radix buckets larger than this are partitioned again on the next key byte.
    pub radix_split_threshold: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            array_factory: LongArrayFactory::default(),
            initial_capacity: 1024,
            processors: None,
            parallel_threshold: 100_000,
            radix_split_threshold: 1 << 16,
        }
    }
}
