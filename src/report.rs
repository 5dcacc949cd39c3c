//! What preparation found: duplicate inputs and collision tallies.

/// Two insertions carrying the same input.
///
/// Both ids stay addressable. Lookups by input resolve to `authoritative`,
/// the lowest id inserted with this input (the earliest insertion when ids
/// are assigned in order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duplicate {
    pub authoritative: u64,
    pub duplicate: u64,
    /// Encoded key both inputs share.
    pub key: u64,
}

/// Receives duplicates as preparation finds them.
///
/// Duplicates are delivered in ascending key order and, within one key, in
/// ascending duplicate id order. Whether a duplicate rejects the import,
/// keeps the first record or merges them is the receiver's call.
pub trait DuplicateReport {
    fn duplicate(&mut self, duplicate: Duplicate);
}

impl DuplicateReport for Vec<Duplicate> {
    #[inline]
    fn duplicate(&mut self, duplicate: Duplicate) {
        self.push(duplicate);
    }
}

/// Discards duplicates; they are still counted in the summary.
impl DuplicateReport for () {
    #[inline]
    fn duplicate(&mut self, _duplicate: Duplicate) {}
}

/// Diagnostics gathered by one preparation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreparationSummary {
    /// Entries sorted.
    pub entries: u64,
    /// Runs whose entries carry more than one distinct input.
    pub collision_runs: u64,
    /// Distinct inputs inside those runs.
    pub colliding_entries: u64,
    /// Entries found to repeat an earlier input.
    pub duplicates: u64,
    /// Longest run of equal keys.
    pub longest_run: u64,
    /// Entries whose input the lookup could not produce.
    pub unresolved: u64,
}

impl PreparationSummary {
    pub(crate) fn merge(&mut self, other: &PreparationSummary) {
        self.entries += other.entries;
        self.collision_runs += other.collision_runs;
        self.colliding_entries += other.colliding_entries;
        self.duplicates += other.duplicates;
        self.longest_run = self.longest_run.max(other.longest_run);
        self.unresolved += other.unresolved;
    }
}
