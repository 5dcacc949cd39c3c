//! Memory accounting for array-backed structures.

/// Receives one call per storage region of a structure.
pub trait MemoryStatsVisitor {
    /// `bytes_used` holds live values; `bytes_allocated` is everything reserved.
    fn visit(&mut self, region: &str, bytes_used: u64, bytes_allocated: u64);
}

/// Usage of a single region, as seen by [`GatheringMemoryStatsVisitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionUsage {
    pub name: String,
    pub bytes_used: u64,
    pub bytes_allocated: u64,
}

/// Records every visited region and keeps running totals.
#[derive(Debug, Clone, Default)]
pub struct GatheringMemoryStatsVisitor {
    regions: Vec<RegionUsage>,
    total_used: u64,
    total_allocated: u64,
}

impl GatheringMemoryStatsVisitor {
    pub fn regions(&self) -> &[RegionUsage] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&RegionUsage> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn total_used(&self) -> u64 {
        self.total_used
    }

    pub fn total_allocated(&self) -> u64 {
        self.total_allocated
    }
}

impl MemoryStatsVisitor for GatheringMemoryStatsVisitor {
    fn visit(&mut self, region: &str, bytes_used: u64, bytes_allocated: u64) {
        self.total_used += bytes_used;
        self.total_allocated += bytes_allocated;
        self.regions.push(RegionUsage {
            name: region.to_owned(),
            bytes_used,
            bytes_allocated,
        });
    }
}

impl std::fmt::Display for GatheringMemoryStatsVisitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in &self.regions {
            writeln!(
                f,
                "{}: {} used / {} allocated",
                r.name, r.bytes_used, r.bytes_allocated
            )?;
        }
        write!(
            f,
            "total: {} used / {} allocated",
            self.total_used, self.total_allocated
        )
    }
}
