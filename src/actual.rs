//! Identity mapping for inputs that already are dense ids.

use longarray::MemoryStatsVisitor;

use crate::error::{IdMapError, Result};
use crate::lookup::InputLookup;
use crate::report::{DuplicateReport, PreparationSummary};
use crate::{IdMapper, ID_NOT_FOUND};

/// Id mapper for sources whose identifiers are the dense ids themselves.
///
/// Stores nothing; `get(v)` is `v`. Only counts insertions so the
/// preparation summary stays meaningful.
#[derive(Debug, Default)]
pub struct ActualIdMapper {
    entries: u64,
    prepared: bool,
}

impl ActualIdMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdMapper for ActualIdMapper {
    type Input = u64;

    fn put(&mut self, _input: &u64, _id: u64) -> Result<()> {
        if self.prepared {
            return Err(IdMapError::AlreadyPrepared);
        }
        self.entries += 1;
        Ok(())
    }

    fn needs_preparation(&self) -> bool {
        false
    }

    fn prepare<L, R>(&mut self, _lookup: &L, _report: &mut R) -> Result<PreparationSummary>
    where
        L: InputLookup + Sync + ?Sized,
        R: DuplicateReport + ?Sized,
    {
        if self.prepared {
            return Err(IdMapError::AlreadyPrepared);
        }
        self.prepared = true;
        Ok(PreparationSummary {
            entries: self.entries,
            longest_run: u64::from(self.entries > 0),
            ..PreparationSummary::default()
        })
    }

    #[inline]
    fn get<L>(&self, input: &u64, _lookup: &L) -> i64
    where
        L: InputLookup + ?Sized,
    {
        i64::try_from(*input).unwrap_or(ID_NOT_FOUND)
    }

    fn visit_memory_stats(&self, _visitor: &mut dyn MemoryStatsVisitor) {}
}
