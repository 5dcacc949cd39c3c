//! Mapping of string-like inputs to the ids they were inserted with.

use std::time::Instant;

use longarray::MemoryStatsVisitor;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::collision::{resolve_runs, RangeOutcome};
use crate::config::MapperConfig;
use crate::encoder::{Encoder, StringEncoder};
use crate::error::{IdMapError, Result};
use crate::lookup::InputLookup;
use crate::report::{DuplicateReport, PreparationSummary};
use crate::sort::{max_ranges, partition_ranges, sort_range, Pairs};
use crate::tracker::{is_duplicate, slot_id, Tracker};
use crate::{IdMapper, ID_NOT_FOUND};

#[derive(Debug, Clone, Copy)]
enum Phase {
    Inserting,
    Prepared(PreparationSummary),
}

/// Maps arbitrary byte-string inputs to dense ids.
///
/// Lifecycle:
/// 1. [`put`](Self::put) every `(input, id)` pair, in any order, from one thread
/// 2. [`prepare`](Self::prepare) once: sorts by encoded key and resolves
///    duplicates and collisions
/// 3. [`get`](Self::get) from any number of threads
///
/// Only the encoded key and the id are stored per entry, 16 bytes in total.
/// Whenever two entries share a key the inputs are fetched back through an
/// [`InputLookup`] and compared.
pub struct StringIdMapper<E = StringEncoder> {
    encoder: E,
    tracker: Tracker,
    config: MapperConfig,
    phase: Phase,
}

impl StringIdMapper<StringEncoder> {
    /// Create an empty mapper with the default encoder and configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(MapperConfig::default())
    }

    pub fn with_config(config: MapperConfig) -> Result<Self> {
        Self::with_encoder(StringEncoder, config)
    }
}

impl<E: Encoder> StringIdMapper<E> {
    pub fn with_encoder(encoder: E, config: MapperConfig) -> Result<Self> {
        let tracker = Tracker::new(config.array_factory, config.initial_capacity)?;
        Ok(Self {
            encoder,
            tracker,
            config,
            phase: Phase::Inserting,
        })
    }

    /// Number of entries put so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn needs_preparation(&self) -> bool {
        matches!(self.phase, Phase::Inserting)
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Summary of the completed preparation, if any.
    pub fn summary(&self) -> Option<PreparationSummary> {
        match self.phase {
            Phase::Inserting => None,
            Phase::Prepared(summary) => Some(summary),
        }
    }

    /// Record that `input` maps to `id`.
    ///
    /// `id` is the caller's dense index for the record. The input itself is
    /// not kept.
    pub fn put(&mut self, input: impl AsRef<[u8]>, id: u64) -> Result<()> {
        if !self.needs_preparation() {
            return Err(IdMapError::AlreadyPrepared);
        }
        let key = self.encoder.encode(input.as_ref());
        self.tracker.push(key, id)
    }

    /// Sort the entries and resolve equal-key runs, then freeze the mapper.
    ///
    /// `lookup` must return, for every id put, the input it was put with.
    /// Duplicates are passed to `report` in key order. A failure leaves the
    /// mapper unprepared and nothing reordered.
    #[instrument(level = "debug", skip_all, fields(entries = self.tracker.len()))]
    pub fn prepare<L, R>(&mut self, lookup: &L, report: &mut R) -> Result<PreparationSummary>
    where
        L: InputLookup + Sync + ?Sized,
        R: DuplicateReport + ?Sized,
    {
        if !self.needs_preparation() {
            return Err(IdMapError::AlreadyPrepared);
        }

        let started = Instant::now();
        let len = self.tracker.len();
        let parallel = len >= self.config.parallel_threshold;
        let split_threshold = self.config.radix_split_threshold;

        // Everything fallible is acquired before the first swap.
        let pool = match self.config.processors {
            Some(threads) if parallel => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("idmap-prepare-{i}"))
                    .build()?,
            ),
            _ => None,
        };
        let mut ranges = Vec::new();
        ranges
            .try_reserve_exact(max_ranges(len, split_threshold))
            .map_err(|source| longarray::ArrayError::Heap {
                requested: (max_ranges(len, split_threshold) * std::mem::size_of::<Pairs<'_>>())
                    as u64,
                source,
            })?;

        let (keys, ids) = self.tracker.split_mut();
        let run = || {
            partition_ranges(Pairs::new(keys, ids), split_threshold, parallel, &mut ranges);
            debug!(ranges = ranges.len(), parallel, "partitioned entries");
            let process = |mut range: Pairs<'_>| {
                sort_range(&mut range);
                resolve_runs(range.keys, range.ids, lookup)
            };
            if parallel {
                ranges.into_par_iter().map(process).collect::<Vec<RangeOutcome>>()
            } else {
                ranges.into_iter().map(process).collect::<Vec<RangeOutcome>>()
            }
        };
        let outcomes = match &pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let mut summary = PreparationSummary::default();
        for outcome in &outcomes {
            summary.merge(&outcome.summary);
            for &duplicate in &outcome.duplicates {
                report.duplicate(duplicate);
            }
        }
        self.phase = Phase::Prepared(summary);

        if summary.unresolved > 0 {
            warn!(
                unresolved = summary.unresolved,
                "input lookup could not produce some inputs; their runs are only partially resolved"
            );
        }
        info!(
            entries = summary.entries,
            duplicates = summary.duplicates,
            collision_runs = summary.collision_runs,
            longest_run = summary.longest_run,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "id mapper prepared"
        );
        Ok(summary)
    }

    /// Id that `input` was put with, or [`ID_NOT_FOUND`].
    ///
    /// Inputs put more than once resolve to their lowest id, which is the
    /// earliest insertion when ids are assigned in order. A key held by
    /// a single entry is trusted without consulting `lookup`. Returns
    /// [`ID_NOT_FOUND`] before preparation.
    pub fn get<L>(&self, input: impl AsRef<[u8]>, lookup: &L) -> i64
    where
        L: InputLookup + ?Sized,
    {
        if self.needs_preparation() {
            return ID_NOT_FOUND;
        }

        let input = input.as_ref();
        let key = self.encoder.encode(input);
        let keys = self.tracker.keys();
        let ids = self.tracker.ids();

        let start = keys.partition_point(|&k| (k as u64) < key);
        let end = start + keys[start..].partition_point(|&k| k as u64 == key);

        match end - start {
            0 => ID_NOT_FOUND,
            1 => slot_id(ids[start]) as i64,
            _ => ids[start..end]
                .iter()
                .filter(|&&slot| !is_duplicate(slot))
                .map(|&slot| slot_id(slot))
                .find(|&id| {
                    lookup
                        .input(id)
                        .is_some_and(|candidate| candidate.as_ref() == input)
                })
                .map_or(ID_NOT_FOUND, |id| id as i64),
        }
    }

    /// Like [`get`](Self::get), as an `Option`.
    #[inline]
    pub fn find<L>(&self, input: impl AsRef<[u8]>, lookup: &L) -> Option<u64>
    where
        L: InputLookup + ?Sized,
    {
        u64::try_from(self.get(input, lookup)).ok()
    }

    /// Report the key and id arrays as the regions `keys` and `ids`.
    pub fn visit_memory_stats(&self, visitor: &mut dyn MemoryStatsVisitor) {
        self.tracker.visit_memory_stats(visitor);
    }

    /// Release the key and id arrays.
    pub fn release(self) {
        self.tracker.release();
    }

    #[cfg(test)]
    pub(crate) fn raw_entries(&self) -> (&[i64], &[i64]) {
        (self.tracker.keys(), self.tracker.ids())
    }
}

impl<E: Encoder> IdMapper for StringIdMapper<E> {
    type Input = [u8];

    fn put(&mut self, input: &[u8], id: u64) -> Result<()> {
        StringIdMapper::put(self, input, id)
    }

    fn needs_preparation(&self) -> bool {
        StringIdMapper::needs_preparation(self)
    }

    fn prepare<L, R>(&mut self, lookup: &L, report: &mut R) -> Result<PreparationSummary>
    where
        L: InputLookup + Sync + ?Sized,
        R: DuplicateReport + ?Sized,
    {
        StringIdMapper::prepare(self, lookup, report)
    }

    fn get<L>(&self, input: &[u8], lookup: &L) -> i64
    where
        L: InputLookup + ?Sized,
    {
        StringIdMapper::get(self, input, lookup)
    }

    fn visit_memory_stats(&self, visitor: &mut dyn MemoryStatsVisitor) {
        StringIdMapper::visit_memory_stats(self, visitor)
    }
}

impl<E> std::fmt::Debug for StringIdMapper<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringIdMapper")
            .field("entries", &self.tracker.len())
            .field("phase", &self.phase)
            .finish()
    }
}
