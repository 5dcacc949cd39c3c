//! Resolution of equal-key runs in a sorted range.

use smallvec::SmallVec;

use crate::lookup::InputLookup;
use crate::report::{Duplicate, PreparationSummary};
use crate::tracker::DUPLICATE_MARK;

/// Result of resolving one sorted range.
#[derive(Debug, Default)]
pub(crate) struct RangeOutcome {
    pub summary: PreparationSummary,
    pub duplicates: Vec<Duplicate>,
}

/// Walk a sorted range and resolve every run of equal keys.
///
/// Entries repeating an earlier input get [`DUPLICATE_MARK`] set in their id
/// slot. Ids must be unmarked on entry.
pub(crate) fn resolve_runs<L>(keys: &[i64], ids: &mut [i64], lookup: &L) -> RangeOutcome
where
    L: InputLookup + ?Sized,
{
    let mut outcome = RangeOutcome::default();
    outcome.summary.entries = keys.len() as u64;

    let mut start = 0;
    while start < keys.len() {
        let key = keys[start];
        let mut end = start + 1;
        while end < keys.len() && keys[end] == key {
            end += 1;
        }

        let run = end - start;
        outcome.summary.longest_run = outcome.summary.longest_run.max(run as u64);
        if run > 1 {
            resolve_run(key as u64, &mut ids[start..end], lookup, &mut outcome);
        }
        start = end;
    }
    outcome
}

/// Resolve one run. Ids are ascending, so the first entry carrying an input
/// holds its lowest id.
///
/// Each entry is compared against the distinct inputs found so far, which
/// keeps a run of k copies of one input at O(k) comparisons. Inputs are
/// fetched per comparison and never held across entries.
fn resolve_run<L>(key: u64, ids: &mut [i64], lookup: &L, outcome: &mut RangeOutcome)
where
    L: InputLookup + ?Sized,
{
    let mut distinct: SmallVec<[usize; 8]> = SmallVec::new();

    for i in 0..ids.len() {
        let id = ids[i] as u64;
        let Some(input) = lookup.input(id) else {
            outcome.summary.unresolved += 1;
            continue;
        };

        let authoritative = distinct.iter().map(|&d| ids[d] as u64).find(|&candidate| {
            lookup
                .input(candidate)
                .is_some_and(|other| other.as_ref() == input.as_ref())
        });

        match authoritative {
            Some(authoritative) => {
                ids[i] |= DUPLICATE_MARK;
                outcome.summary.duplicates += 1;
                outcome.duplicates.push(Duplicate {
                    authoritative,
                    duplicate: id,
                    key,
                });
            }
            None => distinct.push(i),
        }
    }

    if distinct.len() > 1 {
        outcome.summary.collision_runs += 1;
        outcome.summary.colliding_entries += distinct.len() as u64;
    }
}
