//! In-place sorting of the tracker's parallel key/id arrays.
//!
//! Entries are ordered by `(key as u64, id)`. The arrays are first split into
//! independent key ranges by MSD radix partitioning on the top key byte
//! (American flag permutation, 256 counters of scratch per level). Ranges
//! that are still large are partitioned again on the next byte. Each range is
//! then finished with an introsort over the two slices. Ranges are disjoint
//! and cover disjoint key intervals, so equal keys never straddle a range
//! boundary and ranges can be sorted and scanned independently.

use rayon::prelude::*;

const RADIX_BITS: u32 = 8;
const BUCKETS: usize = 1 << RADIX_BITS;
/// Partition on at most the top three key bytes.
const MAX_RADIX_DEPTH: u32 = 3;
const INSERTION_SORT_THRESHOLD: usize = 16;
/// Chunk size for the parallel histogram.
const HISTOGRAM_CHUNK: usize = 1 << 16;

/// Two parallel slices viewed as one sequence of `(key, id)` entries.
pub(crate) struct Pairs<'a> {
    pub keys: &'a mut [i64],
    pub ids: &'a mut [i64],
}

impl<'a> Pairs<'a> {
    pub fn new(keys: &'a mut [i64], ids: &'a mut [i64]) -> Self {
        debug_assert_eq!(keys.len(), ids.len());
        Self { keys, ids }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    fn key(&self, i: usize) -> u64 {
        self.keys[i] as u64
    }

    #[inline]
    fn less(&self, a: usize, b: usize) -> bool {
        (self.key(a), self.ids[a]) < (self.key(b), self.ids[b])
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.keys.swap(a, b);
        self.ids.swap(a, b);
    }

    fn split_at_mut(self, mid: usize) -> (Pairs<'a>, Pairs<'a>) {
        let (keys_lo, keys_hi) = self.keys.split_at_mut(mid);
        let (ids_lo, ids_hi) = self.ids.split_at_mut(mid);
        (
            Pairs {
                keys: keys_lo,
                ids: ids_lo,
            },
            Pairs {
                keys: keys_hi,
                ids: ids_hi,
            },
        )
    }
}

// =============================================================================
// Radix partitioning
// =============================================================================

#[inline]
fn bucket_of(key: u64, shift: u32) -> usize {
    ((key >> shift) as usize) & (BUCKETS - 1)
}

fn histogram(keys: &[i64], shift: u32, parallel: bool) -> [usize; BUCKETS] {
    let count = |chunk: &[i64]| {
        let mut counts = [0usize; BUCKETS];
        for &k in chunk {
            counts[bucket_of(k as u64, shift)] += 1;
        }
        counts
    };

    if !parallel || keys.len() <= HISTOGRAM_CHUNK {
        return count(keys);
    }

    keys.par_chunks(HISTOGRAM_CHUNK).map(count).reduce(
        || [0usize; BUCKETS],
        |mut a, b| {
            for (x, y) in a.iter_mut().zip(b.iter()) {
                *x += y;
            }
            a
        },
    )
}

/// Permute `pairs` so entries are grouped by key byte at `shift`.
///
/// Returns bucket boundaries: bucket `b` occupies `bounds[b]..bounds[b + 1]`.
fn radix_partition(pairs: &mut Pairs<'_>, shift: u32, parallel: bool) -> [usize; BUCKETS + 1] {
    let counts = histogram(&pairs.keys[..], shift, parallel);

    let mut bounds = [0usize; BUCKETS + 1];
    for b in 0..BUCKETS {
        bounds[b + 1] = bounds[b] + counts[b];
    }

    let mut next = [0usize; BUCKETS];
    next.copy_from_slice(&bounds[..BUCKETS]);

    for b in 0..BUCKETS {
        let end = bounds[b + 1];
        while next[b] < end {
            let target = bucket_of(pairs.key(next[b]), shift);
            if target == b {
                next[b] += 1;
            } else {
                // Move the entry into its bucket; examine whatever comes back.
                pairs.swap(next[b], next[target]);
                next[target] += 1;
            }
        }
    }
    bounds
}

/// Upper bound on the number of ranges [`partition_ranges`] can produce.
///
/// Level `d` holds at most `BUCKETS^d` buckets, and buckets split at one
/// level are disjoint and each larger than the threshold. Every split turns
/// one range into at most [`BUCKETS`].
pub(crate) fn max_ranges(len: usize, split_threshold: usize) -> usize {
    let splittable = len / split_threshold.saturating_add(1);
    let mut splits = 0usize;
    let mut level_buckets = 1usize;
    for _ in 0..MAX_RADIX_DEPTH {
        splits = splits.saturating_add(level_buckets.min(splittable));
        level_buckets = level_buckets.saturating_mul(BUCKETS);
    }
    let ranges = splits.saturating_mul(BUCKETS - 1).saturating_add(1);
    ranges.min(len).max(1)
}

/// Split `pairs` into independent key ranges, in ascending key order.
///
/// Ranges are appended to `ranges`; reserve it before calling so the push
/// cannot fail midway through reordering.
pub(crate) fn partition_ranges<'a>(
    pairs: Pairs<'a>,
    split_threshold: usize,
    parallel: bool,
    ranges: &mut Vec<Pairs<'a>>,
) {
    partition_level(pairs, 64 - RADIX_BITS, 0, split_threshold, parallel, ranges);
}

fn partition_level<'a>(
    mut pairs: Pairs<'a>,
    shift: u32,
    depth: u32,
    split_threshold: usize,
    parallel: bool,
    ranges: &mut Vec<Pairs<'a>>,
) {
    if pairs.len() == 0 {
        return;
    }
    if pairs.len() <= split_threshold || depth == MAX_RADIX_DEPTH {
        ranges.push(pairs);
        return;
    }

    let bounds = radix_partition(&mut pairs, shift, parallel);
    let mut rest = pairs;
    for b in 0..BUCKETS {
        let size = bounds[b + 1] - bounds[b];
        let (bucket, tail) = rest.split_at_mut(size);
        rest = tail;
        // Buckets still above the threshold are split again on the next byte.
        partition_level(
            bucket,
            shift.saturating_sub(RADIX_BITS),
            depth + 1,
            split_threshold,
            parallel,
            ranges,
        );
    }
}

// =============================================================================
// Introsort over one range
// =============================================================================

/// Sort `pairs` by `(key, id)` in place, using O(log n) stack.
pub(crate) fn sort_range(pairs: &mut Pairs<'_>) {
    let len = pairs.len();
    if len < 2 {
        return;
    }
    let depth_limit = 2 * (usize::BITS - len.leading_zeros());
    quicksort(pairs, 0, len, depth_limit);
}

fn quicksort(pairs: &mut Pairs<'_>, mut lo: usize, mut hi: usize, mut depth: u32) {
    loop {
        let n = hi - lo;
        if n <= INSERTION_SORT_THRESHOLD {
            insertion_sort(pairs, lo, hi);
            return;
        }
        if depth == 0 {
            heapsort(pairs, lo, hi);
            return;
        }
        depth -= 1;

        let pivot = partition(pairs, lo, hi);
        // Recurse into the smaller side, loop on the larger.
        if pivot - lo < hi - pivot - 1 {
            quicksort(pairs, lo, pivot, depth);
            lo = pivot + 1;
        } else {
            quicksort(pairs, pivot + 1, hi, depth);
            hi = pivot;
        }
    }
}

/// Median-of-three Lomuto partition of `lo..hi`; returns the pivot's final index.
fn partition(pairs: &mut Pairs<'_>, lo: usize, hi: usize) -> usize {
    let mid = lo + (hi - lo) / 2;
    let last = hi - 1;

    if pairs.less(mid, lo) {
        pairs.swap(mid, lo);
    }
    if pairs.less(last, lo) {
        pairs.swap(last, lo);
    }
    if pairs.less(last, mid) {
        pairs.swap(last, mid);
    }
    // lo <= mid <= last; park the median at the end.
    pairs.swap(mid, last);

    let mut store = lo;
    for i in lo..last {
        if pairs.less(i, last) {
            pairs.swap(i, store);
            store += 1;
        }
    }
    pairs.swap(store, last);
    store
}

fn insertion_sort(pairs: &mut Pairs<'_>, lo: usize, hi: usize) {
    for i in (lo + 1)..hi {
        let mut j = i;
        while j > lo && pairs.less(j, j - 1) {
            pairs.swap(j, j - 1);
            j -= 1;
        }
    }
}

fn heapsort(pairs: &mut Pairs<'_>, lo: usize, hi: usize) {
    let n = hi - lo;
    for start in (0..n / 2).rev() {
        sift_down(pairs, lo, start, n);
    }
    for end in (1..n).rev() {
        pairs.swap(lo, lo + end);
        sift_down(pairs, lo, 0, end);
    }
}

fn sift_down(pairs: &mut Pairs<'_>, base: usize, mut root: usize, n: usize) {
    loop {
        let mut child = 2 * root + 1;
        if child >= n {
            return;
        }
        if child + 1 < n && pairs.less(base + child, base + child + 1) {
            child += 1;
        }
        if !pairs.less(base + root, base + child) {
            return;
        }
        pairs.swap(base + root, base + child);
        root = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sorted_reference(keys: &[i64], ids: &[i64]) -> Vec<(u64, i64)> {
        let mut v: Vec<(u64, i64)> = keys.iter().map(|&k| k as u64).zip(ids.iter().copied()).collect();
        v.sort_unstable();
        v
    }

    fn collect(keys: &[i64], ids: &[i64]) -> Vec<(u64, i64)> {
        keys.iter().map(|&k| k as u64).zip(ids.iter().copied()).collect()
    }

    fn sort_all(keys: &mut [i64], ids: &mut [i64], split_threshold: usize, parallel: bool) -> usize {
        let bound = max_ranges(keys.len(), split_threshold);
        let mut ranges = Vec::with_capacity(bound);
        partition_ranges(Pairs::new(keys, ids), split_threshold, parallel, &mut ranges);
        let count = ranges.len();
        assert!(count <= bound);
        if parallel {
            ranges.par_iter_mut().for_each(sort_range);
        } else {
            ranges.iter_mut().for_each(sort_range);
        }
        count
    }

    #[test]
    fn test_sort_range_small() {
        let mut keys = vec![5i64, -1, 3, 3, 0];
        let mut ids = vec![0i64, 1, 4, 2, 3];
        sort_range(&mut Pairs::new(&mut keys, &mut ids));
        // -1 is u64::MAX, so it sorts last.
        assert_eq!(keys, [0, 3, 3, 5, -1]);
        assert_eq!(ids, [3, 2, 4, 0, 1]);
    }

    #[test]
    fn test_sort_random_sequential_and_parallel() {
        let mut rng = StdRng::seed_from_u64(11);
        for &parallel in &[false, true] {
            let n = 200_000;
            let mut keys: Vec<i64> = (0..n).map(|_| rng.gen()).collect();
            let mut ids: Vec<i64> = (0..n as i64).collect();
            let expected = sorted_reference(&keys, &ids);

            let ranges = sort_all(&mut keys, &mut ids, 1_000, parallel);
            assert!(ranges > 1);
            assert_eq!(collect(&keys, &ids), expected);
        }
    }

    #[test]
    fn test_sort_skewed_keys() {
        // Everything shares the top two bytes, with heavy key repetition.
        let mut rng = StdRng::seed_from_u64(12);
        let n = 50_000;
        let mut keys: Vec<i64> = (0..n)
            .map(|_| (0xABCD_0000_0000_0000u64 | rng.gen_range(0..64u64)) as i64)
            .collect();
        let mut ids: Vec<i64> = (0..n as i64).rev().collect();
        let expected = sorted_reference(&keys, &ids);

        sort_all(&mut keys, &mut ids, 100, true);
        assert_eq!(collect(&keys, &ids), expected);
    }

    #[test]
    fn test_sort_constant_keys_orders_by_id() {
        let n = 10_000;
        let mut keys = vec![7i64; n];
        let mut ids: Vec<i64> = (0..n as i64).rev().collect();
        sort_all(&mut keys, &mut ids, 16, false);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_heapsort_fallback() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut keys: Vec<i64> = (0..5_000).map(|_| rng.gen_range(0..100)).collect();
        let mut ids: Vec<i64> = (0..5_000).collect();
        let expected = sorted_reference(&keys, &ids);

        let len = keys.len();
        heapsort(&mut Pairs::new(&mut keys, &mut ids), 0, len);
        assert_eq!(collect(&keys, &ids), expected);
    }

    #[test]
    fn test_ranges_cover_disjoint_key_intervals() {
        let mut rng = StdRng::seed_from_u64(14);
        let n = 100_000;
        let mut keys: Vec<i64> = (0..n).map(|_| rng.gen()).collect();
        let mut ids: Vec<i64> = (0..n as i64).collect();

        let mut ranges = Vec::new();
        partition_ranges(Pairs::new(&mut keys, &mut ids), 500, false, &mut ranges);
        let total: usize = ranges.iter().map(|r| r.len()).sum();
        assert_eq!(total, n);

        let bounds: Vec<(u64, u64)> = ranges
            .iter()
            .map(|r| {
                let min = r.keys.iter().map(|&k| k as u64).min().unwrap();
                let max = r.keys.iter().map(|&k| k as u64).max().unwrap();
                (min, max)
            })
            .collect();
        assert!(bounds.windows(2).all(|w| w[0].1 < w[1].0));
    }

    #[test]
    fn test_max_ranges_bound() {
        // One split per level until buckets outnumber the splittable entries.
        assert_eq!(max_ranges(0, 1 << 16), 1);
        assert_eq!(max_ranges(1 << 16, 1 << 16), 1);
        assert_eq!(max_ranges(300_000, 1 << 16), (1 + 4 + 4) * 255 + 1);

        let huge = max_ranges(500_000_000, 1 << 16);
        assert_eq!(huge, (1 + 256 + 7_629) * 255 + 1);
        assert!(huge < 3 * (500_000_000 / (1 << 16) + 1) * BUCKETS);
    }

    #[test]
    fn test_max_ranges_holds_for_skewed_keys_and_tiny_threshold() {
        let mut rng = StdRng::seed_from_u64(15);
        let n = 20_000;
        let mut keys: Vec<i64> = (0..n)
            .map(|_| ((rng.gen_range(0..4u64) << 56) | rng.gen::<u64>() >> 8) as i64)
            .collect();
        let mut ids: Vec<i64> = (0..n as i64).collect();
        let expected = sorted_reference(&keys, &ids);

        sort_all(&mut keys, &mut ids, 1, true);
        assert_eq!(collect(&keys, &ids), expected);
    }

    #[test]
    fn test_empty_and_single() {
        let mut keys: Vec<i64> = Vec::new();
        let mut ids: Vec<i64> = Vec::new();
        assert_eq!(sort_all(&mut keys, &mut ids, 1, true), 0);

        let mut keys = vec![9i64];
        let mut ids = vec![0i64];
        assert_eq!(sort_all(&mut keys, &mut ids, 1, true), 1);
        assert_eq!(keys, [9]);
    }
}
