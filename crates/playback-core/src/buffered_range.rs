//! Sorted, disjoint interval set describing what a [`crate::sink::MediaSink`]
//! currently holds.
//!
//! Ranges are few (a handful per media type) and merges are local, so a
//! `Vec` kept sorted by `start` is the right structure — no need for the
//! `BTreeMap`-plus-`split_off` machinery `mesio`'s reorder buffer uses for
//! its much larger segment counts.
//!
//! Each range is tagged with the bitrate it was appended at. Two adjacent
//! spans only merge into one range when they carry the *same* bitrate — a
//! lower-quality segment later replaced by a higher-quality one at the same
//! position must stay distinguishable so the scheduler's redundancy check
//! (spec.md §4.4 step 5) and the ABR-quality-aware injection padding
//! (§4.4 step 2) can reason about it.

const EPSILON: f64 = 1e-3;

/// A single contiguous span of buffered media, in seconds, at one bitrate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferedRange {
    pub bitrate: u64,
    pub start: f64,
    pub end: f64,
}

impl BufferedRange {
    pub fn new(bitrate: u64, start: f64, end: f64) -> Self {
        debug_assert!(start <= end, "range start must not exceed end");
        Self { bitrate, start, end }
    }

    fn contains(&self, time: f64) -> bool {
        time >= self.start - EPSILON && time <= self.end + EPSILON
    }

    fn touches(&self, start: f64, end: f64) -> bool {
        self.start <= end + EPSILON && start <= self.end + EPSILON
    }
}

/// The sink-side buffered interval set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedRangeMap {
    ranges: Vec<BufferedRange>,
}

impl BufferedRangeMap {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Insert a newly-buffered span at `bitrate`.
    ///
    /// Neighbours carrying the same bitrate that overlap or touch the new
    /// span are absorbed into it. Neighbours at a *different* bitrate are
    /// trimmed to the parts that fall outside `[start, end]` instead —
    /// the new, higher- or lower-quality data wins the overlapped portion.
    pub fn insert(&mut self, bitrate: u64, start: f64, end: f64) {
        let mut new_start = start;
        let mut new_end = end;
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);

        for r in self.ranges.drain(..) {
            if !r.touches(new_start, new_end) {
                kept.push(r);
                continue;
            }
            if r.bitrate == bitrate {
                new_start = new_start.min(r.start);
                new_end = new_end.max(r.end);
            } else {
                if r.start < new_start {
                    kept.push(BufferedRange::new(r.bitrate, r.start, new_start.min(r.end)));
                }
                if r.end > new_end {
                    kept.push(BufferedRange::new(r.bitrate, new_end.max(r.start), r.end));
                }
            }
        }
        kept.push(BufferedRange::new(bitrate, new_start, new_end));
        kept.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());
        self.ranges = kept;
    }

    /// Remove a span, splitting or truncating any range it cuts through.
    pub fn remove(&mut self, start: f64, end: f64) {
        let mut next = Vec::with_capacity(self.ranges.len());
        for r in &self.ranges {
            if end <= r.start || start >= r.end {
                next.push(*r);
                continue;
            }
            if start > r.start {
                next.push(BufferedRange::new(r.bitrate, r.start, start));
            }
            if end < r.end {
                next.push(BufferedRange::new(r.bitrate, end, r.end));
            }
        }
        self.ranges = next;
    }

    /// The range containing `time`, if any.
    pub fn get_range(&self, time: f64) -> Option<BufferedRange> {
        self.ranges.iter().copied().find(|r| r.contains(time))
    }

    /// The ranges that do *not* contain `time` — everything "outside" the
    /// current playback range, used by the garbage collector to decide
    /// what's safe to evict.
    pub fn get_outer_ranges(&self, time: f64) -> Vec<BufferedRange> {
        self.ranges
            .iter()
            .copied()
            .filter(|r| !r.contains(time))
            .collect()
    }

    /// Distance from `time` to the start of the next buffered range, or
    /// `0.0` if `time` already falls within a range.
    pub fn get_gap(&self, time: f64) -> f64 {
        if self.get_range(time).is_some() {
            return 0.0;
        }
        self.ranges
            .iter()
            .filter(|r| r.start > time)
            .map(|r| r.start - time)
            .fold(f64::INFINITY, f64::min)
    }

    /// Whether `[start, end]` is fully covered by a single buffered range,
    /// regardless of its bitrate.
    pub fn has_range(&self, start: f64, end: f64) -> bool {
        self.ranges
            .iter()
            .any(|r| r.start <= start + EPSILON && r.end >= end - EPSILON)
    }

    /// Whether `[start, end]` is already covered by a single range buffered
    /// at `min_bitrate` or above — the bitrate-aware redundancy check
    /// spec.md §4.4 step 5 uses to decide a pending segment doesn't need
    /// re-fetching at the current representation's bitrate.
    pub fn covers_at_bitrate(&self, start: f64, end: f64, min_bitrate: u64) -> bool {
        self.ranges
            .iter()
            .any(|r| r.bitrate >= min_bitrate && r.start <= start + EPSILON && r.end >= end - EPSILON)
    }

    /// The ranges present in both sets (by overlap), used to detect
    /// discontinuities between what the sink reports and what the index
    /// expects. The overlapped span is reported at `self`'s bitrate; this
    /// is a time-overlap helper, not a quality merge.
    pub fn intersect(&self, other: &BufferedRangeMap) -> Vec<BufferedRange> {
        let mut out = Vec::new();
        for a in &self.ranges {
            for b in &other.ranges {
                let start = a.start.max(b.start);
                let end = a.end.min(b.end);
                if start < end {
                    out.push(BufferedRange::new(a.bitrate, start, end));
                }
            }
        }
        out
    }

    pub fn equals(&self, other: &BufferedRangeMap) -> bool {
        self.ranges.len() == other.ranges.len()
            && self.ranges.iter().zip(other.ranges.iter()).all(|(a, b)| {
                a.bitrate == b.bitrate
                    && (a.start - b.start).abs() < EPSILON
                    && (a.end - b.end).abs() < EPSILON
            })
    }

    pub fn ranges(&self) -> &[BufferedRange] {
        &self.ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_merges_overlapping_ranges_of_the_same_bitrate() {
        let mut m = BufferedRangeMap::new();
        m.insert(1_000, 0.0, 5.0);
        m.insert(1_000, 4.0, 10.0);
        assert_eq!(m.ranges(), &[BufferedRange::new(1_000, 0.0, 10.0)]);
    }

    #[test]
    fn insert_merges_touching_ranges_of_the_same_bitrate() {
        let mut m = BufferedRangeMap::new();
        m.insert(1_000, 0.0, 5.0);
        m.insert(1_000, 5.0, 10.0);
        assert_eq!(m.ranges().len(), 1);
    }

    #[test]
    fn insert_keeps_disjoint_ranges_separate() {
        let mut m = BufferedRangeMap::new();
        m.insert(1_000, 0.0, 5.0);
        m.insert(1_000, 10.0, 15.0);
        assert_eq!(m.ranges().len(), 2);
    }

    #[test]
    fn insert_at_a_different_bitrate_trims_instead_of_merging() {
        let mut m = BufferedRangeMap::new();
        m.insert(500, 0.0, 10.0);
        // Replace the middle third at a higher bitrate.
        m.insert(2_000, 4.0, 6.0);
        assert_eq!(
            m.ranges(),
            &[
                BufferedRange::new(500, 0.0, 4.0),
                BufferedRange::new(2_000, 4.0, 6.0),
                BufferedRange::new(500, 6.0, 10.0),
            ]
        );
    }

    #[test]
    fn insert_at_a_different_bitrate_fully_overlapping_replaces_the_range() {
        let mut m = BufferedRangeMap::new();
        m.insert(500, 2.0, 4.0);
        m.insert(2_000, 0.0, 10.0);
        assert_eq!(m.ranges(), &[BufferedRange::new(2_000, 0.0, 10.0)]);
    }

    #[test]
    fn get_range_finds_containing_range_and_its_bitrate() {
        let mut m = BufferedRangeMap::new();
        m.insert(500, 0.0, 5.0);
        m.insert(2_000, 10.0, 15.0);
        assert_eq!(m.get_range(12.0), Some(BufferedRange::new(2_000, 10.0, 15.0)));
        assert_eq!(m.get_range(7.0), None);
    }

    #[test]
    fn get_gap_measures_distance_to_next_range() {
        let mut m = BufferedRangeMap::new();
        m.insert(500, 10.0, 15.0);
        assert_eq!(m.get_gap(7.0), 3.0);
        assert_eq!(m.get_gap(12.0), 0.0);
    }

    #[test]
    fn remove_splits_a_range_in_two_and_preserves_bitrate() {
        let mut m = BufferedRangeMap::new();
        m.insert(500, 0.0, 10.0);
        m.remove(4.0, 6.0);
        assert_eq!(
            m.ranges(),
            &[BufferedRange::new(500, 0.0, 4.0), BufferedRange::new(500, 6.0, 10.0)]
        );
    }

    #[test]
    fn has_range_requires_full_coverage_regardless_of_bitrate() {
        let mut m = BufferedRangeMap::new();
        m.insert(500, 0.0, 10.0);
        assert!(m.has_range(2.0, 8.0));
        assert!(!m.has_range(2.0, 12.0));
    }

    #[test]
    fn covers_at_bitrate_rejects_ranges_below_the_floor() {
        let mut m = BufferedRangeMap::new();
        m.insert(500, 0.0, 10.0);
        assert!(!m.covers_at_bitrate(2.0, 8.0, 1_000));
        assert!(m.covers_at_bitrate(2.0, 8.0, 500));
    }

    #[test]
    fn intersect_finds_overlap() {
        let mut a = BufferedRangeMap::new();
        a.insert(500, 0.0, 10.0);
        let mut b = BufferedRangeMap::new();
        b.insert(500, 5.0, 15.0);
        assert_eq!(a.intersect(&b), vec![BufferedRange::new(500, 5.0, 10.0)]);
    }

    #[test]
    fn equals_ignores_floating_point_noise() {
        let mut a = BufferedRangeMap::new();
        a.insert(500, 0.0, 10.0);
        let mut b = BufferedRangeMap::new();
        b.insert(500, 0.0 + 1e-6, 10.0 - 1e-6);
        assert!(a.equals(&b));
    }
}
