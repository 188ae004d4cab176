use super::{SegmentReference, TimelineIndex};
use crate::error::TimelineError;

/// A finite, fully-known segment list (DASH `SegmentList` / static HLS
/// media playlist). Never refreshes.
#[derive(Debug, Clone, Default)]
pub struct ListIndex {
    segments: Vec<SegmentReference>,
}

impl ListIndex {
    pub fn new(mut segments: Vec<SegmentReference>) -> Self {
        segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());
        Self { segments }
    }

    fn index_at(&self, position: f64) -> Option<usize> {
        self.segments.iter().position(|s| s.contains(position))
    }
}

impl TimelineIndex for ListIndex {
    fn get_segments(&self, from: f64, duration: f64) -> Result<Vec<SegmentReference>, TimelineError> {
        if self.segments.is_empty() {
            return Err(TimelineError::Empty);
        }
        let to = from + duration;
        let found: Vec<_> = self
            .segments
            .iter()
            .filter(|s| s.start < to && s.end() > from)
            .cloned()
            .collect();
        if found.is_empty() {
            return Err(TimelineError::OutOfIndex {
                position: from,
                first: self.first_position(),
                last: self.last_position(),
            });
        }
        Ok(found)
    }

    fn should_refresh(&self, _position: f64) -> bool {
        false
    }

    fn first_position(&self) -> Option<f64> {
        self.segments.first().map(|s| s.start)
    }

    fn last_position(&self) -> Option<f64> {
        self.segments.last().map(|s| s.end())
    }

    fn check_discontinuity(&self, position: f64) -> Option<f64> {
        if position <= 0.0 {
            return Some(-1.0);
        }
        let first = self.first_position()?;
        let last = self.last_position()?;
        if position < first {
            return Some(first - position);
        }
        if position >= last {
            return None;
        }
        match self.index_at(position) {
            Some(_) => Some(-1.0),
            None => {
                let next_start = self
                    .segments
                    .iter()
                    .map(|s| s.start)
                    .find(|&start| start > position)?;
                Some(next_start - position)
            }
        }
    }

    fn add_segment_infos(&mut self, _segments: Vec<SegmentReference>) -> bool {
        // A static list never grows.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::sample_segments;

    #[test]
    fn get_segments_returns_everything_intersecting_the_window() {
        let idx = ListIndex::new(sample_segments("r1", 5, 4.0));
        let segs = idx.get_segments(3.0, 5.0).unwrap();
        // window [3, 8) intersects segments at [0,4) and [4,8)
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].number, 0);
        assert_eq!(segs[1].number, 1);
    }

    #[test]
    fn get_segments_out_of_index_past_the_end() {
        let idx = ListIndex::new(sample_segments("r1", 3, 4.0));
        let err = idx.get_segments(100.0, 4.0).unwrap_err();
        assert!(matches!(err, TimelineError::OutOfIndex { .. }));
    }

    #[test]
    fn empty_index_reports_empty_error() {
        let idx = ListIndex::new(vec![]);
        assert!(matches!(idx.get_segments(0.0, 1.0), Err(TimelineError::Empty)));
    }

    #[test]
    fn check_discontinuity_reports_no_gap_inside_a_segment() {
        let idx = ListIndex::new(sample_segments("r1", 5, 4.0));
        assert_eq!(idx.check_discontinuity(5.0), Some(-1.0));
    }

    #[test]
    fn check_discontinuity_reports_gap_before_first_segment() {
        let idx = ListIndex::new(sample_segments("r1", 5, 4.0));
        // shift the synthetic segments' window forward by constructing directly
        let segs = vec![SegmentReference {
            representation_id: "r1".into(),
            start: 10.0,
            duration: 4.0,
            number: 0,
            resolved_url: None,
            is_init: false,
        }];
        let idx = ListIndex::new(segs);
        assert_eq!(idx.check_discontinuity(2.0), Some(8.0));
        let _ = idx; // avoid unused-variable confusion from shadowed first idx
    }

    #[test]
    fn check_discontinuity_at_or_before_zero_is_never_a_gap() {
        let idx = ListIndex::new(sample_segments("r1", 5, 4.0));
        assert_eq!(idx.check_discontinuity(0.0), Some(-1.0));
        assert_eq!(idx.check_discontinuity(-3.0), Some(-1.0));
    }

    #[test]
    fn should_refresh_is_always_false() {
        let idx = ListIndex::new(sample_segments("r1", 1, 4.0));
        assert!(!idx.should_refresh(0.0));
    }
}
