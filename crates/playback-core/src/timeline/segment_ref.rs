//! The unit a [`super::TimelineIndex`] hands to the scheduler.

use crate::media_type::RepresentationId;
use std::sync::Arc;

/// A single addressable media segment.
///
/// `resolved_url` mirrors `mesio`'s `ScheduledSegmentJob` caching a
/// pre-parsed URL: once a template has been expanded into a concrete
/// address, callers shouldn't pay to re-derive it on every dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentReference {
    pub representation_id: RepresentationId,
    /// Start time of this segment on the period timeline, in seconds.
    pub start: f64,
    /// Duration of this segment, in seconds.
    pub duration: f64,
    /// Monotonically increasing segment number within its representation,
    /// used to detect "same segment" vs. "behind" in discontinuity checks.
    pub number: u64,
    /// Pre-resolved, already-expanded URL, if the index has one ready.
    pub resolved_url: Option<Arc<str>>,
    /// Whether this is the representation's initialization segment rather
    /// than a media segment — carries no timeline position of its own and
    /// must be appended before any media segment after a fresh
    /// representation (re)subscription (spec.md §4.4 step 4).
    pub is_init: bool,
}

impl SegmentReference {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }
}
