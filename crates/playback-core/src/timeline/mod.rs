//! Timeline indexing: mapping a playback position to segment references.
//!
//! Two concrete shapes share one trait, the way DASH manifests come in a
//! `SegmentList` flavor and a `SegmentTemplate`-with-`SegmentTimeline`
//! flavor: [`ListIndex`] holds an explicit, finite vec of segments;
//! [`TemplateIndex`] derives segments from a run-length-encoded timeline
//! that can grow as a live manifest refreshes.

mod list;
mod segment_ref;
mod template;

pub use list::ListIndex;
pub use segment_ref::SegmentReference;
pub use template::{TemplateIndex, TimelineEntry};

use crate::error::TimelineError;

/// Shared contract for both timeline representations.
///
/// Positions and durations are expressed in seconds throughout; callers
/// are expected to have already converted from the manifest's native
/// timescale.
pub trait TimelineIndex: Send + Sync {
    /// Every segment whose `[start, end)` interval intersects
    /// `[from, from + duration)`.
    fn get_segments(&self, from: f64, duration: f64) -> Result<Vec<SegmentReference>, TimelineError>;

    /// Whether the index needs a manifest refresh before more segments can
    /// be produced (always `false` for a static [`ListIndex`]).
    fn should_refresh(&self, position: f64) -> bool;

    /// Earliest position the index currently knows about, if any.
    fn first_position(&self) -> Option<f64>;

    /// Latest known position (start of the last known segment's end), if
    /// any.
    fn last_position(&self) -> Option<f64>;

    /// Compares `position` against the segment that would be played next,
    /// returning:
    /// - `Some(delta)` where `delta > 0` means a gap of `delta` seconds
    ///   must be skipped to reach the next available segment,
    /// - `Some(-1.0)` for "no discontinuity" (same segment or already
    ///   behind — distinguished only in the trace log, see DESIGN.md §9(c)),
    /// - `None` if `position` is out of the index entirely.
    fn check_discontinuity(&self, position: f64) -> Option<f64>;

    /// Feed freshly-parsed segment info into the index (a no-op for a
    /// static [`ListIndex`]). Returns whether this call actually changed
    /// the index — `false` when handed information it already knows,
    /// so callers can apply the same `(nextSegments, currentSegment)` pair
    /// repeatedly without side effects.
    fn add_segment_infos(&mut self, segments: Vec<SegmentReference>) -> bool;

    /// The representation's initialization segment, if it has one and it
    /// hasn't already been synthesized from the manifest. `None` for a
    /// static [`ListIndex`], whose segments are self-initializing.
    fn init_segment(&self) -> Option<SegmentReference> {
        None
    }
}

#[cfg(test)]
pub(crate) fn sample_segments(representation: &str, count: u64, duration: f64) -> Vec<SegmentReference> {
    use crate::media_type::RepresentationId;
    (0..count)
        .map(|n| SegmentReference {
            representation_id: RepresentationId::from(representation),
            start: n as f64 * duration,
            duration,
            number: n,
            resolved_url: None,
            is_init: false,
        })
        .collect()
}
