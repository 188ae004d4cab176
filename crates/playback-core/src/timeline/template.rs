use super::{SegmentReference, TimelineIndex};
use crate::error::TimelineError;
use crate::media_type::RepresentationId;
use std::sync::Arc;
use tracing::trace;

const EPSILON: f64 = 1e-6;

/// Sentinel for an entry whose true duration isn't known yet — DASH's
/// `<S t= d="-1">`, used by a live `SegmentTimeline` to announce a segment
/// exists before its end time has been observed.
const OPEN_ENDED_DURATION: f64 = -1.0;

/// Sentinel for "repeat until the next `<S>` element or the period ends" —
/// DASH's negative `r` attribute.
const INDEFINITE_REPEAT: i32 = -1;

/// One run-length-encoded entry of a `SegmentTemplate`+`SegmentTimeline`
/// manifest — a start time and duration repeated `repeat_count + 1` times,
/// matching DASH's `<S t= d= r=>` element. `duration < 0` marks an
/// open-ended entry (`d="-1"`); `repeat_count < 0` marks an indefinite
/// repeat (negative `r`) that only makes sense on the timeline's last
/// entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineEntry {
    pub start: f64,
    pub duration: f64,
    pub repeat_count: i32,
}

impl TimelineEntry {
    fn is_open_ended(&self) -> bool {
        self.duration < 0.0
    }

    fn is_indefinite(&self) -> bool {
        self.repeat_count < 0
    }
}

/// A live (or VOD-with-timeline) index that expands run-length entries
/// into segments on demand and can grow as the manifest refreshes.
#[derive(Debug, Clone)]
pub struct TemplateIndex {
    representation_id: RepresentationId,
    media_template: Arc<str>,
    init_template: Option<Arc<str>>,
    entries: Vec<TimelineEntry>,
    /// Whether this manifest is still live (refreshable) or has reached
    /// its `@type="static"` end.
    live: bool,
    /// Start of the most recently accepted `add_segment_infos` entry, used
    /// to make repeated calls with the same (or older) info idempotent.
    last_known_start: Option<f64>,
}

impl TemplateIndex {
    pub fn new(representation_id: RepresentationId, media_template: impl Into<Arc<str>>, live: bool) -> Self {
        Self {
            representation_id,
            media_template: media_template.into(),
            init_template: None,
            entries: Vec::new(),
            live,
            last_known_start: None,
        }
    }

    pub fn with_init_segment(mut self, init_template: impl Into<Arc<str>>) -> Self {
        self.init_template = Some(init_template.into());
        self
    }

    /// Expand every entry up to (but not including) `end_bound`. An
    /// indefinite trailing entry (open-ended duration or negative repeat)
    /// is synthesized only as far as `end_bound` requires, rather than
    /// eagerly — there is no fixed number of segments to enumerate.
    fn expand_until(&self, end_bound: f64) -> Vec<SegmentReference> {
        let mut out = Vec::new();
        let mut number = 0u64;
        let last_idx = self.entries.len().saturating_sub(1);

        for (idx, entry) in self.entries.iter().enumerate() {
            let is_last = idx == last_idx;

            if entry.is_open_ended() {
                // A single segment whose end isn't known yet; report it as
                // spanning to the current known bound.
                let end = end_bound.max(entry.start);
                out.push(self.make_segment(number, entry.start, end - entry.start));
                number += 1;
                continue;
            }

            let reps = if entry.is_indefinite() {
                if is_last && entry.duration > 0.0 {
                    (((end_bound - entry.start) / entry.duration).ceil().max(1.0)) as u32
                } else {
                    1
                }
            } else {
                entry.repeat_count as u32 + 1
            };

            for rep in 0..reps {
                let start = entry.start + rep as f64 * entry.duration;
                if start >= end_bound && rep > 0 {
                    break;
                }
                out.push(self.make_segment(number, start, entry.duration));
                number += 1;
            }
        }
        out
    }

    fn make_segment(&self, number: u64, start: f64, duration: f64) -> SegmentReference {
        SegmentReference {
            representation_id: self.representation_id.clone(),
            start,
            duration,
            number,
            resolved_url: Some(self.resolve_url(number)),
            is_init: false,
        }
    }

    fn resolve_url(&self, number: u64) -> Arc<str> {
        // Matches mesio's "pre-parsed, avoid reallocating per dispatch" trick.
        Arc::from(self.media_template.replace("$Number$", &number.to_string()))
    }

    /// Add one segment's real start/duration, deducing an open-ended
    /// trailing entry's duration along the way and skipping anything
    /// already known (idempotent on repeated `(nextSegments, currentSegment)`
    /// calls).
    fn add_one_segment(&mut self, seg: SegmentReference) -> bool {
        if let Some(last_start) = self.last_known_start {
            if seg.start <= last_start + EPSILON {
                return false;
            }
        }

        // Deduce an open-ended trailing entry's duration from where the
        // next segment actually starts.
        if let Some(last) = self.entries.last_mut() {
            if last.is_open_ended() {
                last.duration = (seg.start - last.start).max(0.0);
            }
        }

        let contiguous = self
            .last_position()
            .map(|end| (seg.start - end).abs() < EPSILON)
            .unwrap_or(false);

        if contiguous {
            if let Some(last) = self.entries.last_mut() {
                if !last.is_indefinite() && (last.duration - seg.duration).abs() < EPSILON {
                    last.repeat_count += 1;
                    self.last_known_start = Some(seg.start);
                    return true;
                }
            }
        }

        self.entries.push(TimelineEntry {
            start: seg.start,
            duration: seg.duration,
            repeat_count: 0,
        });
        self.last_known_start = Some(seg.start);
        true
    }
}

impl TimelineIndex for TemplateIndex {
    fn get_segments(&self, from: f64, duration: f64) -> Result<Vec<SegmentReference>, TimelineError> {
        if self.entries.is_empty() {
            return Err(TimelineError::Empty);
        }
        let to = from + duration;
        let segments = self.expand_until(to);
        let found: Vec<_> = segments
            .into_iter()
            .filter(|s| s.start < to && s.end() > from)
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

    fn should_refresh(&self, position: f64) -> bool {
        if !self.live {
            return false;
        }
        match self.last_position() {
            // Refresh once we're within one segment duration of the known edge.
            Some(last) => {
                let last_entry_duration = self.entries.last().map(|e| e.duration.max(0.0)).unwrap_or(0.0);
                position + last_entry_duration >= last
            }
            // Open-ended or indefinite trailing entry: the edge keeps
            // moving, always eligible for a refresh.
            None => true,
        }
    }

    fn first_position(&self) -> Option<f64> {
        self.entries.first().map(|e| e.start)
    }

    fn last_position(&self) -> Option<f64> {
        let last = self.entries.last()?;
        if last.is_open_ended() || last.is_indefinite() {
            None
        } else {
            Some(last.start + (last.repeat_count as f64 + 1.0) * last.duration)
        }
    }

    fn check_discontinuity(&self, position: f64) -> Option<f64> {
        if position <= 0.0 {
            return Some(-1.0);
        }
        let first = self.first_position()?;
        let last = self.last_position().unwrap_or(f64::INFINITY);
        if position < first {
            trace!(position, first, "discontinuity: behind known window start");
            return Some(first - position);
        }
        if position >= last {
            return None;
        }
        let segments = self.expand_until(position + 1.0);
        let containing = segments.iter().find(|s| s.contains(position));
        match containing {
            Some(seg) => {
                trace!(position, segment_number = seg.number, reason = "same_segment", "no discontinuity");
                Some(-1.0)
            }
            None => {
                let next_start = segments.iter().map(|s| s.start).find(|&start| start > position)?;
                trace!(position, reason = "behind", gap = next_start - position, "discontinuity ahead");
                Some(next_start - position)
            }
        }
    }

    fn add_segment_infos(&mut self, segments: Vec<SegmentReference>) -> bool {
        let mut changed = false;
        for seg in segments {
            if self.add_one_segment(seg) {
                changed = true;
            }
        }
        changed
    }

    fn init_segment(&self) -> Option<SegmentReference> {
        let template = self.init_template.as_ref()?;
        Some(SegmentReference {
            representation_id: self.representation_id.clone(),
            start: 0.0,
            duration: 0.0,
            number: 0,
            resolved_url: Some(template.clone()),
            is_init: true,
        })
    }
}
