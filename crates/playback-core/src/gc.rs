//! Garbage collection of buffered media outside the playback position's
//! reclaim window.
//!
//! No `mesio` analogue evicts from a native sink, so the two-phase window
//! algorithm is implemented directly from spec.md §4.5; the "apply one
//! `remove` at a time" discipline is borrowed from the same
//! sink-mutation serialization the scheduler relies on.

use crate::buffered_range::BufferedRangeMap;
use crate::config::GcConfig;
use crate::error::SinkError;
use crate::sink::MediaSink;
use tracing::debug;

pub struct GarbageCollector {
    config: GcConfig,
}

impl GarbageCollector {
    pub fn new(config: GcConfig) -> Self {
        Self { config }
    }

    /// Reclaim buffered ranges outside `[position - gap, position + gap]`,
    /// first with the generous `gap_calm` window and, only if that freed
    /// nothing, with the tighter `gap_beefy` window.
    pub async fn collect(&self, sink: &dyn MediaSink, position: f64) -> Result<usize, SinkError> {
        let removed = self.run_phase(sink, position, self.config.gap_calm.as_secs_f64()).await?;
        if removed > 0 {
            return Ok(removed);
        }
        debug!(position, "calm gc phase reclaimed nothing, escalating to beefy gap");
        self.run_phase(sink, position, self.config.gap_beefy.as_secs_f64()).await
    }

    async fn run_phase(&self, sink: &dyn MediaSink, position: f64, gap: f64) -> Result<usize, SinkError> {
        let mut map = BufferedRangeMap::new();
        for r in sink.buffered() {
            map.insert(r.bitrate, r.start, r.end);
        }

        let keep_start = position - gap;
        let keep_end = position + gap;

        let mut removed = 0;
        for range in map.get_outer_ranges(position) {
            if range.end <= keep_start {
                sink.remove(range.start, range.end).await?;
                removed += 1;
            } else if range.start >= keep_end {
                sink.remove(range.start, range.end).await?;
                removed += 1;
            } else if range.start < keep_start {
                sink.remove(range.start, keep_start).await?;
                removed += 1;
            } else if range.end > keep_end {
                sink.remove(keep_end, range.end).await?;
                removed += 1;
            }
        }

        // The range straddling the playhead itself isn't an "outer" range,
        // but it can still overhang the keep window on either side (e.g.
        // right after a seek leaves a wide range only partly inside the
        // new window) and needs trimming too.
        if let Some(inner) = map.get_range(position) {
            if inner.start < keep_start {
                sink.remove(inner.start, keep_start).await?;
                removed += 1;
            }
            if inner.end > keep_end {
                sink.remove(keep_end.max(inner.start), inner.end).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}
