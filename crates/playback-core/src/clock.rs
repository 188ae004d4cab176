//! Clock and seek observation: derives `liveGap` from raw position ticks
//! and turns position discontinuities into seek events.
//!
//! No single `mesio` file models this directly — the tick-in,
//! derived-tick-out shape follows how `OutputManager::run` derives
//! gap/stall state from a raw input stream inside one `tokio::select!`
//! loop (see DESIGN.md).

use crate::config::ClockObserverConfig;

/// Coarse playback state as reported by the native media element, mirroring
/// the handful of states a seek detector actually needs to distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Seeking,
    Ended,
}

/// A raw position sample from the native media element.
#[derive(Debug, Clone, Copy)]
pub struct ClockTick {
    pub position: f64,
    /// Total duration of the content, if known (`Infinity`/`None` for an
    /// unbounded live stream).
    pub duration: Option<f64>,
    /// The live edge position, if this is a live stream.
    pub live_edge: Option<f64>,
    pub state: PlaybackState,
}

/// A tick enriched with derived playback state.
#[derive(Debug, Clone, Copy)]
pub struct DerivedTick {
    pub position: f64,
    pub duration: Option<f64>,
    /// Distance behind the live edge, if known.
    pub live_gap: Option<f64>,
}

/// Converts raw clock ticks into derived ticks. Emits a synthetic first
/// tick at construction time so downstream consumers always have an
/// initial reference point even before the media element fires its first
/// real `timeupdate`.
#[derive(Debug, Default)]
pub struct ClockObserver {
    last: Option<DerivedTick>,
}

impl ClockObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The synthetic tick emitted before any real tick has arrived.
    pub fn synthetic_first_tick(&mut self, initial_position: f64) -> DerivedTick {
        let tick = DerivedTick {
            position: initial_position,
            duration: None,
            live_gap: None,
        };
        self.last = Some(tick);
        tick
    }

    pub fn on_tick(&mut self, tick: ClockTick) -> DerivedTick {
        let live_gap = tick.live_edge.map(|edge| (edge - tick.position).max(0.0));
        let derived = DerivedTick {
            position: tick.position,
            duration: tick.duration,
            live_gap,
        };
        self.last = Some(derived);
        derived
    }

    pub fn last(&self) -> Option<DerivedTick> {
        self.last
    }
}

/// `bufferGap` threshold below which a `"seeking"` tick is classified as a
/// genuine seek rather than ordinary stall recovery.
const SEEK_BUFFER_GAP_THRESHOLD_SECS: f64 = -2.0;

/// Detects seeks from native media-element state and the sink's buffer
/// gap at the playback position, and, per
/// [`ClockObserverConfig::skip_initial_seek`], optionally suppresses the
/// very first one (the player's own initial seek to its start position).
///
/// A tick is a seek exactly when `state == Seeking` AND either the buffer
/// gap is `+Infinity` (nothing at all buffered ahead) or it is more
/// negative than -2s (the position jumped behind what's buffered, rather
/// than merely running dry at its leading edge).
#[derive(Debug)]
pub struct SeekObserver {
    config: ClockObserverConfig,
    seen_first_tick: bool,
    suppressed_initial: bool,
}

impl SeekObserver {
    pub fn new(config: ClockObserverConfig) -> Self {
        Self {
            config,
            seen_first_tick: false,
            suppressed_initial: false,
        }
    }

    /// Feed a new position sample; returns `Some(position)` if this
    /// constitutes a seek.
    pub fn observe(&mut self, position: f64, state: PlaybackState, buffer_gap: f64) -> Option<f64> {
        let is_first_tick = !self.seen_first_tick;
        self.seen_first_tick = true;

        let is_seek = state == PlaybackState::Seeking
            && (buffer_gap == f64::INFINITY || buffer_gap < SEEK_BUFFER_GAP_THRESHOLD_SECS);

        if !is_seek {
            return None;
        }

        if is_first_tick && self.config.skip_initial_seek && !self.suppressed_initial {
            self.suppressed_initial = true;
            return None;
        }

        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_first_tick_has_no_live_gap() {
        let mut clock = ClockObserver::new();
        let tick = clock.synthetic_first_tick(0.0);
        assert_eq!(tick.live_gap, None);
    }

    #[test]
    fn on_tick_derives_live_gap() {
        let mut clock = ClockObserver::new();
        let tick = clock.on_tick(ClockTick {
            position: 90.0,
            duration: None,
            live_edge: Some(100.0),
            state: PlaybackState::Playing,
        });
        assert_eq!(tick.live_gap, Some(10.0));
    }

    #[test]
    fn vod_tick_has_no_live_gap() {
        let mut clock = ClockObserver::new();
        let tick = clock.on_tick(ClockTick {
            position: 10.0,
            duration: Some(120.0),
            live_edge: None,
            state: PlaybackState::Playing,
        });
        assert_eq!(tick.live_gap, None);
    }

    #[test]
    fn playing_never_counts_as_a_seek_regardless_of_buffer_gap() {
        let mut seeks = SeekObserver::new(ClockObserverConfig::default());
        assert_eq!(seeks.observe(30.0, PlaybackState::Playing, f64::INFINITY), None);
    }

    #[test]
    fn seeking_with_infinite_buffer_gap_is_a_seek() {
        let mut seeks = SeekObserver::new(ClockObserverConfig { skip_initial_seek: false });
        assert_eq!(seeks.observe(30.0, PlaybackState::Seeking, f64::INFINITY), Some(30.0));
    }

    #[test]
    fn seeking_with_a_deeply_negative_buffer_gap_is_a_seek() {
        let mut seeks = SeekObserver::new(ClockObserverConfig { skip_initial_seek: false });
        assert_eq!(seeks.observe(30.0, PlaybackState::Seeking, -5.0), Some(30.0));
    }

    #[test]
    fn seeking_with_a_small_negative_buffer_gap_is_not_a_seek() {
        // A small negative gap is ordinary stall recovery, not a seek.
        let mut seeks = SeekObserver::new(ClockObserverConfig { skip_initial_seek: false });
        assert_eq!(seeks.observe(30.0, PlaybackState::Seeking, -0.5), None);
    }

    #[test]
    fn initial_seek_is_skipped_by_default() {
        let mut seeks = SeekObserver::new(ClockObserverConfig::default());
        assert_eq!(seeks.observe(30.0, PlaybackState::Seeking, f64::INFINITY), None);
        // A later, genuine seek still reports.
        assert_eq!(seeks.observe(90.0, PlaybackState::Seeking, f64::INFINITY), Some(90.0));
    }

    #[test]
    fn initial_seek_is_reported_when_not_skipped() {
        let mut seeks = SeekObserver::new(ClockObserverConfig { skip_initial_seek: false });
        assert_eq!(seeks.observe(30.0, PlaybackState::Seeking, f64::INFINITY), Some(30.0));
    }
}
