//! Host-supplied configuration, constructed and passed in by the embedding
//! application rather than parsed from environment or wire format — this
//! crate is a library, the way `mesio`'s `DownloaderConfig` is.

use std::time::Duration;

/// Ratio a buffered range's bitrate must meet or exceed, relative to the
/// current representation's bitrate, for the scheduler to treat a segment
/// as already satisfied and skip re-fetching it (spec.md §4.4 step 5's
/// `BITRATE_REBUFFERING_RATIO`). This is a *scheduler* redundancy-gate
/// constant, distinct from the ABR chooser's own bitrate ceiling math.
pub const BITRATE_REBUFFERING_RATIO: f64 = 1.5;

pub const GC_GAP_CALM_SECS: f64 = 240.0;
pub const GC_GAP_BEEFY_SECS: f64 = 30.0;

/// Stability window the ABR chooser waits before accepting a downward
/// switch triggered by a single low estimate.
pub const ABR_STABILITY_WINDOW_SECS: f64 = 2.0;

/// Default `wantedBufferSize` (spec.md §6 load option), the target amount
/// of media to keep buffered ahead of the playback position.
pub const DEFAULT_WANTED_BUFFER_SIZE_SECS: f64 = 30.0;

/// Configuration for one [`crate::abr::RepresentationChooser`] instance.
#[derive(Debug, Clone)]
pub struct AbrConfig {
    pub stability_window: Duration,
    pub initial_bitrate: Option<u64>,
    /// Pins the chooser to one bitrate, bypassing estimation entirely
    /// (spec.md's `setManualBitrate` / `None` to clear).
    pub manual_bitrate: Option<u64>,
    /// Ceiling on automatic (non-manual) selection (`setMaxAutoBitrate`).
    pub max_auto_bitrate: Option<u64>,
    /// Rendering surface width; representations wider than this are
    /// filtered out of consideration when something narrower fits
    /// (`setLimitWidth` / viewport filtering).
    pub limit_width: Option<u32>,
    /// External bitrate ceiling (e.g. a user-configured data-saver cap or
    /// network throttle), applied alongside `max_auto_bitrate`.
    pub throttle: Option<u64>,
}

impl Default for AbrConfig {
    fn default() -> Self {
        Self {
            stability_window: Duration::from_secs_f64(ABR_STABILITY_WINDOW_SECS),
            initial_bitrate: None,
            manual_bitrate: None,
            max_auto_bitrate: None,
            limit_width: None,
            throttle: None,
        }
    }
}

impl AbrConfig {
    pub fn builder() -> AbrConfigBuilder {
        AbrConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct AbrConfigBuilder {
    inner: AbrConfigOverrides,
}

#[derive(Debug, Default)]
struct AbrConfigOverrides {
    stability_window: Option<Duration>,
    initial_bitrate: Option<u64>,
    manual_bitrate: Option<u64>,
    max_auto_bitrate: Option<u64>,
    limit_width: Option<u32>,
    throttle: Option<u64>,
}

impl AbrConfigBuilder {
    pub fn stability_window(mut self, window: Duration) -> Self {
        self.inner.stability_window = Some(window);
        self
    }

    pub fn initial_bitrate(mut self, bitrate: u64) -> Self {
        self.inner.initial_bitrate = Some(bitrate);
        self
    }

    pub fn manual_bitrate(mut self, bitrate: u64) -> Self {
        self.inner.manual_bitrate = Some(bitrate);
        self
    }

    pub fn max_auto_bitrate(mut self, bitrate: u64) -> Self {
        self.inner.max_auto_bitrate = Some(bitrate);
        self
    }

    pub fn limit_width(mut self, width: u32) -> Self {
        self.inner.limit_width = Some(width);
        self
    }

    pub fn throttle(mut self, bitrate: u64) -> Self {
        self.inner.throttle = Some(bitrate);
        self
    }

    pub fn build(self) -> AbrConfig {
        let defaults = AbrConfig::default();
        AbrConfig {
            stability_window: self.inner.stability_window.unwrap_or(defaults.stability_window),
            initial_bitrate: self.inner.initial_bitrate,
            manual_bitrate: self.inner.manual_bitrate,
            max_auto_bitrate: self.inner.max_auto_bitrate,
            limit_width: self.inner.limit_width,
            throttle: self.inner.throttle,
        }
    }
}

/// Per-[`crate::media_type::MediaType`] scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Upper bound on concurrently in-flight segment fetches.
    pub fetch_concurrency: usize,
    /// Flat wait applied after an HTTP 412 before retrying (spec.md §4.4).
    pub precondition_retry_delay: Duration,
    /// Target buffer depth ahead of the playback position (`wantedBufferSize`).
    pub wanted_buffer_size: f64,
    /// See [`BITRATE_REBUFFERING_RATIO`].
    pub redundancy_ratio: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: 3,
            precondition_retry_delay: Duration::from_secs(2),
            wanted_buffer_size: DEFAULT_WANTED_BUFFER_SIZE_SECS,
            redundancy_ratio: BITRATE_REBUFFERING_RATIO,
        }
    }
}

/// Garbage collector tuning; defaults match spec.md §4.5 exactly.
#[derive(Debug, Clone)]
pub struct GcConfig {
    pub gap_calm: Duration,
    pub gap_beefy: Duration,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            gap_calm: Duration::from_secs_f64(GC_GAP_CALM_SECS),
            gap_beefy: Duration::from_secs_f64(GC_GAP_BEEFY_SECS),
        }
    }
}

/// Clock/seek observer tuning.
#[derive(Debug, Clone)]
pub struct ClockObserverConfig {
    /// Whether the very first `seekings` emission (the player's own
    /// initial seek to its start position) should be suppressed. See
    /// DESIGN.md Open Question (a).
    pub skip_initial_seek: bool,
}

impl Default for ClockObserverConfig {
    fn default() -> Self {
        Self {
            skip_initial_seek: true,
        }
    }
}

/// Where playback should start, mirroring the constructor/`load()` option
/// surface from spec.md §6.
#[derive(Debug, Clone, Copy)]
pub enum StartAt {
    Position(f64),
    LiveEdge,
    Beginning,
}

/// Options supplied once, at player construction.
#[derive(Debug, Clone, Default)]
pub struct PlayerOptions {
    pub clock: ClockObserverConfig,
    pub gc: GcConfig,
}

/// Options supplied per `load()` call (i.e. per new piece of content).
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start_at: StartAt,
    pub abr: AbrConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            start_at: StartAt::Beginning,
            abr: AbrConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}
