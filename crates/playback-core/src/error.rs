//! Error types for the playback engine.
//!
//! Each concern gets its own `thiserror` enum; [`PlayerError`] aggregates
//! them at the crate boundary the way `mesio`'s top-level error wraps its
//! per-stage errors.

use thiserror::Error;

/// Errors raised by a [`crate::timeline::TimelineIndex`] implementation.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// The requested position falls outside the index's known range.
    ///
    /// Mirrors the source spec's `OutOfIndex`: the caller should refresh
    /// the manifest (live) or treat the stream as ended (static) before
    /// retrying.
    #[error("position {position} is out of index (known range: {first:?}..{last:?})")]
    OutOfIndex {
        position: f64,
        first: Option<f64>,
        last: Option<f64>,
    },

    /// The index has no segments at all yet.
    #[error("timeline index is empty")]
    Empty,
}

/// Errors raised while scheduling or injecting segments.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The scheduler was asked to run with no representations available.
    #[error("no representation available for media type {0:?}")]
    NoRepresentation(crate::media_type::MediaType),
}

impl SchedulerError {
    /// Whether the outer loop should simply retry the inner loop, as
    /// opposed to propagating the error to the player.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulerError::Fetch(FetchError::PreconditionFailed)
                | SchedulerError::Fetch(FetchError::Transient { .. })
        )
    }

    /// Whether this error should tear down playback entirely.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SchedulerError::Sink(SinkError::Fatal { .. }))
    }
}

/// Errors surfaced by a [`crate::fetch::FetchPipeline`] implementation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 412 — the segment is not yet available at the expected byte
    /// range/URL (common on low-latency live streams). Callers should
    /// wait and retry, never treat this as fatal.
    #[error("precondition failed (412)")]
    PreconditionFailed,

    /// Any other transient network/server failure worth a bounded retry.
    #[error("transient fetch failure: {reason}")]
    Transient { reason: String },

    /// A non-retryable failure: malformed segment, 4xx other than 412,
    /// or a parse error in the returned bytes.
    #[error("fetch failed: {reason}")]
    Fatal { reason: String },
}

/// Errors surfaced by a [`crate::sink::MediaSink`] implementation.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink's backing buffer is full; the caller should run the
    /// garbage collector and retry rather than treat this as fatal.
    #[error("sink quota exceeded")]
    QuotaExceeded,

    /// Any other sink failure that should abort playback of this media
    /// type.
    #[error("fatal sink error: {reason}")]
    Fatal { reason: String },
}

impl SinkError {
    pub fn quota_exceeded(&self) -> bool {
        matches!(self, SinkError::QuotaExceeded)
    }
}

/// Top-level error aggregating every concern, returned from the crate's
/// public `Player`/`Session` surface.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl PlayerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PlayerError::Scheduler(e) => e.is_retryable(),
            PlayerError::Fetch(FetchError::PreconditionFailed | FetchError::Transient { .. }) => {
                true
            }
            _ => false,
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            PlayerError::Scheduler(e) => e.is_fatal(),
            PlayerError::Sink(SinkError::Fatal { .. }) => true,
            _ => false,
        }
    }
}
