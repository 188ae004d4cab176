//! The media sink contract: the native buffer the scheduler appends to
//! and the garbage collector evicts from.
//!
//! Shaped after `mesio`'s `SegmentDownloader` trait: an async trait object
//! with `Send + Sync` bounds so it can be shared across the scheduler's
//! task and the garbage collector's.

use crate::buffered_range::BufferedRange;
use crate::error::SinkError;
use async_trait::async_trait;
use bytes::Bytes;

/// A single-operation-at-a-time native media buffer.
///
/// Implementations must guarantee that only one `append`/`remove` future
/// is ever polled to completion at a time — the scheduler's `tokio::Mutex`
/// guard around the sink handle exists to enforce exactly this.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Append a parsed segment's bytes to the buffer at `bitrate`, which
    /// the sink records against the resulting buffered range so
    /// [`buffered`](Self::buffered) can report quality per span.
    async fn append(&self, bitrate: u64, blob: Bytes) -> Result<(), SinkError>;

    /// Evict `[start, end)` from the buffer.
    async fn remove(&self, start: f64, end: f64) -> Result<(), SinkError>;

    /// The sink's current buffered ranges.
    fn buffered(&self) -> Vec<BufferedRange>;

    /// Whether a mutation is currently in flight.
    fn updating(&self) -> bool;
}
