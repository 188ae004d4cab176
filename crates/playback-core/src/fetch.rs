//! The fetch+parse pipeline contract: everything network- and
//! demux-shaped lives behind this trait, outside this crate's scope.

use crate::error::FetchError;
use crate::timeline::SegmentReference;
use async_trait::async_trait;
use bytes::Bytes;

/// One unit of work handed to a [`FetchPipeline`].
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub segment: SegmentReference,
}

/// The result of fetching and parsing one segment, ready for
/// [`crate::sink::MediaSink::append`].
#[derive(Debug, Clone)]
pub struct ParsedSegment {
    pub segment: SegmentReference,
    pub bytes: Bytes,
    /// The segment's real duration as discovered while parsing its
    /// container, when it differs from (or refines) the timeline's
    /// estimate — e.g. an open-ended live `SegmentTimeline` entry whose
    /// true length is only known once the segment itself is in hand.
    /// Fed back into [`crate::timeline::TimelineIndex::add_segment_infos`].
    pub actual_duration: Option<f64>,
}

/// Fetches and parses segments. Network transport, manifest parsing, and
/// demuxing are external collaborators implemented on the other side of
/// this trait.
#[async_trait]
pub trait FetchPipeline: Send + Sync {
    async fn fetch(&self, job: FetchJob) -> Result<ParsedSegment, FetchError>;
}
