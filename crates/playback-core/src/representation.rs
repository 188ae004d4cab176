//! The data-model types from spec.md §3 that aren't already their own
//! module (timeline, buffered ranges).

use crate::media_type::{AdaptationId, MediaType, PeriodId, RepresentationId};

/// One encoded quality level of an [`Adaptation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub id: RepresentationId,
    pub bitrate: u64,
    /// Pixel width, used by the ABR chooser's viewport-width filter.
    /// `0` for non-visual media (audio, text).
    pub width: u32,
    /// Pixel height; informational only, the chooser filters on width.
    pub height: u32,
    pub codec: Option<std::sync::Arc<str>>,
}

/// A group of interchangeable [`Representation`]s for one media type
/// within a period (DASH `AdaptationSet` / HLS variant group).
#[derive(Debug, Clone)]
pub struct Adaptation {
    pub id: AdaptationId,
    pub period_id: PeriodId,
    pub media_type: MediaType,
    pub representations: Vec<Representation>,
}

impl Adaptation {
    pub fn representation(&self, id: &RepresentationId) -> Option<&Representation> {
        self.representations.iter().find(|r| &r.id == id)
    }
}
