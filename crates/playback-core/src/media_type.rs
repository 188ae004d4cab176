//! Media type discriminant and its per-type scheduling table.

use std::fmt;
use std::sync::Arc;

/// Which kind of track a [`crate::timeline::SegmentReference`],
/// [`crate::abr::RepresentationChooser`], or [`crate::scheduler::SegmentScheduler`]
/// instance is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
    Text,
    Image,
}

impl MediaType {
    /// Low water mark padding, in seconds, ahead of the playback position
    /// before the scheduler starts loading more.
    pub const fn low_water_mark_pad(self) -> u32 {
        match self {
            MediaType::Video => 4,
            MediaType::Audio | MediaType::Text | MediaType::Image => 1,
        }
    }

    /// High water mark padding, in seconds, the scheduler stops loading at.
    pub const fn high_water_mark_pad(self) -> u32 {
        match self {
            MediaType::Video => 6,
            MediaType::Audio | MediaType::Text | MediaType::Image => 1,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Text => "text",
            MediaType::Image => "image",
        };
        f.write_str(s)
    }
}

/// Cheap, clonable stable key types that break the Scheduler <-> TimelineIndex
/// <-> manifest reference cycle (see DESIGN.md).
macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub Arc<str>);

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(Arc::from(s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(RepresentationId);
id_newtype!(PeriodId);
id_newtype!(AdaptationId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_has_wider_water_marks_than_audio() {
        assert!(MediaType::Video.low_water_mark_pad() > MediaType::Audio.low_water_mark_pad());
        assert!(MediaType::Video.high_water_mark_pad() > MediaType::Audio.high_water_mark_pad());
    }

    #[test]
    fn ids_compare_by_value() {
        let a: RepresentationId = "rep-1".into();
        let b: RepresentationId = "rep-1".into();
        assert_eq!(a, b);
    }
}
