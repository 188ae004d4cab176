//! Owns one [`RepresentationChooser`] per [`MediaType`], the way
//! `mesio`'s `HlsStreamCoordinator` owns one instance of each per-concern
//! component rather than a single shared one.

use super::chooser::RepresentationChooser;
use crate::config::AbrConfig;
use crate::media_type::{MediaType, RepresentationId};
use crate::representation::Representation;
use std::collections::HashMap;

#[derive(Default)]
pub struct AbrManager {
    choosers: HashMap<MediaType, RepresentationChooser>,
}

impl AbrManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, media_type: MediaType, config: AbrConfig) {
        self.choosers.entry(media_type).or_insert_with(|| RepresentationChooser::new(config));
    }

    pub fn chooser_mut(&mut self, media_type: MediaType) -> Option<&mut RepresentationChooser> {
        self.choosers.get_mut(&media_type)
    }

    pub fn choose(
        &mut self,
        media_type: MediaType,
        now_secs: f64,
        representations: &[Representation],
    ) -> Option<RepresentationId> {
        self.choosers.get_mut(&media_type)?.choose(now_secs, representations)
    }

    /// Forwards to [`RepresentationChooser::set_manual_bitrate`] for
    /// `media_type`'s chooser, if registered.
    pub fn set_manual_bitrate(&mut self, media_type: MediaType, bitrate: Option<u64>) {
        if let Some(chooser) = self.choosers.get_mut(&media_type) {
            chooser.set_manual_bitrate(bitrate);
        }
    }

    /// Forwards to [`RepresentationChooser::set_max_auto_bitrate`].
    pub fn set_max_auto_bitrate(&mut self, media_type: MediaType, bitrate: Option<u64>) {
        if let Some(chooser) = self.choosers.get_mut(&media_type) {
            chooser.set_max_auto_bitrate(bitrate);
        }
    }

    /// Forwards to [`RepresentationChooser::set_viewport_width`]. Only
    /// meaningful for [`MediaType::Video`], but callers aren't required to
    /// know that.
    pub fn set_viewport_width(&mut self, media_type: MediaType, width: Option<u32>) {
        if let Some(chooser) = self.choosers.get_mut(&media_type) {
            chooser.set_viewport_width(width);
        }
    }

    /// Forwards to [`RepresentationChooser::set_throttle`].
    pub fn set_throttle(&mut self, media_type: MediaType, bitrate: Option<u64>) {
        if let Some(chooser) = self.choosers.get_mut(&media_type) {
            chooser.set_throttle(bitrate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_media_type_yields_no_choice() {
        let mut manager = AbrManager::new();
        assert_eq!(manager.choose(MediaType::Video, 0.0, &[]), None);
    }

    #[test]
    fn each_media_type_keeps_its_own_chooser() {
        let mut manager = AbrManager::new();
        manager.register(MediaType::Video, AbrConfig::default());
        manager.register(MediaType::Audio, AbrConfig::default());
        let reps = vec![Representation { id: "a".into(), bitrate: 100, width: 640, height: 360, codec: None }];
        assert!(manager.choose(MediaType::Video, 0.0, &reps).is_some());
        assert!(manager.choose(MediaType::Audio, 0.0, &reps).is_some());
    }

    #[test]
    fn manual_bitrate_forwards_to_the_right_media_types_chooser() {
        let mut manager = AbrManager::new();
        manager.register(MediaType::Video, AbrConfig::default());
        manager.register(MediaType::Audio, AbrConfig::default());
        let reps = vec![
            Representation { id: "low".into(), bitrate: 100, width: 640, height: 360, codec: None },
            Representation { id: "high".into(), bitrate: 900, width: 1920, height: 1080, codec: None },
        ];
        manager.set_manual_bitrate(MediaType::Video, Some(900));
        assert_eq!(manager.choose(MediaType::Video, 0.0, &reps), Some("high".into()));
        assert_eq!(manager.choose(MediaType::Audio, 0.0, &reps), Some("low".into()));
    }
}
