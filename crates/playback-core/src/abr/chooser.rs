//! Representation selection: turns a bandwidth estimate and the current
//! set of pending fetches into a concrete [`Representation`] choice.
//!
//! The pending-request bookkeeping is grounded on `mesio`'s
//! [`crate::abr::estimator`]-adjacent `PrefetchManager` registry pattern —
//! a small set of in-flight ids with insert/remove/cleanup, not a queue.

use crate::config::AbrConfig;
use crate::media_type::RepresentationId;
use crate::representation::Representation;
use std::collections::HashMap;
use tracing::{trace, warn};

struct PendingRequest {
    representation_id: RepresentationId,
    last_bytes: u64,
    started_secs: f64,
}

/// Per-media-type representation chooser. One instance owns one
/// [`BandwidthEstimator`](super::estimator::BandwidthEstimator); DESIGN.md
/// Open Question (b) keeps these isolated rather than sharing one
/// estimator across media types.
pub struct RepresentationChooser {
    config: AbrConfig,
    estimator: super::estimator::BandwidthEstimator,
    pending: HashMap<u64, PendingRequest>,
    current: Option<RepresentationId>,
    low_estimate_since: Option<f64>,
    manual_bitrate: Option<u64>,
    max_auto_bitrate: Option<u64>,
    limit_width: Option<u32>,
    throttle: Option<u64>,
}

impl RepresentationChooser {
    pub fn new(config: AbrConfig) -> Self {
        Self {
            manual_bitrate: config.manual_bitrate,
            max_auto_bitrate: config.max_auto_bitrate,
            limit_width: config.limit_width,
            throttle: config.throttle,
            config,
            estimator: super::estimator::BandwidthEstimator::default(),
            pending: HashMap::new(),
            current: None,
            low_estimate_since: None,
        }
    }

    /// Pin selection to one bitrate, bypassing estimation entirely. `None`
    /// returns to automatic selection (spec's `setManualBitrate`).
    pub fn set_manual_bitrate(&mut self, bitrate: Option<u64>) {
        self.manual_bitrate = bitrate;
    }

    /// Ceiling on automatic (non-manual) selection (`setMaxAutoBitrate`).
    pub fn set_max_auto_bitrate(&mut self, bitrate: Option<u64>) {
        self.max_auto_bitrate = bitrate;
    }

    /// Rendering surface width; representations wider than this are
    /// filtered out when something narrower still fits (`setLimitWidth`).
    pub fn set_viewport_width(&mut self, width: Option<u32>) {
        self.limit_width = width;
    }

    /// External bitrate ceiling, applied alongside `max_auto_bitrate`.
    pub fn set_throttle(&mut self, bitrate: Option<u64>) {
        self.throttle = bitrate;
    }

    /// Fold in a completed request's measurement directly (used for
    /// out-of-band estimates, e.g. a prefetch that already finished).
    pub fn add_estimate(&mut self, bytes: u64, elapsed_secs: f64) {
        self.estimator.add_sample(bytes, elapsed_secs);
    }

    pub fn add_pending_request(&mut self, request_id: u64, representation_id: RepresentationId, now_secs: f64) {
        self.pending.insert(
            request_id,
            PendingRequest {
                representation_id,
                last_bytes: 0,
                started_secs: now_secs,
            },
        );
    }

    /// Record incremental progress for a pending request. Progress
    /// reports that don't monotonically increase `bytes_so_far` are
    /// dropped rather than panicking, per the request-ordering guarantee.
    pub fn add_request_progress(&mut self, request_id: u64, bytes_so_far: u64, now_secs: f64) {
        let Some(req) = self.pending.get_mut(&request_id) else {
            warn!(request_id, "progress for unknown pending request");
            return;
        };
        if bytes_so_far < req.last_bytes {
            trace!(request_id, bytes_so_far, last_bytes = req.last_bytes, "dropping out-of-order progress");
            return;
        }
        let elapsed = (now_secs - req.started_secs).max(1e-6);
        self.estimator.add_sample(bytes_so_far - req.last_bytes, elapsed);
        req.last_bytes = bytes_so_far;
    }

    pub fn remove_pending_request(&mut self, request_id: u64, total_bytes: u64, now_secs: f64) {
        let Some(req) = self.pending.remove(&request_id) else {
            warn!(request_id, "removePendingRequest for unknown id");
            return;
        };
        let elapsed = (now_secs - req.started_secs).max(1e-6);
        if total_bytes > req.last_bytes {
            self.estimator.add_sample(total_bytes - req.last_bytes, elapsed);
        }
    }

    /// Step 1: manual override short-circuits everything else — pick the
    /// representation closest to `manual_bitrate`.
    /// Step 2: viewport-width filter — drop representations wider than the
    /// rendering surface, unless that would leave nothing to choose from.
    /// Step 3: `bitrate <= min(maxAutoBitrate, throttle, estimate)`.
    /// Step 4: highest qualifying bitrate, falling back to the lowest
    /// available if nothing qualifies.
    /// Step 5: stability window — only accept a downgrade once the low
    /// estimate has held for `stability_window`.
    pub fn choose(&mut self, now_secs: f64, representations: &[Representation]) -> Option<RepresentationId> {
        if representations.is_empty() {
            return None;
        }

        if let Some(manual) = self.manual_bitrate {
            let chosen = representations
                .iter()
                .min_by_key(|r| (r.bitrate as i64 - manual as i64).abs())
                .unwrap();
            self.current = Some(chosen.id.clone());
            return self.current.clone();
        }

        let width_filtered: Vec<&Representation> = match self.limit_width {
            Some(limit) => {
                let fits: Vec<&Representation> = representations.iter().filter(|r| r.width <= limit).collect();
                if fits.is_empty() {
                    representations.iter().collect()
                } else {
                    fits
                }
            }
            None => representations.iter().collect(),
        };

        let estimate = self
            .estimator
            .estimate_bps()
            .or_else(|| self.config.initial_bitrate.map(|b| b as f64));

        let Some(estimate) = estimate else {
            let lowest = width_filtered.iter().min_by_key(|r| r.bitrate).unwrap();
            self.current = Some(lowest.id.clone());
            return self.current.clone();
        };

        let ceiling = [self.max_auto_bitrate, self.throttle, Some(estimate as u64)]
            .into_iter()
            .flatten()
            .min()
            .unwrap();

        let best_candidate = width_filtered
            .iter()
            .filter(|r| r.bitrate <= ceiling)
            .max_by_key(|r| r.bitrate)
            .or_else(|| width_filtered.iter().min_by_key(|r| r.bitrate))
            .unwrap();

        let is_downgrade = self
            .current
            .as_ref()
            .and_then(|cur_id| representations.iter().find(|r| &r.id == cur_id))
            .is_some_and(|cur| best_candidate.bitrate < cur.bitrate);

        if is_downgrade {
            let since = *self.low_estimate_since.get_or_insert(now_secs);
            if now_secs - since < self.config.stability_window.as_secs_f64() {
                trace!(now_secs, since, "holding current representation through stability window");
                return self.current.clone();
            }
        } else {
            self.low_estimate_since = None;
        }

        self.current = Some(best_candidate.id.clone());
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reps() -> Vec<Representation> {
        vec![
            Representation { id: "low".into(), bitrate: 500_000, width: 640, height: 360, codec: None },
            Representation { id: "mid".into(), bitrate: 1_500_000, width: 1280, height: 720, codec: None },
            Representation { id: "high".into(), bitrate: 4_000_000, width: 1920, height: 1080, codec: None },
        ]
    }

    #[test]
    fn with_no_estimate_picks_lowest_representation() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        let chosen = chooser.choose(0.0, &reps()).unwrap();
        assert_eq!(chosen, "low".into());
    }

    #[test]
    fn high_bandwidth_picks_highest_qualifying_bitrate() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        chooser.add_estimate(10_000_000, 1.0); // 80 Mbps
        let chosen = chooser.choose(0.0, &reps()).unwrap();
        assert_eq!(chosen, "high".into());
    }

    #[test]
    fn downgrade_is_held_until_stability_window_elapses() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        chooser.add_estimate(10_000_000, 1.0);
        assert_eq!(chooser.choose(0.0, &reps()).unwrap(), "high".into());

        // Bandwidth craters.
        chooser.add_estimate(1, 10.0);
        // Immediately after: still holding "high" through the window.
        assert_eq!(chooser.choose(0.5, &reps()).unwrap(), "high".into());
        // After the stability window has elapsed: downgrade goes through.
        let chosen = chooser.choose(3.0, &reps()).unwrap();
        assert_ne!(chosen, "high".into());
    }

    #[test]
    fn out_of_order_progress_is_dropped_not_applied() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        chooser.add_pending_request(1, "mid".into(), 0.0);
        chooser.add_request_progress(1, 1000, 0.5);
        chooser.add_request_progress(1, 500, 0.6); // out of order, dropped
        chooser.remove_pending_request(1, 2000, 1.0);
        assert!(chooser.estimator.estimate_bps().is_some());
    }

    #[test]
    fn unknown_representations_returns_none() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        assert_eq!(chooser.choose(0.0, &[]), None);
    }

    #[test]
    fn manual_bitrate_bypasses_estimation_entirely() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        chooser.add_estimate(10_000_000, 1.0); // would otherwise pick "high"
        chooser.set_manual_bitrate(Some(1_400_000));
        assert_eq!(chooser.choose(0.0, &reps()).unwrap(), "mid".into());
    }

    #[test]
    fn max_auto_bitrate_caps_selection_below_the_raw_estimate() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        chooser.add_estimate(10_000_000, 1.0); // plenty of bandwidth for "high"
        chooser.set_max_auto_bitrate(Some(1_600_000));
        assert_eq!(chooser.choose(0.0, &reps()).unwrap(), "mid".into());
    }

    #[test]
    fn throttle_caps_selection_independently_of_max_auto_bitrate() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        chooser.add_estimate(10_000_000, 1.0);
        chooser.set_throttle(Some(600_000));
        assert_eq!(chooser.choose(0.0, &reps()).unwrap(), "low".into());
    }

    #[test]
    fn viewport_width_filters_out_representations_too_wide_to_render() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        chooser.add_estimate(10_000_000, 1.0); // would otherwise pick "high"
        chooser.set_viewport_width(Some(1280));
        assert_eq!(chooser.choose(0.0, &reps()).unwrap(), "mid".into());
    }

    #[test]
    fn viewport_width_narrower_than_every_representation_falls_back_to_unfiltered() {
        let mut chooser = RepresentationChooser::new(AbrConfig::default());
        chooser.add_estimate(10_000_000, 1.0);
        chooser.set_viewport_width(Some(10));
        assert_eq!(chooser.choose(0.0, &reps()).unwrap(), "high".into());
    }

    #[test]
    fn per_type_estimation_is_isolated() {
        // DESIGN.md Open Question (b): per-media-type estimators must not
        // influence each other.
        let mut video = RepresentationChooser::new(AbrConfig::default());
        let mut audio = RepresentationChooser::new(AbrConfig::default());
        video.add_estimate(10_000_000, 1.0);
        assert!(audio.estimator.estimate_bps().is_none());
    }
}
