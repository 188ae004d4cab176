//! Exponentially weighted moving average bandwidth estimation.

/// Half-life of the EWMA, in seconds. Chosen to sit between a
/// fast-reacting and slow-reacting window (see DESIGN.md — no
/// original-language implementation was available to confirm a constant,
/// so this is a recorded design decision rather than a silent guess).
pub const BANDWIDTH_EWMA_HALF_LIFE_SECS: f64 = 15.0;

/// Tracks a smoothed estimate of download bandwidth in bits per second,
/// split out as its own type the way `mesio` splits `RetryPolicy` out of
/// the fetcher that consumes it — so it is unit-testable in isolation.
#[derive(Debug, Clone)]
pub struct BandwidthEstimator {
    half_life_secs: f64,
    weighted_estimate: Option<f64>,
}

impl Default for BandwidthEstimator {
    fn default() -> Self {
        Self {
            half_life_secs: BANDWIDTH_EWMA_HALF_LIFE_SECS,
            weighted_estimate: None,
        }
    }
}

impl BandwidthEstimator {
    pub fn new(half_life_secs: f64) -> Self {
        Self {
            half_life_secs,
            weighted_estimate: None,
        }
    }

    /// Fold in one completed (or completed-so-far) request's measurement.
    ///
    /// `bytes` over `elapsed_secs` yields the instantaneous sample; the
    /// weight given to that sample decays with `elapsed_secs` relative to
    /// the configured half-life, so a long download dominates the
    /// estimate more than a short, possibly-unrepresentative one.
    pub fn add_sample(&mut self, bytes: u64, elapsed_secs: f64) {
        if elapsed_secs <= 0.0 || bytes == 0 {
            return;
        }
        let sample_bps = (bytes as f64 * 8.0) / elapsed_secs;
        let alpha = 1.0 - 0.5_f64.powf(elapsed_secs / self.half_life_secs);
        self.weighted_estimate = Some(match self.weighted_estimate {
            Some(prev) => prev + alpha * (sample_bps - prev),
            None => sample_bps,
        });
    }

    /// Current smoothed estimate in bits per second, if any sample has
    /// been observed yet.
    pub fn estimate_bps(&self) -> Option<f64> {
        self.weighted_estimate
    }

    pub fn reset(&mut self) {
        self.weighted_estimate = None;
    }
}
