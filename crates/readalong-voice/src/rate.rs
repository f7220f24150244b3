//! Speaking-rate estimation.
//!
//! The engine carries a single scalar belief — words per second — seeded
//! from a nominal speaking rate and revised whenever the speech engine
//! reports measurable progress. Boundary signals are noisy and sparse, so
//! revisions use exponential smoothing weighted toward the existing belief
//! rather than chasing each measurement.

use serde::{Deserialize, Serialize};

/// Tuning parameters for the rate estimator.
///
/// The defaults are empirical values for mainstream speech engines at 1.0×
/// speed; hosts whose engines emit denser or sparser boundary events may
/// want to re-tune `smoothing` in particular.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    /// Nominal speaking rate in words per second before any multiplier.
    pub nominal_wps: f64,

    /// Lower clamp for the belief and for any measured rate.
    pub min_wps: f64,

    /// Upper clamp for the belief and for any measured rate.
    pub max_wps: f64,

    /// Weight retained by the existing belief on each correction (0.0–1.0).
    ///
    /// The remainder goes to the measured rate. The default favors
    /// stability over reactivity.
    pub smoothing: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            nominal_wps: 3.2,
            min_wps: 1.8,
            max_wps: 6.0,
            smoothing: 0.6,
        }
    }
}

/// The current words-per-second belief.
///
/// Mutated only by [`correct`](Self::correct); read by the predictive
/// scheduler every frame. The belief never leaves the configured
/// `[min_wps, max_wps]` range, whatever corrections are fed to it.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    belief: f64,
    min_wps: f64,
    max_wps: f64,
    smoothing: f64,
}

impl RateEstimator {
    /// Seed the belief from the nominal rate and a playback-speed multiplier.
    #[must_use]
    pub fn seed(config: &RateConfig, multiplier: f64) -> Self {
        let min_wps = config.min_wps.min(config.max_wps);
        let max_wps = config.max_wps.max(config.min_wps);
        let belief = (config.nominal_wps * multiplier).clamp(min_wps, max_wps);

        Self {
            belief,
            min_wps,
            max_wps,
            smoothing: config.smoothing.clamp(0.0, 1.0),
        }
    }

    /// Fold a progress measurement into the belief.
    ///
    /// `words_spoken` is the cumulative word count the engine has reached;
    /// `elapsed_secs` is the time it took to get there. Degenerate reports
    /// (zero words, zero/negative/non-finite elapsed) are ignored — some
    /// engines emit a boundary at time zero.
    pub fn correct(&mut self, words_spoken: usize, elapsed_secs: f64) {
        if words_spoken == 0 || !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return;
        }

        #[allow(clippy::cast_precision_loss)] // word counts are tiny
        let measured = (words_spoken as f64 / elapsed_secs).clamp(self.min_wps, self.max_wps);

        self.belief = self
            .smoothing
            .mul_add(self.belief, (1.0 - self.smoothing) * measured);
    }

    /// The current belief, always within `[min_wps, max_wps]`.
    #[must_use]
    pub const fn read(&self) -> f64 {
        self.belief
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn seed_applies_multiplier_and_clamps() {
        let config = RateConfig::default();

        assert!(close(RateEstimator::seed(&config, 1.0).read(), 3.2));
        assert!(close(RateEstimator::seed(&config, 0.5).read(), 1.8));
        assert!(close(RateEstimator::seed(&config, 10.0).read(), 6.0));
    }

    #[test]
    fn correction_blends_toward_measured_rate() {
        let config = RateConfig::default();
        let mut estimator = RateEstimator::seed(&config, 1.0);

        // 2 words in half a second measures 4.0 wps.
        estimator.correct(2, 0.5);
        assert!(close(estimator.read(), 3.2 * 0.6 + 4.0 * 0.4));
    }

    #[test]
    fn degenerate_corrections_are_ignored() {
        let config = RateConfig::default();
        let mut estimator = RateEstimator::seed(&config, 1.0);
        let seeded = estimator.read();

        estimator.correct(0, 1.0);
        estimator.correct(3, 0.0);
        estimator.correct(3, -2.0);
        estimator.correct(3, f64::NAN);
        estimator.correct(3, f64::INFINITY);

        assert!(close(estimator.read(), seeded));
    }

    #[test]
    fn belief_never_leaves_bounds() {
        let config = RateConfig::default();
        let mut estimator = RateEstimator::seed(&config, 1.0);

        // A burst of absurdly fast measurements saturates at the upper clamp.
        for _ in 0..100 {
            estimator.correct(500, 0.1);
        }
        assert!(estimator.read() <= config.max_wps);

        // And a crawl saturates at the lower clamp.
        for _ in 0..100 {
            estimator.correct(1, 600.0);
        }
        assert!(estimator.read() >= config.min_wps);
    }

    #[test]
    fn inverted_bounds_are_normalized() {
        let config = RateConfig {
            min_wps: 6.0,
            max_wps: 1.8,
            ..RateConfig::default()
        };
        let estimator = RateEstimator::seed(&config, 1.0);
        assert!(estimator.read() >= 1.8 && estimator.read() <= 6.0);
    }
}
