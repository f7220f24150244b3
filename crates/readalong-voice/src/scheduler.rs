//! Predictive word-index scheduling.
//!
//! Between corrections the engine has nothing to go on but elapsed time and
//! the current rate belief, so each frame predicts
//! `floor(elapsed × rate)` and clamps it into the word sequence. The
//! emitted index is never allowed to move backward within a session: a
//! correction that lowers the rate belief can make a later prediction
//! smaller than one already shown, and the scheduler holds at the shown
//! index until prediction catches back up.
//!
//! The struct is deliberately synchronous and pure — the session driver in
//! [`pipeline`](crate::pipeline) owns the recurring frame callback and the
//! teardown, so "cancel" here is just dropping or re-`begin`ning the value.

use tokio::time::Instant;

/// Monotonic word-index estimate for one utterance.
#[derive(Debug, Clone)]
pub struct PredictiveScheduler {
    total_words: usize,
    started_at: Option<Instant>,
    last_emitted: Option<usize>,
}

impl PredictiveScheduler {
    /// Create a scheduler for an utterance of `total_words` words.
    ///
    /// `total_words` comes from a parsed [`Utterance`](crate::text::Utterance)
    /// and is therefore at least 1.
    #[must_use]
    pub const fn new(total_words: usize) -> Self {
        Self {
            total_words,
            started_at: None,
            last_emitted: None,
        }
    }

    /// Mark playback as started at `now`. Prediction is inert until then.
    pub fn begin(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// Whether [`begin`](Self::begin) has been called.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// The instant playback started, once [`begin`](Self::begin) ran.
    #[must_use]
    pub const fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Advance the estimate for a new frame.
    ///
    /// Returns the newly reached index when the prediction moved forward,
    /// `None` when it holds (not started, prediction unchanged, or a
    /// lowered rate belief computed a smaller value than already emitted).
    pub fn on_frame(&mut self, now: Instant, rate_wps: f64) -> Option<usize> {
        let started_at = self.started_at?;
        let elapsed = now.saturating_duration_since(started_at).as_secs_f64();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        // non-negative by construction; float→int casts saturate
        let predicted = (elapsed * rate_wps).floor() as usize;

        self.advance_to(predicted)
    }

    /// Advance the estimate to an externally confirmed index.
    ///
    /// Used when a correction resolves ahead of the prediction; like
    /// [`on_frame`](Self::on_frame) this can only move the estimate
    /// forward.
    pub fn observe(&mut self, index: usize) -> Option<usize> {
        self.advance_to(index)
    }

    /// The last emitted index, if any.
    #[must_use]
    pub const fn last_emitted(&self) -> Option<usize> {
        self.last_emitted
    }

    /// Clamp into `[0, total_words - 1]` and apply the never-backward rule.
    fn advance_to(&mut self, index: usize) -> Option<usize> {
        let bounded = index.min(self.total_words.saturating_sub(1));

        match self.last_emitted {
            Some(previous) if bounded <= previous => None,
            _ => {
                self.last_emitted = Some(bounded);
                Some(bounded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(base: Instant, secs: f64) -> Instant {
        base + Duration::from_secs_f64(secs)
    }

    #[test]
    fn inert_until_begun() {
        let mut scheduler = PredictiveScheduler::new(5);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.on_frame(Instant::now(), 3.2), None);
        assert_eq!(scheduler.last_emitted(), None);
    }

    #[test]
    fn predicts_floor_of_elapsed_times_rate() {
        let base = Instant::now();
        let mut scheduler = PredictiveScheduler::new(5);
        scheduler.begin(base);

        assert_eq!(scheduler.on_frame(at(base, 0.0), 3.2), Some(0));
        assert_eq!(scheduler.on_frame(at(base, 0.2), 3.2), None);
        assert_eq!(scheduler.on_frame(at(base, 0.4), 3.2), Some(1));
        assert_eq!(scheduler.on_frame(at(base, 1.0), 3.2), Some(3));
    }

    #[test]
    fn holds_when_rate_drops_below_emitted_index() {
        let base = Instant::now();
        let mut scheduler = PredictiveScheduler::new(10);
        scheduler.begin(base);

        assert_eq!(scheduler.on_frame(at(base, 1.0), 4.0), Some(4));

        // A correction halves the belief: the prediction (2) is behind the
        // emitted index (4) and must not pull it back.
        assert_eq!(scheduler.on_frame(at(base, 1.1), 2.0), None);
        assert_eq!(scheduler.last_emitted(), Some(4));

        // Prediction catches back up eventually.
        assert_eq!(scheduler.on_frame(at(base, 2.6), 2.0), Some(5));
    }

    #[test]
    fn clamps_to_last_word() {
        let base = Instant::now();
        let mut scheduler = PredictiveScheduler::new(3);
        scheduler.begin(base);

        assert_eq!(scheduler.on_frame(at(base, 60.0), 6.0), Some(2));
        assert_eq!(scheduler.on_frame(at(base, 120.0), 6.0), None);
    }

    #[test]
    fn observe_only_moves_forward() {
        let base = Instant::now();
        let mut scheduler = PredictiveScheduler::new(8);
        scheduler.begin(base);

        assert_eq!(scheduler.observe(3), Some(3));
        assert_eq!(scheduler.observe(2), None);
        assert_eq!(scheduler.observe(3), None);
        assert_eq!(scheduler.observe(5), Some(5));
        // Out-of-range confirmations clamp like predictions do.
        assert_eq!(scheduler.observe(99), Some(7));
    }

    #[test]
    fn emitted_sequence_is_monotonic_under_mixed_input() {
        let base = Instant::now();
        let mut scheduler = PredictiveScheduler::new(20);
        scheduler.begin(base);

        let mut emitted = Vec::new();
        let inputs: [(f64, f64, Option<usize>); 6] = [
            (0.5, 4.0, None),
            (1.0, 4.0, None),
            (1.2, 1.8, Some(7)),
            (1.4, 1.8, None),
            (2.0, 5.0, Some(2)),
            (3.0, 5.0, None),
        ];

        for (secs, rate, correction) in inputs {
            if let Some(index) = correction
                && let Some(next) = scheduler.observe(index)
            {
                emitted.push(next);
            }
            if let Some(next) = scheduler.on_frame(at(base, secs), rate) {
                emitted.push(next);
            }
        }

        assert!(emitted.windows(2).all(|w| w[0] < w[1]), "{emitted:?}");
        assert!(emitted.iter().all(|&i| i < 20));
    }
}
