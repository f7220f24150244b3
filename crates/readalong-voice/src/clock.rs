//! Frame clock — the injected per-frame callback scheduler.
//!
//! The predictive scheduler needs two things from its host: the current
//! instant and a way to wake up roughly once per display frame. Both come
//! through this trait so the pipeline never reaches for ambient timer
//! globals and so tests can drive sessions deterministically (the tokio
//! paused clock virtualizes both `now` and the frame sleep).

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Default frame interval (~30 fps) — word boundaries are far coarser than
/// display frames, so anything near display rate looks continuous.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Injected frame-timing capability.
#[async_trait]
pub trait FrameClock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Complete roughly one display frame from now.
    async fn wait_frame(&self);
}

/// Production clock: fixed-interval frames on the tokio timer.
#[derive(Debug, Clone)]
pub struct IntervalClock {
    frame: Duration,
}

impl IntervalClock {
    /// Create a clock that ticks every `frame`.
    #[must_use]
    pub const fn new(frame: Duration) -> Self {
        Self { frame }
    }
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

#[async_trait]
impl FrameClock for IntervalClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn wait_frame(&self) {
        tokio::time::sleep(self.frame).await;
    }
}
