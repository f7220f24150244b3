//! Sync pipeline orchestrator — owns one utterance's highlight session.
//!
//! The pipeline is a state machine driving the read-along loop:
//!
//! ```text
//!   Idle → Speaking → Stopped → Idle
//!            ▲  │ (natural end, engine error, stop(), superseding play())
//!            └──┘
//! ```
//!
//! On `play()` the utterance is tokenized, the rate belief is seeded, the
//! speech engine is started, and a session driver task is spawned. The
//! driver multiplexes frame ticks and engine signals on one task, so all
//! per-session mutable state has a single owner and no locking. Between
//! corrections the driver advances a predicted word index from elapsed
//! time; each boundary signal revises the rate belief and may pull the
//! index forward, never backward.
//!
//! Sessions carry a monotonically increasing identifier. The live id sits
//! in a shared atomic, and every effect — highlight emission, teardown —
//! first checks that its session still owns that atomic. Stopping a real
//! speech engine is not instantaneous, so signals from a cancelled or
//! superseded session can keep arriving; the id check discards them.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::{BoundarySignal, SpeakRequest, SpeechBackend, SpeechHandle, SpeechSignal};
use crate::clock::FrameClock;
use crate::error::SyncError;
use crate::rate::{RateConfig, RateEstimator};
use crate::scheduler::PredictiveScheduler;
use crate::text::{CharToWordMap, Utterance};

// ── Sync state machine ─────────────────────────────────────────────

/// Current state of the sync pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// No session active.
    Idle,

    /// An utterance is being vocalized and tracked.
    Speaking,

    /// A session is being torn down (transient — observers see it as an
    /// event between `Speaking` and `Idle`, never as a resting state).
    Stopped,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// The engine finished vocalizing the whole utterance.
    Completed,

    /// The user (or a superseding `play()`) cancelled the session.
    Cancelled,

    /// The engine reported a failure mid-utterance.
    Error,
}

// ── Events emitted by the pipeline ─────────────────────────────────

/// Events emitted by the sync pipeline to the UI / application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Pipeline state changed.
    StateChanged(SyncState),

    /// The spoken-word estimate advanced (never backward within a session).
    WordHighlighted {
        /// Zero-based word index.
        index: usize,
    },

    /// The highlight was cleared.
    HighlightCleared,

    /// The session ended.
    SessionEnded {
        /// Why it ended.
        reason: EndReason,
    },

    /// An error the presentation layer should surface.
    Error(String),
}

// ── Pipeline configuration ─────────────────────────────────────────

/// Configuration for the sync pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Rate estimator tuning.
    pub rate: RateConfig,

    /// Speaking-rate multiplier applied when a play request doesn't carry
    /// one. Slightly below 1.0: the audience prefers a calmer pace.
    pub default_rate_multiplier: f64,

    /// Frame interval for the predictive loop, in milliseconds.
    pub frame_interval_ms: u64,

    /// Default voice hint passed to the speech engine.
    pub voice_hint: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rate: RateConfig::default(),
            default_rate_multiplier: 0.95,
            frame_interval_ms: 33,
            voice_hint: None,
        }
    }
}

/// Per-play options (engine-native; the port DTO converts into this).
#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    /// Speaking-rate multiplier; `None` uses the configured default.
    pub rate_multiplier: Option<f64>,

    /// Voice hint; `None` falls back to the configured default.
    pub voice_hint: Option<String>,
}

// ── Sync pipeline ──────────────────────────────────────────────────

/// The sync pipeline orchestrator.
///
/// Holds the injected speech backend and frame clock, hands out one
/// session at a time, and emits [`SyncEvent`]s via a channel for the
/// application layer to consume.
pub struct SyncPipeline {
    /// Pipeline configuration.
    config: SyncConfig,

    /// Injected speech engine.
    backend: Arc<dyn SpeechBackend>,

    /// Injected frame timing.
    clock: Arc<dyn FrameClock>,

    /// Event sender channel.
    event_tx: mpsc::UnboundedSender<SyncEvent>,

    /// Id of the live session (0 = none). Shared with the session driver.
    active: Arc<AtomicU64>,

    /// Currently highlighted word index (-1 = none). Shared with the driver.
    highlight: Arc<AtomicI64>,

    /// Next session id to hand out. Session ids are nonzero.
    next_session: u64,

    /// Handles for the most recent session (may already be finished).
    session: Option<SessionHandle>,
}

/// Engine handle + driver task for one session.
struct SessionHandle {
    id: u64,
    speech: SpeechHandle,
    total_words: usize,
    driver: JoinHandle<()>,
}

impl SyncPipeline {
    /// Create a new pipeline.
    ///
    /// Returns the pipeline and a receiver for [`SyncEvent`]s.
    #[must_use]
    pub fn new(
        config: SyncConfig,
        backend: Arc<dyn SpeechBackend>,
        clock: Arc<dyn FrameClock>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let pipeline = Self {
            config,
            backend,
            clock,
            event_tx,
            active: Arc::new(AtomicU64::new(0)),
            highlight: Arc::new(AtomicI64::new(-1)),
            next_session: 1,
            session: None,
        };

        (pipeline, event_rx)
    }

    /// Get the current pipeline state.
    ///
    /// `Stopped` is transient and only ever observed through events.
    #[must_use]
    pub fn state(&self) -> SyncState {
        if self.is_speaking() {
            SyncState::Speaking
        } else {
            SyncState::Idle
        }
    }

    /// Whether a session is live.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.active.load(Ordering::SeqCst) != 0
    }

    /// The currently highlighted word index, if a session is live.
    #[must_use]
    pub fn highlighted_word(&self) -> Option<usize> {
        let raw = self.highlight.load(Ordering::SeqCst);
        #[allow(clippy::cast_sign_loss)] // checked non-negative
        let index = (raw >= 0).then_some(raw as usize);
        index
    }

    /// Word count of the live utterance, if a session is live.
    #[must_use]
    pub fn word_count(&self) -> Option<usize> {
        if !self.is_speaking() {
            return None;
        }
        self.session.as_ref().map(|s| s.total_words)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Start reading `text` aloud with synchronized highlighting.
    ///
    /// Any session already in flight is fully cancelled first. Blank or
    /// whitespace-only text is a no-op: no engine call, no session, no
    /// error. Fails only when the speech engine itself refuses to start.
    pub fn play(&mut self, text: &str, options: &PlayOptions) -> Result<(), SyncError> {
        self.cancel_active();

        let Some(utterance) = Utterance::parse(text) else {
            tracing::debug!("Ignoring blank utterance");
            return Ok(());
        };

        let multiplier = options
            .rate_multiplier
            .unwrap_or(self.config.default_rate_multiplier);
        let voice_hint = options
            .voice_hint
            .clone()
            .or_else(|| self.config.voice_hint.clone());

        let request = SpeakRequest {
            text: utterance.normalized().to_owned(),
            rate_multiplier: multiplier,
            voice_hint,
        };

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let speech = match self.backend.speak(&request, signal_tx) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "Speech engine rejected utterance");
                self.emit(SyncEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let id = self.next_session;
        self.next_session += 1;
        let total_words = utterance.word_count();

        tracing::info!(session = id, words = total_words, "Speech session starting");
        self.active.store(id, Ordering::SeqCst);

        let driver = SessionDriver {
            id,
            active: Arc::clone(&self.active),
            highlight: Arc::clone(&self.highlight),
            map: CharToWordMap::build(&utterance),
            rate: RateEstimator::seed(&self.config.rate, multiplier),
            scheduler: PredictiveScheduler::new(total_words),
            clock: Arc::clone(&self.clock),
            signal_rx,
            event_tx: self.event_tx.clone(),
            last_corrected: 0,
            boundary_seen: false,
        };

        self.session = Some(SessionHandle {
            id,
            speech,
            total_words,
            driver: tokio::spawn(driver.run()),
        });

        self.emit(SyncEvent::StateChanged(SyncState::Speaking));
        Ok(())
    }

    /// Stop the live session, if any.
    ///
    /// Idempotent and callable from any state. The pipeline is `Idle`
    /// before this returns, even though the engine's actual silence may
    /// lag by a platform-dependent amount.
    pub fn stop(&mut self) {
        if self.cancel_active() {
            self.emit(SyncEvent::StateChanged(SyncState::Idle));
        }
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Tear down the live session. Returns whether one was actually live.
    ///
    /// The driver claims the session atomic on natural end / engine error;
    /// losing the claim race here means the teardown events were already
    /// sent and must not be duplicated.
    fn cancel_active(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };

        let was_live = self
            .active
            .compare_exchange(session.id, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        session.driver.abort();

        if was_live {
            self.backend.stop(session.speech);
            self.highlight.store(-1, Ordering::SeqCst);
            self.emit(SyncEvent::HighlightCleared);
            self.emit(SyncEvent::SessionEnded {
                reason: EndReason::Cancelled,
            });
            self.emit(SyncEvent::StateChanged(SyncState::Stopped));
            tracing::info!(session = session.id, "Speech session cancelled");
        }

        was_live
    }

    /// Emit a sync event (best-effort — if the receiver is dropped, we log
    /// and move on).
    fn emit(&self, event: SyncEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("Sync event receiver dropped");
        }
    }
}

impl Drop for SyncPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Session driver ─────────────────────────────────────────────────

/// Owns all per-session mutable state on one spawned task.
///
/// Multiplexes frame ticks and engine signals; exits when the utterance
/// ends, the engine fails, or the session loses the id atomic (cancelled
/// or superseded).
struct SessionDriver {
    id: u64,
    active: Arc<AtomicU64>,
    highlight: Arc<AtomicI64>,
    map: CharToWordMap,
    rate: RateEstimator,
    scheduler: PredictiveScheduler,
    clock: Arc<dyn FrameClock>,
    signal_rx: mpsc::UnboundedReceiver<SpeechSignal>,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    last_corrected: usize,
    boundary_seen: bool,
}

impl SessionDriver {
    async fn run(mut self) {
        loop {
            if !self.is_live() {
                return;
            }

            tokio::select! {
                () = self.clock.wait_frame() => self.on_frame(),
                signal = self.signal_rx.recv() => match signal {
                    Some(SpeechSignal::Started) => self.on_started(),
                    Some(SpeechSignal::Boundary(boundary)) => self.on_boundary(boundary),
                    Some(SpeechSignal::Ended) => return self.finish(EndReason::Completed),
                    Some(SpeechSignal::Error(message)) => {
                        tracing::warn!(session = self.id, error = %message, "Speech engine error");
                        return self.finish(EndReason::Error);
                    }
                    None => {
                        // Engine dropped its signal channel without an end
                        // signal — treat as a failed session.
                        tracing::warn!(session = self.id, "Speech engine went away mid-utterance");
                        return self.finish(EndReason::Error);
                    }
                }
            }
        }
    }

    /// Audio is playing: start the predictive clock and highlight word 0.
    fn on_started(&mut self) {
        if self.scheduler.is_running() {
            tracing::debug!(session = self.id, "Duplicate start signal ignored");
            return;
        }

        self.scheduler.begin(self.clock.now());
        if let Some(index) = self.scheduler.observe(0) {
            self.emit_highlight(index);
        }
    }

    /// Advance the prediction one frame.
    fn on_frame(&mut self) {
        let now = self.clock.now();
        if let Some(index) = self.scheduler.on_frame(now, self.rate.read()) {
            self.emit_highlight(index);
        }
    }

    /// Fold an engine progress report into the rate belief and, when it
    /// runs ahead of the prediction, into the highlight.
    fn on_boundary(&mut self, boundary: BoundarySignal) {
        if !self.scheduler.is_running() {
            tracing::debug!(session = self.id, "Boundary before start signal ignored");
            return;
        }

        let Some(offset) = boundary.char_offset else {
            tracing::debug!(session = self.id, "Boundary without offset ignored");
            return;
        };

        let index = self.map.resolve(offset);
        let elapsed_secs = boundary
            .elapsed
            .map_or_else(|| self.elapsed_since_start(), |d| d.as_secs_f64());

        // The engine has finished `index + 1` words in `elapsed_secs`.
        self.rate.correct(index + 1, elapsed_secs);
        self.last_corrected = self.last_corrected.max(index);

        if !self.boundary_seen {
            self.boundary_seen = true;
            tracing::debug!(session = self.id, index, "First boundary signal");
        }

        if let Some(next) = self.scheduler.observe(index) {
            self.emit_highlight(next);
        }
    }

    /// End the session with `reason`, unless it was already torn down.
    fn finish(&mut self, reason: EndReason) {
        // Claim the session: whoever swaps the atomic to 0 owns teardown.
        if self
            .active
            .compare_exchange(self.id, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        tracing::info!(
            session = self.id,
            ?reason,
            last_corrected = self.last_corrected,
            "Speech session ended"
        );

        self.highlight.store(-1, Ordering::SeqCst);
        self.emit(SyncEvent::HighlightCleared);
        self.emit(SyncEvent::SessionEnded { reason });
        self.emit(SyncEvent::StateChanged(SyncState::Stopped));
        self.emit(SyncEvent::StateChanged(SyncState::Idle));
    }

    fn is_live(&self) -> bool {
        self.active.load(Ordering::SeqCst) == self.id
    }

    fn elapsed_since_start(&self) -> f64 {
        self.scheduler.started_at().map_or(0.0, |started| {
            self.clock
                .now()
                .saturating_duration_since(started)
                .as_secs_f64()
        })
    }

    fn emit_highlight(&self, index: usize) {
        if !self.is_live() {
            return;
        }

        #[allow(clippy::cast_possible_wrap)] // word indices are tiny
        self.highlight.store(index as i64, Ordering::SeqCst);
        self.emit(SyncEvent::WordHighlighted { index });
    }

    fn emit(&self, event: SyncEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("Sync event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockSpeechBackend;
    use crate::clock::IntervalClock;

    fn pipeline_with(
        backend: MockSpeechBackend,
    ) -> (SyncPipeline, mpsc::UnboundedReceiver<SyncEvent>) {
        SyncPipeline::new(
            SyncConfig::default(),
            Arc::new(backend),
            Arc::new(IntervalClock::default()),
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn pipeline_creates_in_idle_state() {
        let (pipeline, _rx) = pipeline_with(MockSpeechBackend::new());
        assert_eq!(pipeline.state(), SyncState::Idle);
        assert!(!pipeline.is_speaking());
        assert_eq!(pipeline.highlighted_word(), None);
        assert_eq!(pipeline.word_count(), None);
    }

    #[test]
    fn blank_input_never_reaches_the_engine() {
        let mut backend = MockSpeechBackend::new();
        backend.expect_speak().times(0);

        let (mut pipeline, mut rx) = pipeline_with(backend);
        assert!(pipeline.play("   \n\t ", &PlayOptions::default()).is_ok());
        assert_eq!(pipeline.state(), SyncState::Idle);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn unavailable_engine_surfaces_one_error() {
        let mut backend = MockSpeechBackend::new();
        backend
            .expect_speak()
            .times(1)
            .returning(|_, _| Err(SyncError::EngineUnavailable));

        let (mut pipeline, mut rx) = pipeline_with(backend);
        let result = pipeline.play("hello there", &PlayOptions::default());
        assert!(matches!(result, Err(SyncError::EngineUnavailable)));
        assert_eq!(pipeline.state(), SyncState::Idle);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SyncEvent::Error(_)));
    }

    #[tokio::test]
    async fn play_normalizes_text_and_stop_halts_the_engine() {
        let mut backend = MockSpeechBackend::new();
        backend
            .expect_speak()
            .withf(|request, _| request.text == "hello wide world")
            .times(1)
            .returning(|_, _| Ok(SpeechHandle::new(11)));
        backend
            .expect_stop()
            .withf(|handle| *handle == SpeechHandle::new(11))
            .times(1)
            .return_const(());

        let (mut pipeline, mut rx) = pipeline_with(backend);
        pipeline
            .play("hello\n  wide\tworld", &PlayOptions::default())
            .unwrap();
        assert_eq!(pipeline.state(), SyncState::Speaking);
        assert_eq!(pipeline.word_count(), Some(3));

        pipeline.stop();
        assert_eq!(pipeline.state(), SyncState::Idle);

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                SyncEvent::StateChanged(SyncState::Speaking),
                SyncEvent::HighlightCleared,
                SyncEvent::SessionEnded {
                    reason: EndReason::Cancelled
                },
                SyncEvent::StateChanged(SyncState::Stopped),
                SyncEvent::StateChanged(SyncState::Idle),
            ]
        );

        // Idempotent: a second stop produces no further events.
        pipeline.stop();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn replay_supersedes_and_halts_the_previous_session() {
        let mut backend = MockSpeechBackend::new();
        let mut handles = 0_u64;
        backend.expect_speak().times(2).returning(move |_, _| {
            handles += 1;
            Ok(SpeechHandle::new(handles))
        });
        // The first session must be halted exactly once by the supersede;
        // the second is halted whenever the pipeline is torn down.
        backend
            .expect_stop()
            .withf(|handle| *handle == SpeechHandle::new(1))
            .times(1)
            .return_const(());
        backend
            .expect_stop()
            .withf(|handle| *handle == SpeechHandle::new(2))
            .return_const(());

        let (mut pipeline, mut rx) = pipeline_with(backend);
        pipeline.play("first message", &PlayOptions::default()).unwrap();
        pipeline.play("second message", &PlayOptions::default()).unwrap();

        assert_eq!(pipeline.state(), SyncState::Speaking);
        assert_eq!(pipeline.word_count(), Some(2));

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                SyncEvent::StateChanged(SyncState::Speaking),
                SyncEvent::HighlightCleared,
                SyncEvent::SessionEnded {
                    reason: EndReason::Cancelled
                },
                SyncEvent::StateChanged(SyncState::Stopped),
                SyncEvent::StateChanged(SyncState::Speaking),
            ]
        );
    }

    #[tokio::test]
    async fn explicit_rate_multiplier_reaches_the_engine() {
        let mut backend = MockSpeechBackend::new();
        backend
            .expect_speak()
            .withf(|request, _| (request.rate_multiplier - 1.25).abs() < f64::EPSILON)
            .times(1)
            .returning(|_, _| Ok(SpeechHandle::new(1)));
        backend.expect_stop().return_const(());

        let (mut pipeline, _rx) = pipeline_with(backend);
        let options = PlayOptions {
            rate_multiplier: Some(1.25),
            voice_hint: None,
        };
        pipeline.play("some words", &options).unwrap();
    }
}
