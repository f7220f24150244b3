//! `ReadAlongService` — the adapter that implements `ReadAlongPort`.
//!
//! This module is the single place where engine-native types are converted
//! to the transport-agnostic DTOs defined in `readalong-core`. Nothing
//! outside this file should map `SyncEvent` or `SyncError` onto the wire.
//!
//! # Locking discipline
//!
//! Mutations (`play`, `stop`) use `pipeline.write().await`; the read-only
//! `status` query uses `pipeline.read().await`. No lock is ever held
//! across an engine call that could block — `SyncPipeline` methods are all
//! synchronous and non-blocking.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use readalong_core::events::AppEvent;
use readalong_core::ports::{
    AppEventEmitter, PlayOptionsDto, ReadAlongPort, ReadAlongPortError, SyncStatusDto,
};

use crate::backend::SpeechBackend;
use crate::clock::{FrameClock, IntervalClock};
use crate::error::SyncError;
use crate::pipeline::{EndReason, PlayOptions, SyncConfig, SyncEvent, SyncPipeline, SyncState};

// ── Service struct ─────────────────────────────────────────────────

/// Implements [`ReadAlongPort`] by wrapping the shared pipeline state.
///
/// The `Arc<RwLock<_>>` is shared with any host commands that drive the
/// pipeline directly; they access the same session via [`Self::pipeline`].
pub struct ReadAlongService {
    pipeline: Arc<RwLock<SyncPipeline>>,
}

impl ReadAlongService {
    /// Create a service with the production frame clock.
    ///
    /// Events from the engine are bridged onto `emitter` for the
    /// presentation layer.
    #[must_use]
    pub fn new(
        config: SyncConfig,
        backend: Arc<dyn SpeechBackend>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        let clock = Arc::new(IntervalClock::new(Duration::from_millis(
            config.frame_interval_ms,
        )));
        Self::with_clock(config, backend, clock, emitter)
    }

    /// Create a service with an injected frame clock (tests, host shells
    /// with their own frame source).
    #[must_use]
    pub fn with_clock(
        config: SyncConfig,
        backend: Arc<dyn SpeechBackend>,
        clock: Arc<dyn FrameClock>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        let (pipeline, event_rx) = SyncPipeline::new(config, backend, clock);
        spawn_event_bridge(event_rx, emitter);

        Self {
            pipeline: Arc::new(RwLock::new(pipeline)),
        }
    }

    /// Shared handle to the underlying pipeline.
    #[must_use]
    pub fn pipeline(&self) -> Arc<RwLock<SyncPipeline>> {
        Arc::clone(&self.pipeline)
    }
}

// ── Event bridge ───────────────────────────────────────────────────

/// Bridge `SyncEvent` → `AppEvent`, forwarding each event to `emitter`.
///
/// The spawned task self-terminates when the pipeline's sender is dropped
/// (i.e. when [`SyncPipeline`] is destroyed): `recv()` returns `None` and
/// the `while let` loop exits.
pub fn spawn_event_bridge(
    mut event_rx: mpsc::UnboundedReceiver<SyncEvent>,
    emitter: Arc<dyn AppEventEmitter>,
) {
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                SyncEvent::WordHighlighted { index } => {
                    emitter.emit(AppEvent::word_highlighted(index));
                }
                SyncEvent::HighlightCleared => {
                    emitter.emit(AppEvent::HighlightCleared);
                }
                SyncEvent::StateChanged(state) => {
                    emitter.emit(AppEvent::SpeechStateChanged {
                        state: state_label(state).to_owned(),
                    });
                }
                SyncEvent::SessionEnded { reason } => {
                    emitter.emit(AppEvent::session_ended(reason_label(reason)));
                }
                SyncEvent::Error(message) => {
                    emitter.emit(AppEvent::speech_error(message));
                }
            }
        }
        // event_rx returned None: pipeline sender dropped — task exits.
    });
}

// ── Internal helpers ───────────────────────────────────────────────

/// Convert a `SyncError` into its closest `ReadAlongPortError` equivalent.
///
/// This conversion lives here, in `readalong-voice`, so that
/// `readalong-core` never needs to import engine types. The dependency
/// arrow stays one-way.
fn to_port_err(e: SyncError) -> ReadAlongPortError {
    match e {
        SyncError::EngineUnavailable => ReadAlongPortError::Unavailable,
        other => ReadAlongPortError::Internal(other.to_string()),
    }
}

const fn state_label(state: SyncState) -> &'static str {
    match state {
        SyncState::Idle => "idle",
        SyncState::Speaking => "speaking",
        SyncState::Stopped => "stopped",
    }
}

const fn reason_label(reason: EndReason) -> &'static str {
    match reason {
        EndReason::Completed => "completed",
        EndReason::Cancelled => "cancelled",
        EndReason::Error => "error",
    }
}

// ── ReadAlongPort implementation ───────────────────────────────────

#[async_trait]
impl ReadAlongPort for ReadAlongService {
    async fn play(&self, text: &str, options: PlayOptionsDto) -> Result<(), ReadAlongPortError> {
        let native = PlayOptions {
            rate_multiplier: options.rate_multiplier.map(f64::from),
            voice_hint: options.voice_hint,
        };

        let mut guard = self.pipeline.write().await;
        let result = guard.play(text, &native).map_err(to_port_err);
        drop(guard);
        result
    }

    async fn stop(&self) -> Result<(), ReadAlongPortError> {
        let mut guard = self.pipeline.write().await;
        guard.stop();
        drop(guard);
        Ok(())
    }

    async fn status(&self) -> Result<SyncStatusDto, ReadAlongPortError> {
        let guard = self.pipeline.read().await;
        let dto = SyncStatusDto {
            state: state_label(guard.state()).to_owned(),
            word_index: guard.highlighted_word(),
            total_words: guard.word_count(),
        };
        drop(guard);
        Ok(dto)
    }
}
