//! Speech engine backend trait — the engine-agnostic seam for vocalization.
//!
//! The sync engine never talks to a concrete speech stack. The host hands
//! the pipeline a [`SpeechBackend`] (a platform TTS wrapper, a remote
//! audio session, a scripted fake in tests) and the pipeline drives it
//! through this narrow surface: start vocalizing, listen for progress
//! signals, stop on demand.
//!
//! # Signal contract
//!
//! A backend fires [`SpeechSignal::Started`] once, then zero or more
//! [`SpeechSignal::Boundary`] corrections, then exactly one of
//! [`SpeechSignal::Ended`] or [`SpeechSignal::Error`]. Boundary payloads
//! are best-effort: the character offset and elapsed time may each be
//! absent, clamped, or non-monotonic on some platforms, and the pipeline
//! tolerates all three. Signals arriving after [`SpeechBackend::stop`] are
//! permitted — cancellation of a real engine is not instantaneous — and
//! are discarded by the session guard.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::SyncError;

// ── Requests and signals ───────────────────────────────────────────

/// A request to begin vocalizing one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakRequest {
    /// Whitespace-normalized text to vocalize.
    pub text: String,

    /// Speaking-rate multiplier (1.0 = the engine's natural pace).
    pub rate_multiplier: f64,

    /// Preferred voice identifier, passed through verbatim.
    pub voice_hint: Option<String>,
}

/// Opaque token identifying one engine-side vocalization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeechHandle(u64);

impl SpeechHandle {
    /// Wrap a backend-chosen raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Best-effort progress payload attached to a boundary signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundarySignal {
    /// Character offset into the spoken text (Unicode scalar values of the
    /// normalized utterance), when the engine reports one.
    pub char_offset: Option<usize>,

    /// Time elapsed since vocalization began, when the engine reports one.
    pub elapsed: Option<Duration>,
}

/// Asynchronous notifications from the speech engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechSignal {
    /// Audio is actually playing; highlight tracking may begin.
    Started,

    /// A progress correction at engine-chosen granularity.
    Boundary(BoundarySignal),

    /// Vocalization finished naturally.
    Ended,

    /// Vocalization failed. Non-fatal to the host — the session just ends.
    Error(String),
}

// ── Backend trait ──────────────────────────────────────────────────

/// Backend-agnostic speech engine.
///
/// Implementations must be `Send + Sync` so the pipeline can share them
/// with spawned session drivers.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechBackend: Send + Sync {
    /// Begin vocalizing.
    ///
    /// Must not block on audio: the call returns as soon as the engine has
    /// accepted the request, and all subsequent progress flows through
    /// `signals`. Dropping the sender without an `Ended`/`Error` signal is
    /// treated as an engine failure.
    fn speak(
        &self,
        request: &SpeakRequest,
        signals: mpsc::UnboundedSender<SpeechSignal>,
    ) -> Result<SpeechHandle, SyncError>;

    /// Best-effort immediate halt of one vocalization session.
    ///
    /// The engine may keep emitting signals for a short platform-dependent
    /// window afterwards; callers must not rely on silence.
    fn stop(&self, handle: SpeechHandle);
}
