//! Read-along port — trait abstraction for speech-synchronized highlighting.
//!
//! # Design Rules
//!
//! - DTOs here are transport-agnostic wire shapes (no `readalong-voice` types).
//! - Conversion from engine-native types happens inside `readalong-voice`,
//!   never here. This keeps `readalong-core` free of any dependency on the
//!   engine crate.
//! - `ReadAlongPort` is the only surface adapters need in order to start and
//!   stop read-aloud sessions; word-by-word progress arrives through the
//!   [`AppEventEmitter`](crate::ports::AppEventEmitter) stream, not through
//!   polling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── DTOs ─────────────────────────────────────────────────────────────────────

/// Per-play options supplied by the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayOptionsDto {
    /// Speaking-rate multiplier relative to the engine's nominal rate.
    ///
    /// `None` means "use the configured default" (slightly below 1.0 for a
    /// calmer pace).
    pub rate_multiplier: Option<f32>,

    /// Preferred voice identifier, passed through to the speech engine
    /// verbatim. `None` lets the engine pick.
    pub voice_hint: Option<String>,
}

/// Snapshot of the sync engine, for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusDto {
    /// State machine label (`"idle"`, `"speaking"`, `"stopped"`).
    pub state: String,

    /// Zero-based index of the currently highlighted word, if speaking.
    pub word_index: Option<usize>,

    /// Total word count of the active utterance, if speaking.
    pub total_words: Option<usize>,
}

// ── Error ─────────────────────────────────────────────────────────────────────

/// Errors returned by `ReadAlongPort` operations.
#[derive(Debug, Error)]
pub enum ReadAlongPortError {
    /// The host has no speech capability. Surfaced once as a user-visible
    /// notice; there is no retry.
    #[error("Speech playback is not available on this device")]
    Unavailable,

    /// Unexpected internal error.
    #[error("Internal speech sync error: {0}")]
    Internal(String),
}

// ── Port trait ────────────────────────────────────────────────────────────────

/// Port trait for speech-synchronized word highlighting.
///
/// Implemented by `ReadAlongService` in `readalong-voice`.
/// Consumed by HTTP handlers and the desktop shell.
///
/// # Scope
///
/// Starting a new utterance implicitly cancels any session already in
/// flight; `stop` is idempotent and callable in any state. Neither call
/// blocks on the underlying engine going silent.
#[async_trait]
pub trait ReadAlongPort: Send + Sync {
    /// Start reading `text` aloud with synchronized highlighting.
    ///
    /// Blank or whitespace-only text is a no-op (no session starts, no
    /// error is raised).
    async fn play(&self, text: &str, options: PlayOptionsDto) -> Result<(), ReadAlongPortError>;

    /// Stop the active session, if any. Idempotent.
    async fn stop(&self) -> Result<(), ReadAlongPortError>;

    /// Return the current engine state and highlight position.
    async fn status(&self) -> Result<SyncStatusDto, ReadAlongPortError>;
}
