//! Canonical event union for all cross-adapter events.
//!
//! This module is the single source of truth for events forwarded to
//! presentation layers (SSE handlers, desktop shells, test collectors).
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag for TypeScript compatibility:
//!
//! ```json
//! { "type": "word_highlighted", "index": 3 }
//! ```

use serde::{Deserialize, Serialize};

/// Canonical event types for all adapters.
///
/// Each variant includes all necessary context for the event to be
/// self-describing; consumers never need to correlate events against
/// engine-internal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// The spoken-word estimate advanced to a new word.
    ///
    /// Indices are zero-based positions into the utterance's word sequence
    /// and never move backward within one session.
    WordHighlighted {
        /// Zero-based index of the word currently being spoken.
        index: usize,
    },

    /// The highlight was cleared (session ended one way or another).
    HighlightCleared,

    /// The speech sync engine changed state.
    SpeechStateChanged {
        /// State machine label (`"idle"`, `"speaking"`, `"stopped"`).
        state: String,
    },

    /// A speech session ended.
    SpeechSessionEnded {
        /// Why the session ended (`"completed"`, `"cancelled"`, `"error"`).
        reason: String,
    },

    /// A speech error that should be surfaced to the user.
    SpeechError {
        /// Human-readable error description.
        message: String,
    },
}

impl AppEvent {
    /// Create a word highlighted event.
    pub const fn word_highlighted(index: usize) -> Self {
        Self::WordHighlighted { index }
    }

    /// Create a session ended event.
    pub fn session_ended(reason: impl Into<String>) -> Self {
        Self::SpeechSessionEnded {
            reason: reason.into(),
        }
    }

    /// Create a speech error event.
    pub fn speech_error(message: impl Into<String>) -> Self {
        Self::SpeechError {
            message: message.into(),
        }
    }
}
