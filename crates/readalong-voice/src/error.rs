//! Sync engine error types.

/// Errors that can occur in the sync engine.
///
/// The engine is deliberately hard to kill: malformed boundary payloads and
/// stale callbacks are recovered silently inside the session driver and
/// never become errors. What remains is the small set of conditions a
/// caller can actually act on.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The host has no speech capability at all.
    #[error("No speech engine available on this host")]
    EngineUnavailable,

    /// The speech engine refused or failed to start vocalizing.
    #[error("Speech engine failed to start: {source}")]
    Engine {
        /// Underlying engine failure.
        source: anyhow::Error,
    },
}

impl SyncError {
    /// Wrap an arbitrary engine failure.
    pub fn engine(source: impl Into<anyhow::Error>) -> Self {
        Self::Engine {
            source: source.into(),
        }
    }
}
