#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod backend;
pub mod clock;
pub mod error;
pub mod pipeline;
pub mod rate;
pub mod scheduler;
pub mod service;
pub mod text;

// Re-export key types for convenience
pub use backend::{BoundarySignal, SpeakRequest, SpeechBackend, SpeechHandle, SpeechSignal};
pub use clock::{FrameClock, IntervalClock};
pub use error::SyncError;
pub use pipeline::{EndReason, PlayOptions, SyncConfig, SyncEvent, SyncPipeline, SyncState};
pub use rate::{RateConfig, RateEstimator};
pub use service::ReadAlongService;
