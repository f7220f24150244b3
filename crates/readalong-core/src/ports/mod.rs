//! Port traits and wire-shape DTOs consumed by adapters.

mod event_emitter;
mod read_along;

pub use event_emitter::{AppEventEmitter, NoopEmitter};
pub use read_along::{PlayOptionsDto, ReadAlongPort, ReadAlongPortError, SyncStatusDto};
