#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use events::AppEvent;
pub use ports::{
    AppEventEmitter, NoopEmitter, PlayOptionsDto, ReadAlongPort, ReadAlongPortError, SyncStatusDto,
};
