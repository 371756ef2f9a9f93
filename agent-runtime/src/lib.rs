//! Capability traits the workflow loop depends on, and the `Runtime`
//! that owns process-scoped registries (spec.md §6, §9).

#![deny(missing_docs)]

pub mod capability;
pub mod runtime;

pub use capability::{
    Engine, EngineError, EventId, MemoryStore, ModelClient, ModelClientError, ModelStreamer, RunStore, Sink,
    SinkOptions, StoreError, Stream,
};
pub use runtime::{Runtime, RuntimeConfig, DEFAULT_ACTIVITY_TIMEOUT};
