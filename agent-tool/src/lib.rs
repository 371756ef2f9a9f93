//! Tool spec/codec registry and the concurrent tool dispatcher that
//! routes requests across the three wire modes (spec.md §4.1, §4.6).

#![deny(missing_docs)]

pub mod dispatch;
pub mod registry;

pub use dispatch::{
    classify, synthesize_surplus_error, ActivityHandler, Dispatcher, InlineAgentInvoker, RemoteCaller, Route,
};
pub use registry::{DuplicateToolError, ToolRegistry, ToolRegistryBuilder};
