//! Tool registry gateway and provider loop: brokers tool calls between
//! agents and out-of-process providers over a publish/subscribe bus
//! (spec.md §4.7, §4.8).

#![deny(missing_docs)]

pub mod gateway;
pub mod health;
pub mod provider;
pub mod wire;

pub use gateway::{GatewayError, ToolRegistryGateway};
pub use health::{HealthTracker, SharedHealthMap, TickerConfig, ToolsetHealth};
pub use provider::{DeltaSink, ProviderHandler, ProviderLoop, ProviderLoopConfig, ProviderLoopError};
pub use wire::{CallMeta, Pong, ResultArtifact, ResultError, ToolResultMessage, ToolsetMessage};
