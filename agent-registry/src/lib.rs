//! Multi-registry toolset discovery: per-registry TTL caching, a
//! background sync loop applying include/exclude glob filters, and a
//! relevance-sorted search fan-out across registries (spec.md §4.12).

#![deny(missing_docs)]

pub mod cache;
pub mod client;
pub mod glob;
pub mod manager;
pub mod types;

pub use client::{RegistryClient, RegistryError};
pub use manager::RegistrationDiscoveryManager;
pub use types::{Federation, RegistryConfig, SearchHit, SearchOptions, Toolset};
