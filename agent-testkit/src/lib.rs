//! In-memory doubles for every narrow capability trait the workflow
//! loop depends on, so a run can be exercised deterministically without
//! a real model provider, persistence layer, or bus (spec.md §9
//! "Interface-over-inheritance": tests instantiate disjoint runtimes).

#![deny(missing_docs)]

pub mod memory_store;
pub mod planner;
pub mod run_store;
pub mod stream;

pub use memory_store::InMemoryMemoryStore;
pub use planner::ScriptedModelClient;
pub use run_store::InMemoryRunStore;
pub use stream::InMemoryStream;
