//! Federates a remote agent into the local toolset universe by speaking
//! JSON-RPC task semantics to it (spec.md §4.11 Provider Federation).
//!
//! An operator supplies a [`ProviderConfig`] naming the skills they expect
//! a remote suite to expose. [`ToolsetRegistration::register`] fetches the
//! remote's own [`AgentCard`] and refuses to proceed if it disagrees with
//! the configured skills, so a misconfigured or renamed remote fails at
//! registration time rather than surfacing confusing tool errors at call
//! time. Once registered, [`ToolsetRegistration::execute`] sends
//! `tasks/send` over the caller-supplied [`A2ATransport`] and maps
//! JSON-RPC errors onto the same [`agent_core::RetryHint`] vocabulary the
//! rest of the workspace uses.

#![deny(missing_docs)]

pub mod federation;
pub mod rpc;
pub mod types;

pub use federation::{retry_hint_for, validate_card, ToolsetRegistration};
pub use rpc::{A2ATransport, JsonRpcError, CODE_INVALID_PARAMS, CODE_METHOD_NOT_FOUND};
pub use types::{AgentCard, CardSkill, ProviderConfig, RegistrationError, SkillConfig};
