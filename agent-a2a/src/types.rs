//! Provider/skill configuration and the remote agent card consulted
//! during registration (spec.md §4.11).

use serde::{Deserialize, Serialize};

/// One skill a remote provider exposes, addressed as `suite.skill` on the
/// wire (`tasks/send` params `{suite, skill, payload}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    /// The skill's name within its suite.
    pub name: String,
    /// Description advertised to planners as the tool's description.
    pub description: String,
    /// Free-form tags carried onto the synthesized `ToolSpec`.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Configuration for registering one remote agent as a local toolset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The remote agent's suite name.
    pub suite: String,
    /// Base URL (or transport-specific address) the transport dials.
    pub url: String,
    /// Skills this config expects the provider to expose.
    pub skills: Vec<SkillConfig>,
}

/// A skill as advertised by the remote provider's own `AgentCard`, used
/// for card-consistency validation against `ProviderConfig::skills`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSkill {
    /// The skill's name.
    pub name: String,
    /// The provider's own description of the skill.
    pub description: String,
}

/// A remote agent's self-description, fetched before registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    /// The suite name the card claims.
    pub suite: String,
    /// Skills the provider claims to support.
    pub skills: Vec<CardSkill>,
}

/// Registration failed because the remote card did not match the
/// configured skills.
#[derive(Debug, Clone, thiserror::Error)]
#[error("registration failed for suite `{suite}` at {url}: {reason}")]
pub struct RegistrationError {
    /// The suite being registered.
    pub suite: String,
    /// The provider URL.
    pub url: String,
    /// Why registration was rejected.
    pub reason: String,
}
