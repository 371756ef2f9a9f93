//! The tool [`Identifier`] — a dotted `service.toolset.tool` path, unique
//! within a process (spec.md §3).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dotted-path tool identifier: `service.toolset.tool`.
///
/// Comparable, hashable, serialised as a plain string. Construction
/// validates that the path has exactly three non-empty segments —
/// malformed identifiers are rejected at the boundary rather than
/// silently misrouted.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    raw: String,
    toolset_end: usize,
}

/// Error constructing an [`Identifier`] from a malformed string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("tool identifier must be `service.toolset.tool`, got: {0:?}")]
pub struct IdentifierParseError(pub String);

impl Identifier {
    /// Parse a `service.toolset.tool` string into an [`Identifier`].
    ///
    /// # Errors
    /// Returns [`IdentifierParseError`] unless there are exactly three
    /// dot-separated, non-empty segments.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdentifierParseError> {
        let raw = raw.into();
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(IdentifierParseError(raw));
        }
        let toolset_end = parts[0].len() + 1 + parts[1].len();
        Ok(Self { raw, toolset_end })
    }

    /// Build an identifier from its three segments directly.
    pub fn new(service: &str, toolset: &str, tool: &str) -> Result<Self, IdentifierParseError> {
        Self::parse(format!("{service}.{toolset}.{tool}"))
    }

    /// The full dotted path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The `service` segment.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.raw[..self.raw.find('.').expect("validated at construction")]
    }

    /// The `service.toolset` prefix — this is the toolset's routing key
    /// (e.g. the stream name `toolset:<service.toolset>:requests`).
    #[must_use]
    pub fn toolset(&self) -> &str {
        &self.raw[..self.toolset_end]
    }

    /// The trailing `tool` segment.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.raw[self.toolset_end + 1..]
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_segments() {
        let id = Identifier::parse("search.web.fetch").unwrap();
        assert_eq!(id.service(), "search");
        assert_eq!(id.toolset(), "search.web");
        assert_eq!(id.tool(), "fetch");
        assert_eq!(id.as_str(), "search.web.fetch");
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(Identifier::parse("search.fetch").is_err());
        assert!(Identifier::parse("a.b.c.d").is_err());
        assert!(Identifier::parse("a..c").is_err());
        assert!(Identifier::parse("").is_err());
    }

    #[test]
    fn new_from_segments_matches_parse() {
        let a = Identifier::new("svc", "ts", "tool").unwrap();
        let b = Identifier::parse("svc.ts.tool").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn serde_round_trip() {
        let id = Identifier::parse("svc.ts.tool").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"svc.ts.tool\"");
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn serde_rejects_malformed() {
        let err: Result<Identifier, _> = serde_json::from_str("\"bad\"");
        assert!(err.is_err());
    }
}
