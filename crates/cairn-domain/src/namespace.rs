//! Namespaces - logical partitions of the claim corpus

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical partition of the claim corpus
///
/// Every claim resides in exactly one namespace at a time; promotion and
/// demotion are namespace moves, never copies. The shared namespace is
/// "the truth" other agents read, and is only ever written by the
/// cross-validator and the hygiene engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "agent")]
pub enum Namespace {
    /// Working memory of a single agent; unverified claims live here
    Private(AgentId),

    /// Shared-validated namespace, readable by every agent
    Shared,

    /// Isolation namespace for flagged claims pending resolution
    Quarantine,
}

impl Namespace {
    /// Encode as a path string (`private/<agent>`, `shared`, `quarantine`)
    pub fn as_path(&self) -> String {
        match self {
            Namespace::Private(agent) => format!("private/{}", agent),
            Namespace::Shared => "shared".to_string(),
            Namespace::Quarantine => "quarantine".to_string(),
        }
    }

    /// Parse a namespace from its path encoding
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "shared" => Ok(Namespace::Shared),
            "quarantine" => Ok(Namespace::Quarantine),
            other => match other.strip_prefix("private/") {
                Some(agent) => Ok(Namespace::Private(AgentId::new(agent)?)),
                None => Err(format!("Invalid namespace path: {}", s)),
            },
        }
    }

    /// Whether this is an agent's private namespace
    pub fn is_private(&self) -> bool {
        matches!(self, Namespace::Private(_))
    }

    /// The owning agent, if this is a private namespace
    pub fn owner(&self) -> Option<&AgentId> {
        match self {
            Namespace::Private(agent) => Some(agent),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_roundtrip() {
        let agent = AgentId::new("scout-7").unwrap();
        for ns in [
            Namespace::Private(agent),
            Namespace::Shared,
            Namespace::Quarantine,
        ] {
            assert_eq!(Namespace::parse(&ns.as_path()).unwrap(), ns);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Namespace::parse("public").is_err());
        assert!(Namespace::parse("private/").is_err());
    }

    #[test]
    fn test_owner() {
        let agent = AgentId::new("scout-7").unwrap();
        let ns = Namespace::Private(agent.clone());
        assert_eq!(ns.owner(), Some(&agent));
        assert_eq!(Namespace::Shared.owner(), None);
    }
}
