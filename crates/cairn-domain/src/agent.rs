//! Agent identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for an agent writing to or reading from the store.
///
/// Agents are opaque external collaborators; the identifier is the only
/// thing the contamination layer knows about them. It is attached to
/// every claim, vote, and credibility adjustment the agent produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Create an agent identifier
    ///
    /// # Errors
    /// Returns an error if the identifier is empty or contains `/`,
    /// which is reserved as the namespace path separator.
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.is_empty() {
            return Err("Agent id cannot be empty".to_string());
        }
        if value.contains('/') {
            return Err(format!("Agent id '{}' may not contain '/'", value));
        }
        Ok(Self(value))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
