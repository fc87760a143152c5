//! Claim payloads - tagged, versioned, otherwise opaque

use serde::{Deserialize, Serialize};

/// The content of a claim
///
/// The body is opaque to the contamination layer: policy decisions key
/// off the category, the topic key, and the schema version, never off
/// the body itself. Two live shared claims on the same topic key with
/// differing bodies are the structural signal for a contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Claim category (e.g., "system-capability", "research-finding");
    /// selects expiration and quorum policy
    pub category: String,

    /// Schema version of the body, for forward-compatible consumers
    pub schema_version: u32,

    /// Topic key identifying what the claim is about
    pub topic: String,

    /// Opaque body; never parsed by this layer
    pub body: String,
}

impl Payload {
    /// Create a payload at schema version 1
    pub fn new(
        category: impl Into<String>,
        topic: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            schema_version: 1,
            topic: topic.into(),
            body: body.into(),
        }
    }

    /// Whether two payloads address the same topic with incompatible content
    pub fn contradicts(&self, other: &Payload) -> bool {
        self.topic == other.topic && self.category == other.category && self.body != other.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contradiction_same_topic_different_body() {
        let a = Payload::new("api-functionality", "search/v2", "returns paginated results");
        let b = Payload::new("api-functionality", "search/v2", "endpoint removed");
        assert!(a.contradicts(&b));
    }

    #[test]
    fn test_no_contradiction_across_topics() {
        let a = Payload::new("api-functionality", "search/v2", "returns paginated results");
        let b = Payload::new("api-functionality", "search/v3", "endpoint removed");
        assert!(!a.contradicts(&b));
    }

    #[test]
    fn test_identical_bodies_agree() {
        let a = Payload::new("library-version", "tokio", "1.38");
        let b = Payload::new("library-version", "tokio", "1.38");
        assert!(!a.contradicts(&b));
    }
}
