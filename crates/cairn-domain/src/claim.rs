//! Claim module - the atomic unit of the shared knowledge store

use crate::agent::AgentId;
use crate::evidence::ArtifactId;
use crate::namespace::Namespace;
use crate::payload::Payload;
use crate::state::ClaimState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence threshold above which evidence and validation are mandatory
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Confidence cap applied when a claim is stored as a hypothesis
pub const HYPOTHESIS_CONFIDENCE_CAP: f64 = 0.5;

/// Unique identifier for a claim based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability for temporal queries
/// - 128-bit uniqueness
/// - No coordination required between concurrent agent writers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(u128);

impl ClaimId {
    /// Generate a new UUIDv7-based ClaimId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ClaimId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a ClaimId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid claim id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Get the timestamp component (milliseconds since Unix epoch)
    pub fn timestamp(&self) -> u64 {
        // UUIDv7: top 48 bits are Unix millisecond timestamp
        (self.0 >> 80) as u64
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// An atomic assertion made by one agent
///
/// Claims carry a classification state and a confidence, never bare
/// truth. After creation a claim is mutated only by the validation gate,
/// cross-validator, hygiene engine, or quarantine manager; the
/// originating agent never edits it in place. Destruction is archival,
/// not deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,

    /// Originating agent
    pub agent: AgentId,

    /// Namespace the claim currently resides in (exactly one)
    pub namespace: Namespace,

    /// Tagged, versioned content
    pub payload: Payload,

    /// Classification state (exactly one at any instant)
    pub state: ClaimState,

    /// Confidence in [0.0, 1.0]
    pub confidence: f64,

    /// Evidence artifact references
    pub evidence: Vec<ArtifactId>,

    /// Creation timestamp (seconds since Unix epoch)
    pub created_at: u64,

    /// Expiration timestamp stamped by the validation gate
    pub expires_at: Option<u64>,

    /// Last time another agent cited/read this claim
    pub last_cited_at: Option<u64>,

    /// Set when the claim needs re-validation (quorum timeout, or
    /// nearing expiry while still actively cited)
    pub revalidation_flagged: bool,

    /// Version stamp for optimistic concurrency (compare-and-set)
    pub version: u64,
}

impl Claim {
    /// Create a new claim in the originator's private namespace
    ///
    /// Starts in the `Claim` state at version 0; the validation gate is
    /// responsible for reclassification, expiry stamping, and routing.
    pub fn new(agent: AgentId, payload: Payload, confidence: f64, created_at: u64) -> Self {
        Self {
            id: ClaimId::new(),
            namespace: Namespace::Private(agent.clone()),
            agent,
            payload,
            state: ClaimState::Claim,
            confidence,
            evidence: Vec::new(),
            created_at,
            expires_at: None,
            last_cited_at: None,
            revalidation_flagged: false,
            version: 0,
        }
    }

    /// Attach evidence artifact references
    pub fn with_evidence(mut self, evidence: Vec<ArtifactId>) -> Self {
        self.evidence = evidence;
        self
    }

    /// Whether the confidence invariant holds: confidence at or above
    /// [`HIGH_CONFIDENCE`] requires a validated state and at least one
    /// evidence reference.
    pub fn confidence_supported(&self) -> bool {
        if self.confidence < HIGH_CONFIDENCE {
            return true;
        }
        self.state.is_validated() && !self.evidence.is_empty()
    }

    /// Whether the claim is past its expiry at `now`
    pub fn is_expired_at(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(t) if t <= now)
    }
}
