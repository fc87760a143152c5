//! Contamination events - detector findings over the claim corpus

use crate::claim::ClaimId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a contamination event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u128);

impl EventId {
    /// Generate a new UUIDv7-based EventId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an EventId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Kind of contamination detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContaminationKind {
    /// Confidence at or above the high threshold with no evidence;
    /// structurally impossible past the gate, kept as a consistency audit
    UnsupportedConfidence,

    /// Two or more live shared claims on the same topic key with
    /// incompatible content
    Contradiction,

    /// A claim still being cited after its expiry
    StaleUse,

    /// Confidence increased with no validation record backing the increase
    ConfidenceDrift,
}

impl ContaminationKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ContaminationKind::UnsupportedConfidence => "unsupported_confidence",
            ContaminationKind::Contradiction => "contradiction",
            ContaminationKind::StaleUse => "stale_use",
            ContaminationKind::ConfidenceDrift => "confidence_drift",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unsupported_confidence" => Some(ContaminationKind::UnsupportedConfidence),
            "contradiction" => Some(ContaminationKind::Contradiction),
            "stale_use" => Some(ContaminationKind::StaleUse),
            "confidence_drift" => Some(ContaminationKind::ConfidenceDrift),
            _ => None,
        }
    }

    /// Severity assigned to this kind by the fixed rule table
    pub fn severity(&self) -> Severity {
        match self {
            ContaminationKind::UnsupportedConfidence => Severity::Critical,
            ContaminationKind::Contradiction => Severity::High,
            ContaminationKind::StaleUse => Severity::Medium,
            ContaminationKind::ConfidenceDrift => Severity::Medium,
        }
    }
}

/// Severity of a contamination event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational, no credibility impact expected
    Low,
    /// Worth review
    Medium,
    /// Affects shared truth
    High,
    /// Invariant violation
    Critical,
}

impl Severity {
    /// Get the severity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Parse a severity from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Credibility penalty applied when contamination at this severity
    /// is confirmed by an operator
    pub fn credibility_penalty(&self) -> f64 {
        match self {
            Severity::Low => 0.02,
            Severity::Medium => 0.05,
            Severity::High => 0.10,
            Severity::Critical => 0.20,
        }
    }
}

/// A detector finding
///
/// Created by the contamination detector, closed only by an explicit
/// quarantine resolution; findings are never auto-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContaminationEvent {
    /// Unique identifier
    pub id: EventId,

    /// The flagged claim
    pub claim: ClaimId,

    /// What was detected
    pub kind: ContaminationKind,

    /// Severity per the fixed rule table
    pub severity: Severity,

    /// Detection timestamp (seconds since Unix epoch)
    pub detected_at: u64,

    /// Resolution timestamp, set by the quarantine manager
    pub resolved_at: Option<u64>,
}

impl ContaminationEvent {
    /// Create a new open event; severity comes from the rule table
    pub fn new(claim: ClaimId, kind: ContaminationKind, detected_at: u64) -> Self {
        Self {
            id: EventId::new(),
            claim,
            kind,
            severity: kind.severity(),
            detected_at,
            resolved_at: None,
        }
    }

    /// Whether the event is still awaiting resolution
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}
