//! Validation records - one validator's independent verdict on a claim

use crate::agent::AgentId;
use crate::claim::ClaimId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a cross-validation round
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(u128);

impl RoundId {
    /// Generate a new UUIDv7-based RoundId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a RoundId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for RoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// A validator's verdict on a claim under cross-validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The validator independently confirmed the claim
    Approve,

    /// The validator could not confirm, or contradicted, the claim
    Reject,

    /// The claim is plausible but the cited evidence is insufficient
    NeedsEvidence,
}

impl Verdict {
    /// Get the verdict name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approve => "approve",
            Verdict::Reject => "reject",
            Verdict::NeedsEvidence => "needs_evidence",
        }
    }

    /// Parse a verdict from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Verdict::Approve),
            "reject" => Some(Verdict::Reject),
            "needs_evidence" => Some(Verdict::NeedsEvidence),
            _ => None,
        }
    }
}

/// The result of one validator's independent check of a claim
///
/// Multiple records attach to one claim during cross-validation. Once
/// the round settles, the records are immutable history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Round this record belongs to
    pub round: RoundId,

    /// Claim under validation
    pub claim: ClaimId,

    /// Validator identity (never the originating agent)
    pub validator: AgentId,

    /// The verdict
    pub verdict: Verdict,

    /// Whether the confirmation came from a source outside the agent
    /// population (drives `ExternalVerified` promotion)
    pub external: bool,

    /// Validator's own confidence estimate in [0.0, 1.0]
    pub confidence: f64,

    /// When the verdict was recorded (seconds since Unix epoch)
    pub recorded_at: u64,
}

impl ValidationRecord {
    /// Create a validation record
    pub fn new(
        round: RoundId,
        claim: ClaimId,
        validator: AgentId,
        verdict: Verdict,
        confidence: f64,
        recorded_at: u64,
    ) -> Self {
        Self {
            round,
            claim,
            validator,
            verdict,
            external: false,
            confidence,
            recorded_at,
        }
    }

    /// Mark the verdict as externally sourced
    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}

/// Quorum requirement for a cross-validation round
///
/// Quorum strength is policy, configured per claim category; it is
/// never a hardcoded constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumRule {
    /// Every assigned validator must vote, and all must approve
    All,

    /// At least this many independent validators must approve
    AtLeast(u32),
}

impl QuorumRule {
    /// Minimum number of approvals needed given the assigned validator count
    pub fn required_approvals(&self, assigned: usize) -> usize {
        match self {
            QuorumRule::All => assigned,
            QuorumRule::AtLeast(n) => (*n as usize).min(assigned.max(1)),
        }
    }
}

/// Persistent state of one cross-validation round
///
/// Stored so that a crash mid-round resumes with the votes already
/// received instead of losing them. The received records themselves
/// live in the validation record table keyed by [`RoundId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    /// Round identifier
    pub id: RoundId,

    /// Claim under validation
    pub claim: ClaimId,

    /// Quorum requirement copied from policy when the round opened
    pub rule: QuorumRule,

    /// Validators assigned to this round (originator excluded)
    pub assigned: Vec<AgentId>,

    /// When the round opened (seconds since Unix epoch)
    pub opened_at: u64,

    /// Soft deadline; past this the round is abandoned, never promoted
    pub deadline: u64,
}

impl RoundState {
    /// Whether the round's deadline has passed at `now`
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_required_approvals() {
        assert_eq!(QuorumRule::All.required_approvals(3), 3);
        assert_eq!(QuorumRule::AtLeast(1).required_approvals(3), 1);
        assert_eq!(QuorumRule::AtLeast(5).required_approvals(3), 3);
        // A round never requires zero approvals
        assert_eq!(QuorumRule::AtLeast(1).required_approvals(0), 1);
    }

    #[test]
    fn test_round_expiry() {
        let round = RoundState {
            id: RoundId::new(),
            claim: ClaimId::new(),
            rule: QuorumRule::AtLeast(1),
            assigned: vec![AgentId::new("checker-1").unwrap()],
            opened_at: 1_000,
            deadline: 1_300,
        };
        assert!(!round.is_expired_at(1_299));
        assert!(round.is_expired_at(1_300));
    }

    #[test]
    fn test_verdict_roundtrip() {
        for v in [Verdict::Approve, Verdict::Reject, Verdict::NeedsEvidence] {
            assert_eq!(Verdict::parse(v.as_str()), Some(v));
        }
        assert_eq!(Verdict::parse("maybe"), None);
    }

    #[test]
    fn test_external_marker() {
        let record = ValidationRecord::new(
            RoundId::new(),
            ClaimId::new(),
            AgentId::new("checker-1").unwrap(),
            Verdict::Approve,
            0.9,
            1_700_000_000,
        );
        assert!(!record.external);
        assert!(record.external().external);
    }
}
