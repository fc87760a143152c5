//! Classification states in the claim lifecycle

use serde::{Deserialize, Serialize};

/// Classification state of a claim
///
/// Claims progress through states in promotion order:
/// - `Claim`: bare assertion, no evidence
/// - `Hypothesis`: plausible, explicitly marked uncertain
/// - `EmpiricalValidated`: independently reproduced with evidence,
///   confirmed by at least one other agent
/// - `ExternalVerified`: confirmed against a source outside the agent
///   population
///
/// Side/terminal states never reached by promotion:
/// - `Quarantined`: isolated pending contamination resolution
/// - `Expired`: past its expiry, moved to the archive
/// - `Archived`: retired permanently (confirmed contamination)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimState {
    /// Bare assertion without supporting evidence
    Claim,

    /// Plausible but explicitly uncertain
    Hypothesis,

    /// Independently reproduced with evidence
    EmpiricalValidated,

    /// Confirmed against an external source
    ExternalVerified,

    /// Isolated by the quarantine manager
    Quarantined,

    /// Past expiry, archived by the hygiene sweep
    Expired,

    /// Retired permanently
    Archived,
}

impl ClaimState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimState::Claim => "claim",
            ClaimState::Hypothesis => "hypothesis",
            ClaimState::EmpiricalValidated => "empirical_validated",
            ClaimState::ExternalVerified => "external_verified",
            ClaimState::Quarantined => "quarantined",
            ClaimState::Expired => "expired",
            ClaimState::Archived => "archived",
        }
    }

    /// Parse a state from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "claim" => Some(ClaimState::Claim),
            "hypothesis" => Some(ClaimState::Hypothesis),
            "empirical_validated" => Some(ClaimState::EmpiricalValidated),
            "external_verified" => Some(ClaimState::ExternalVerified),
            "quarantined" => Some(ClaimState::Quarantined),
            "expired" => Some(ClaimState::Expired),
            "archived" => Some(ClaimState::Archived),
            _ => None,
        }
    }

    /// Position in the promotion order, `None` for side/terminal states
    pub fn promotion_rank(&self) -> Option<u8> {
        match self {
            ClaimState::Claim => Some(0),
            ClaimState::Hypothesis => Some(1),
            ClaimState::EmpiricalValidated => Some(2),
            ClaimState::ExternalVerified => Some(3),
            _ => None,
        }
    }

    /// Whether this state carries independent validation
    pub fn is_validated(&self) -> bool {
        matches!(
            self,
            ClaimState::EmpiricalValidated | ClaimState::ExternalVerified
        )
    }

    /// Whether the claim is out of circulation for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimState::Expired | ClaimState::Archived)
    }

    /// Whether the claim is live (readable as part of the working corpus)
    pub fn is_live(&self) -> bool {
        !self.is_terminal() && *self != ClaimState::Quarantined
    }
}

impl std::str::FromStr for ClaimState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid claim state: {}", s))
    }
}

impl std::fmt::Display for ClaimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_order() {
        assert!(
            ClaimState::Claim.promotion_rank() < ClaimState::Hypothesis.promotion_rank()
        );
        assert!(
            ClaimState::Hypothesis.promotion_rank()
                < ClaimState::EmpiricalValidated.promotion_rank()
        );
        assert!(
            ClaimState::EmpiricalValidated.promotion_rank()
                < ClaimState::ExternalVerified.promotion_rank()
        );
    }

    #[test]
    fn test_side_states_have_no_rank() {
        assert_eq!(ClaimState::Quarantined.promotion_rank(), None);
        assert_eq!(ClaimState::Expired.promotion_rank(), None);
        assert_eq!(ClaimState::Archived.promotion_rank(), None);
    }

    #[test]
    fn test_validated_states() {
        assert!(ClaimState::EmpiricalValidated.is_validated());
        assert!(ClaimState::ExternalVerified.is_validated());
        assert!(!ClaimState::Hypothesis.is_validated());
        assert!(!ClaimState::Quarantined.is_validated());
    }

    #[test]
    fn test_liveness() {
        assert!(ClaimState::Claim.is_live());
        assert!(ClaimState::ExternalVerified.is_live());
        assert!(!ClaimState::Quarantined.is_live());
        assert!(!ClaimState::Expired.is_live());
        assert!(!ClaimState::Archived.is_live());
    }

    #[test]
    fn test_parse_roundtrip() {
        for state in [
            ClaimState::Claim,
            ClaimState::Hypothesis,
            ClaimState::EmpiricalValidated,
            ClaimState::ExternalVerified,
            ClaimState::Quarantined,
            ClaimState::Expired,
            ClaimState::Archived,
        ] {
            assert_eq!(ClaimState::parse(state.as_str()), Some(state));
        }
        assert_eq!(ClaimState::parse("fact"), None);
    }
}
