//! Cross-validator error types

use cairn_domain::{AgentId, ClaimId, ClaimState, RoundId};
use thiserror::Error;

/// Errors that can occur during cross-validation
#[derive(Error, Debug)]
pub enum QuorumError {
    /// The claim to validate does not exist
    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    /// The claim is not in a state that can be validated
    #[error("Claim {claim} in state {state} is not eligible for validation")]
    NotEligible {
        /// The claim
        claim: ClaimId,
        /// Its current state
        state: ClaimState,
    },

    /// A round is already open for this claim
    #[error("Claim {0} already has an open validation round")]
    RoundAlreadyOpen(ClaimId),

    /// No open round exists for this claim
    #[error("No open validation round for claim {0}")]
    NoOpenRound(ClaimId),

    /// The round settled or expired before the vote arrived
    #[error("Round {0} is closed")]
    RoundClosed(RoundId),

    /// A claim's originator tried to vote on their own claim
    #[error("Agent {validator} cannot validate their own claim {claim}")]
    SelfVote {
        /// The claim
        claim: ClaimId,
        /// The offending validator
        validator: AgentId,
    },

    /// The voter was not assigned to the round
    #[error("Agent {validator} is not assigned to round {round}")]
    NotAssigned {
        /// The round
        round: RoundId,
        /// The unassigned voter
        validator: AgentId,
    },

    /// The validator already voted in this round
    #[error("Agent {validator} already voted in round {round}")]
    DuplicateVote {
        /// The round
        round: RoundId,
        /// The repeat voter
        validator: AgentId,
    },

    /// A round needs at least one validator besides the originator
    #[error("No validators assigned for claim {0}")]
    NoValidators(ClaimId),

    /// Validator confidence outside [0.0, 1.0]
    #[error("Confidence {0} is outside [0.0, 1.0]")]
    InvalidConfidence(f64),

    /// Storage layer error
    #[error("Store error: {0}")]
    Store(String),
}
