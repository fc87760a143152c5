//! Quarantine error types

use cairn_domain::{ClaimId, ClaimState, EventId};
use thiserror::Error;

/// Errors that can occur in the quarantine manager
#[derive(Error, Debug)]
pub enum QuarantineError {
    /// Another transition on the same claim is in progress
    #[error("Claim {0} is locked by a concurrent quarantine transition")]
    LockConflict(ClaimId),

    /// The contamination event does not exist
    #[error("Contamination event not found: {0}")]
    EventNotFound(EventId),

    /// The event was already resolved
    #[error("Contamination event {0} is already resolved")]
    AlreadyResolved(EventId),

    /// The flagged claim does not exist
    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    /// The claim is not in a state this transition applies to
    #[error("Claim {claim} is {state}, expected {expected}")]
    WrongState {
        /// The claim
        claim: ClaimId,
        /// Its current state
        state: ClaimState,
        /// The state the transition requires
        expected: ClaimState,
    },

    /// Storage layer error
    #[error("Store error: {0}")]
    Store(String),
}
