//! Gate error types

use cairn_domain::{ArtifactId, ClaimId, ClaimState};
use thiserror::Error;

/// Errors that can occur at the validation gate
#[derive(Error, Debug)]
pub enum GateError {
    /// Namespace scope violation; caller should not retry without
    /// correcting scope
    #[error("Access denied: {reason}")]
    AccessDenied {
        /// Why the access controller refused
        reason: String,
    },

    /// High confidence asserted without evidence. The claim was still
    /// stored, demoted to a capped hypothesis in the originator's
    /// private namespace; the caller may resubmit with evidence.
    #[error("Insufficient evidence for confidence {requested}; stored {claim} as {stored_state} capped at {capped_confidence}")]
    InsufficientEvidence {
        /// The stored claim
        claim: ClaimId,
        /// State the claim was stored in
        stored_state: ClaimState,
        /// Confidence the agent asserted
        requested: f64,
        /// Confidence actually stored
        capped_confidence: f64,
    },

    /// Confidence outside [0.0, 1.0]
    #[error("Confidence {0} is outside [0.0, 1.0]")]
    InvalidConfidence(f64),

    /// A cited evidence artifact does not exist in the evidence store
    #[error("Unknown evidence artifact: {0}")]
    UnknownEvidence(ArtifactId),

    /// Storage layer error
    #[error("Store error: {0}")]
    Store(String),

    /// Policy document error
    #[error("Policy error: {0}")]
    Policy(String),
}
