//! Write-path policy checks

use crate::{GateError, SharedPolicy};
use cairn_access::{AccessController, AccessDecision, Principal};
use cairn_domain::claim::{HIGH_CONFIDENCE, HYPOTHESIS_CONFIDENCE_CAP};
use cairn_domain::traits::{ClaimStore, EvidenceStore};
use cairn_domain::{AgentId, ArtifactId, Claim, ClaimId, ClaimState, Namespace, Payload, QuorumRule};

/// A claim write as submitted by an agent
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Submitting agent
    pub agent: AgentId,

    /// Target namespace (agents submit into their own private space)
    pub namespace: Namespace,

    /// Claim content
    pub payload: Payload,

    /// Asserted confidence in [0.0, 1.0]
    pub confidence: f64,

    /// Cited evidence artifacts (must already be uploaded)
    pub evidence: Vec<ArtifactId>,
}

/// What the gate did with an accepted write
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    /// The stored claim
    pub claim: ClaimId,

    /// State the claim was stored in
    pub state: ClaimState,

    /// Confidence actually stored (may be capped below the assertion)
    pub confidence: f64,

    /// Expiration stamped from the category policy
    pub expires_at: u64,

    /// Whether the caller must open a cross-validation round
    pub pending_validation: bool,

    /// Quorum rule for the round, when validation is pending
    pub quorum: Option<QuorumRule>,
}

/// The Validation Gate checks every claim write before storage
///
/// The gate never writes to the shared namespace itself: accepted
/// claims land in the originator's private namespace, and the outcome
/// tells the caller whether a cross-validation round must be opened.
pub struct ValidationGate {
    policy: SharedPolicy,
}

impl ValidationGate {
    /// Create a gate over a shared policy handle
    pub fn new(policy: SharedPolicy) -> Self {
        Self { policy }
    }

    /// The policy handle (shared with the cross-validator)
    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    /// Apply the gate to one claim write
    ///
    /// Checks, in order: confidence bounds, namespace scope, evidence
    /// existence, then the evidence/confidence rule. An accepted claim
    /// is stored in the originator's private namespace with its expiry
    /// stamped from policy. A high-confidence claim without evidence is
    /// stored as a capped `Hypothesis` and the write still fails with
    /// [`GateError::InsufficientEvidence`] so the agent knows to
    /// resubmit with support.
    pub fn submit<S>(
        &self,
        store: &mut S,
        access: &AccessController,
        request: SubmitRequest,
        now: u64,
    ) -> Result<SubmitOutcome, GateError>
    where
        S: ClaimStore + EvidenceStore,
        <S as ClaimStore>::Error: std::fmt::Display,
        <S as EvidenceStore>::Error: std::fmt::Display,
    {
        if !(0.0..=1.0).contains(&request.confidence) {
            return Err(GateError::InvalidConfidence(request.confidence));
        }

        let principal = Principal::Agent(request.agent.clone());
        if let AccessDecision::Deny { reason } = access.check_write(&principal, &request.namespace)
        {
            return Err(GateError::AccessDenied { reason });
        }

        for artifact in &request.evidence {
            let present = EvidenceStore::has_artifact(store, artifact)
                .map_err(|e| GateError::Store(e.to_string()))?;
            if !present {
                return Err(GateError::UnknownEvidence(artifact.clone()));
            }
        }

        let (expire_after, requires_cv, quorum) = self.policy.read(|p| {
            let category = p.category(&request.payload.category);
            (
                category.expire_after_secs,
                category.requires_cross_validation,
                category.quorum,
            )
        });

        let requested = request.confidence;
        let mut claim = Claim::new(request.agent, request.payload, requested, now)
            .with_evidence(request.evidence);
        claim.expires_at = Some(now + expire_after);

        let insufficient = requested >= HIGH_CONFIDENCE && claim.evidence.is_empty();

        if requested >= HIGH_CONFIDENCE {
            // High confidence is earned through validation, never
            // asserted; the claim waits under the hypothesis cap
            claim.state = ClaimState::Hypothesis;
            claim.confidence = HYPOTHESIS_CONFIDENCE_CAP;
        } else if claim.evidence.is_empty() {
            claim.state = ClaimState::Claim;
        } else {
            claim.state = ClaimState::Hypothesis;
        }

        ClaimStore::insert_claim(store, &claim).map_err(|e| GateError::Store(e.to_string()))?;

        if insufficient {
            tracing::warn!(
                claim = %claim.id,
                agent = %claim.agent,
                requested,
                "confidence asserted without evidence; stored as capped hypothesis"
            );
            return Err(GateError::InsufficientEvidence {
                claim: claim.id,
                stored_state: claim.state,
                requested,
                capped_confidence: claim.confidence,
            });
        }

        // High-confidence assertions always go through validation, even
        // when the category itself would not demand it
        let pending_validation = requires_cv || requested >= HIGH_CONFIDENCE;

        tracing::debug!(
            claim = %claim.id,
            state = %claim.state,
            pending_validation,
            "claim accepted at gate"
        );

        Ok(SubmitOutcome {
            claim: claim.id,
            state: claim.state,
            confidence: claim.confidence,
            expires_at: now + expire_after,
            pending_validation,
            quorum: pending_validation.then_some(quorum),
        })
    }
}
