//! Round lifecycle: open, vote, settle, expire

use crate::QuorumError;
use cairn_domain::claim::HYPOTHESIS_CONFIDENCE_CAP;
use cairn_domain::traits::{ClaimStore, CredibilityStore, ValidationStore};
use cairn_domain::{
    AdjustmentReason, AgentId, Claim, ClaimId, ClaimState, CredibilityEvent, QuorumRule, RoundId,
    RoundState, ValidationRecord, Verdict,
};
use std::fmt::Display;

/// One validator's vote as submitted
#[derive(Debug, Clone)]
pub struct Vote {
    /// The voting validator
    pub validator: AgentId,

    /// The verdict
    pub verdict: Verdict,

    /// Whether the confirmation came from outside the agent population
    pub external: bool,

    /// Validator's own confidence estimate in [0.0, 1.0]
    pub confidence: f64,
}

/// What a vote did to the round
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    /// The round stays open
    Pending {
        /// Approvals received so far
        approvals: usize,
        /// Approvals the quorum rule demands
        required: usize,
    },

    /// Quorum met; the claim moved to the shared namespace
    Promoted {
        /// Validated state the claim settled in
        state: ClaimState,
        /// Confidence derived from the approving validators
        confidence: f64,
    },

    /// Quorum became unreachable through rejections; the claim dropped
    /// back to a private hypothesis
    Rejected,

    /// Quorum became unreachable without any rejection; the claim needs
    /// more evidence and was flagged for re-validation
    EvidenceRequested,
}

/// The Cross-Validator settles claims through independent verdicts
///
/// Stateless besides the round timeout; all round state lives in the
/// store so an interrupted round resumes with its votes intact.
pub struct CrossValidator {
    timeout_secs: u64,
}

impl CrossValidator {
    /// Create a cross-validator with the given round timeout
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// Open a validation round for a claim
    ///
    /// The originating agent is filtered out of the assignment; a round
    /// with nobody left to vote is refused. At most one round per claim
    /// is open at a time.
    pub fn open_round<S>(
        &self,
        store: &mut S,
        claim_id: ClaimId,
        rule: QuorumRule,
        validators: Vec<AgentId>,
        now: u64,
    ) -> Result<RoundState, QuorumError>
    where
        S: ClaimStore + ValidationStore,
        <S as ClaimStore>::Error: Display,
        <S as ValidationStore>::Error: Display,
    {
        let claim = ClaimStore::get_claim(store, claim_id)
            .map_err(store_err)?
            .ok_or(QuorumError::ClaimNotFound(claim_id))?;

        if claim.state.is_terminal() || claim.state.is_validated() {
            return Err(QuorumError::NotEligible {
                claim: claim_id,
                state: claim.state,
            });
        }

        if ValidationStore::open_round_for_claim(store, claim_id)
            .map_err(store_err)?
            .is_some()
        {
            return Err(QuorumError::RoundAlreadyOpen(claim_id));
        }

        let assigned: Vec<AgentId> = validators
            .into_iter()
            .filter(|v| *v != claim.agent)
            .collect();
        if assigned.is_empty() {
            return Err(QuorumError::NoValidators(claim_id));
        }

        let round = RoundState {
            id: RoundId::new(),
            claim: claim_id,
            rule,
            assigned,
            opened_at: now,
            deadline: now + self.timeout_secs,
        };
        ValidationStore::save_round(store, &round).map_err(store_err)?;

        tracing::info!(
            round = %round.id,
            claim = %claim_id,
            validators = round.assigned.len(),
            "validation round opened"
        );
        Ok(round)
    }

    /// Record one validator's vote and settle the round if it resolves
    ///
    /// Settlement happens the moment quorum is met or becomes
    /// unreachable; otherwise the round stays open. A vote arriving
    /// after the deadline expires the round instead of counting.
    pub fn submit_vote<S>(
        &self,
        store: &mut S,
        claim_id: ClaimId,
        vote: Vote,
        now: u64,
    ) -> Result<VoteOutcome, QuorumError>
    where
        S: ClaimStore + ValidationStore + CredibilityStore,
        <S as ClaimStore>::Error: Display,
        <S as ValidationStore>::Error: Display,
        <S as CredibilityStore>::Error: Display,
    {
        if !(0.0..=1.0).contains(&vote.confidence) {
            return Err(QuorumError::InvalidConfidence(vote.confidence));
        }

        let claim = ClaimStore::get_claim(store, claim_id)
            .map_err(store_err)?
            .ok_or(QuorumError::ClaimNotFound(claim_id))?;

        let round = ValidationStore::open_round_for_claim(store, claim_id)
            .map_err(store_err)?
            .ok_or(QuorumError::NoOpenRound(claim_id))?;

        if round.is_expired_at(now) {
            self.expire_round(store, &round, now)?;
            return Err(QuorumError::RoundClosed(round.id));
        }

        if vote.validator == claim.agent {
            return Err(QuorumError::SelfVote {
                claim: claim_id,
                validator: vote.validator,
            });
        }
        if !round.assigned.contains(&vote.validator) {
            return Err(QuorumError::NotAssigned {
                round: round.id,
                validator: vote.validator,
            });
        }

        let mut records =
            ValidationStore::records_for_round(store, round.id).map_err(store_err)?;
        if records.iter().any(|r| r.validator == vote.validator) {
            return Err(QuorumError::DuplicateVote {
                round: round.id,
                validator: vote.validator,
            });
        }

        let mut record = ValidationRecord::new(
            round.id,
            claim_id,
            vote.validator,
            vote.verdict,
            vote.confidence,
            now,
        );
        if vote.external {
            record = record.external();
        }
        ValidationStore::append_record(store, &record).map_err(store_err)?;
        records.push(record);

        self.settle(store, claim, &round, &records, now)
    }

    /// Expire all open rounds past their deadline
    ///
    /// Run at startup (crash resume) and periodically. Each expired
    /// round is a soft cancel: the claim drops to `Hypothesis` with the
    /// re-validation flag set, and received votes stay on record.
    pub fn expire_rounds<S>(&self, store: &mut S, now: u64) -> Result<usize, QuorumError>
    where
        S: ClaimStore + ValidationStore,
        <S as ClaimStore>::Error: Display,
        <S as ValidationStore>::Error: Display,
    {
        let expired: Vec<RoundState> = ValidationStore::open_rounds(store)
            .map_err(store_err)?
            .into_iter()
            .filter(|r| r.is_expired_at(now))
            .collect();

        for round in &expired {
            self.expire_round(store, round, now)?;
        }
        Ok(expired.len())
    }

    fn expire_round<S>(
        &self,
        store: &mut S,
        round: &RoundState,
        now: u64,
    ) -> Result<(), QuorumError>
    where
        S: ClaimStore + ValidationStore,
        <S as ClaimStore>::Error: Display,
        <S as ValidationStore>::Error: Display,
    {
        if let Some(mut claim) = ClaimStore::get_claim(store, round.claim).map_err(store_err)? {
            let version = claim.version;
            claim.state = ClaimState::Hypothesis;
            claim.confidence = claim.confidence.min(HYPOTHESIS_CONFIDENCE_CAP);
            claim.revalidation_flagged = true;
            ClaimStore::update_claim(store, &claim, version).map_err(store_err)?;
        }
        ValidationStore::close_round(store, round.id).map_err(store_err)?;

        tracing::warn!(
            round = %round.id,
            claim = %round.claim,
            deadline = round.deadline,
            at = now,
            "validation round expired without quorum"
        );
        Ok(())
    }

    fn settle<S>(
        &self,
        store: &mut S,
        mut claim: Claim,
        round: &RoundState,
        records: &[ValidationRecord],
        now: u64,
    ) -> Result<VoteOutcome, QuorumError>
    where
        S: ClaimStore + ValidationStore + CredibilityStore,
        <S as ClaimStore>::Error: Display,
        <S as ValidationStore>::Error: Display,
        <S as CredibilityStore>::Error: Display,
    {
        let approvals: Vec<&ValidationRecord> = records
            .iter()
            .filter(|r| r.verdict == Verdict::Approve)
            .collect();
        let rejections = records
            .iter()
            .filter(|r| r.verdict == Verdict::Reject)
            .count();
        let required = round.rule.required_approvals(round.assigned.len());
        let remaining = round.assigned.len() - records.len();

        if approvals.len() >= required {
            // Quorum met: promote into the shared namespace
            let external = approvals.iter().any(|r| r.external);
            let mean: f64 =
                approvals.iter().map(|r| r.confidence).sum::<f64>() / approvals.len() as f64;
            // Without evidence the hypothesis cap still binds
            let confidence = if claim.evidence.is_empty() {
                mean.min(HYPOTHESIS_CONFIDENCE_CAP)
            } else {
                mean.clamp(0.0, 1.0)
            };

            let version = claim.version;
            claim.namespace = cairn_domain::Namespace::Shared;
            claim.state = if external {
                ClaimState::ExternalVerified
            } else {
                ClaimState::EmpiricalValidated
            };
            claim.confidence = confidence;
            claim.revalidation_flagged = false;
            ClaimStore::update_claim(store, &claim, version).map_err(store_err)?;
            ValidationStore::close_round(store, round.id).map_err(store_err)?;

            CredibilityStore::append_adjustment(
                store,
                &CredibilityEvent::new(
                    claim.agent.clone(),
                    claim.payload.category.clone(),
                    AdjustmentReason::ValidationApproved,
                    now,
                ),
            )
            .map_err(store_err)?;

            tracing::info!(
                round = %round.id,
                claim = %claim.id,
                state = %claim.state,
                confidence,
                "claim promoted to shared namespace"
            );
            return Ok(VoteOutcome::Promoted {
                state: claim.state,
                confidence,
            });
        }

        if approvals.len() + remaining < required {
            // Quorum can no longer be reached
            let version = claim.version;
            claim.state = ClaimState::Hypothesis;
            claim.confidence = claim.confidence.min(HYPOTHESIS_CONFIDENCE_CAP);

            let outcome = if rejections > 0 {
                VoteOutcome::Rejected
            } else {
                claim.revalidation_flagged = true;
                VoteOutcome::EvidenceRequested
            };

            ClaimStore::update_claim(store, &claim, version).map_err(store_err)?;
            ValidationStore::close_round(store, round.id).map_err(store_err)?;

            if outcome == VoteOutcome::Rejected {
                CredibilityStore::append_adjustment(
                    store,
                    &CredibilityEvent::new(
                        claim.agent.clone(),
                        claim.payload.category.clone(),
                        AdjustmentReason::ValidationRejected,
                        now,
                    ),
                )
                .map_err(store_err)?;
            }

            tracing::info!(
                round = %round.id,
                claim = %claim.id,
                rejections,
                "validation round settled without promotion"
            );
            return Ok(outcome);
        }

        Ok(VoteOutcome::Pending {
            approvals: approvals.len(),
            required,
        })
    }
}

fn store_err<E: Display>(e: E) -> QuorumError {
    QuorumError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_domain::traits::EvidenceStore;
    use cairn_domain::{credibility::NEUTRAL_SCORE, Namespace, Payload};
    use cairn_store::MemoryStore;

    const NOW: u64 = 1_700_000_000;
    const TIMEOUT: u64 = 300;

    fn agent(name: &str) -> AgentId {
        AgentId::new(name).unwrap()
    }

    fn vote(name: &str, verdict: Verdict, confidence: f64) -> Vote {
        Vote {
            validator: agent(name),
            verdict,
            external: false,
            confidence,
        }
    }

    fn seed_claim(store: &mut MemoryStore, with_evidence: bool) -> ClaimId {
        let mut claim = Claim::new(
            agent("scout-7"),
            Payload::new("system-capability", "topic-1", "observed"),
            0.5,
            NOW,
        );
        claim.state = ClaimState::Hypothesis;
        if with_evidence {
            let artifact = EvidenceStore::put_artifact(store, b"repro log").unwrap();
            claim.evidence = vec![artifact];
        }
        ClaimStore::insert_claim(store, &claim).unwrap()
    }

    fn open(
        store: &mut MemoryStore,
        claim: ClaimId,
        rule: QuorumRule,
        validators: &[&str],
    ) -> RoundState {
        CrossValidator::new(TIMEOUT)
            .open_round(
                store,
                claim,
                rule,
                validators.iter().map(|v| agent(v)).collect(),
                NOW,
            )
            .unwrap()
    }

    #[test]
    fn test_single_approval_promotes() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(&mut store, claim_id, QuorumRule::AtLeast(1), &["checker-1"]);

        let outcome = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("checker-1", Verdict::Approve, 0.85),
                NOW + 10,
            )
            .unwrap();
        assert_eq!(
            outcome,
            VoteOutcome::Promoted {
                state: ClaimState::EmpiricalValidated,
                confidence: 0.85,
            }
        );

        let claim = ClaimStore::get_claim(&store, claim_id).unwrap().unwrap();
        assert_eq!(claim.namespace, Namespace::Shared);
        assert_eq!(claim.state, ClaimState::EmpiricalValidated);
        assert!(claim.confidence_supported());
        assert!(ValidationStore::open_round_for_claim(&store, claim_id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_external_approval_verifies() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(&mut store, claim_id, QuorumRule::AtLeast(1), &["checker-1"]);

        let mut v = vote("checker-1", Verdict::Approve, 0.9);
        v.external = true;
        let outcome = cv.submit_vote(&mut store, claim_id, v, NOW + 10).unwrap();

        assert!(matches!(
            outcome,
            VoteOutcome::Promoted {
                state: ClaimState::ExternalVerified,
                ..
            }
        ));
    }

    #[test]
    fn test_promotion_confidence_is_validator_mean() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(
            &mut store,
            claim_id,
            QuorumRule::All,
            &["checker-1", "checker-2"],
        );

        cv.submit_vote(
            &mut store,
            claim_id,
            vote("checker-1", Verdict::Approve, 0.8),
            NOW + 5,
        )
        .unwrap();
        let outcome = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("checker-2", Verdict::Approve, 0.9),
                NOW + 10,
            )
            .unwrap();

        let VoteOutcome::Promoted { confidence, .. } = outcome else {
            panic!("expected promotion, got {:?}", outcome);
        };
        assert!((confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_promotion_without_evidence_stays_capped() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, false);
        open(&mut store, claim_id, QuorumRule::AtLeast(1), &["checker-1"]);

        let outcome = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("checker-1", Verdict::Approve, 0.95),
                NOW + 10,
            )
            .unwrap();

        let VoteOutcome::Promoted { confidence, .. } = outcome else {
            panic!("expected promotion, got {:?}", outcome);
        };
        assert_eq!(confidence, HYPOTHESIS_CONFIDENCE_CAP);
        let claim = ClaimStore::get_claim(&store, claim_id).unwrap().unwrap();
        assert!(claim.confidence_supported());
    }

    #[test]
    fn test_originator_cannot_vote() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(&mut store, claim_id, QuorumRule::AtLeast(1), &["checker-1"]);

        let err = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("scout-7", Verdict::Approve, 0.9),
                NOW + 10,
            )
            .unwrap_err();
        assert!(matches!(err, QuorumError::SelfVote { .. }));
    }

    #[test]
    fn test_originator_filtered_from_assignment() {
        let mut store = MemoryStore::new();
        let claim_id = seed_claim(&mut store, true);
        let round = open(
            &mut store,
            claim_id,
            QuorumRule::All,
            &["scout-7", "checker-1"],
        );
        assert_eq!(round.assigned, vec![agent("checker-1")]);

        // A round with only the originator has nobody to vote
        let other = seed_claim(&mut store, true);
        let err = CrossValidator::new(TIMEOUT)
            .open_round(
                &mut store,
                other,
                QuorumRule::All,
                vec![agent("scout-7")],
                NOW,
            )
            .unwrap_err();
        assert!(matches!(err, QuorumError::NoValidators(_)));
    }

    #[test]
    fn test_unassigned_and_duplicate_votes_rejected() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(
            &mut store,
            claim_id,
            QuorumRule::All,
            &["checker-1", "checker-2"],
        );

        let err = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("stranger", Verdict::Approve, 0.9),
                NOW + 5,
            )
            .unwrap_err();
        assert!(matches!(err, QuorumError::NotAssigned { .. }));

        cv.submit_vote(
            &mut store,
            claim_id,
            vote("checker-1", Verdict::Approve, 0.9),
            NOW + 5,
        )
        .unwrap();
        let err = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("checker-1", Verdict::Approve, 0.9),
                NOW + 6,
            )
            .unwrap_err();
        assert!(matches!(err, QuorumError::DuplicateVote { .. }));
    }

    #[test]
    fn test_reject_under_all_rule_settles_immediately() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(
            &mut store,
            claim_id,
            QuorumRule::All,
            &["checker-1", "checker-2"],
        );

        let outcome = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("checker-1", Verdict::Reject, 0.2),
                NOW + 5,
            )
            .unwrap();
        assert_eq!(outcome, VoteOutcome::Rejected);

        let claim = ClaimStore::get_claim(&store, claim_id).unwrap().unwrap();
        assert_eq!(claim.state, ClaimState::Hypothesis);
        assert!(claim.namespace.is_private());

        // Rejection costs the originator credibility
        let score = CredibilityStore::score(&store, &agent("scout-7"), "system-capability")
            .unwrap()
            .unwrap();
        assert!(score.value < NEUTRAL_SCORE);
    }

    #[test]
    fn test_needs_evidence_flags_without_penalty() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(&mut store, claim_id, QuorumRule::All, &["checker-1"]);

        let outcome = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("checker-1", Verdict::NeedsEvidence, 0.5),
                NOW + 5,
            )
            .unwrap();
        assert_eq!(outcome, VoteOutcome::EvidenceRequested);

        let claim = ClaimStore::get_claim(&store, claim_id).unwrap().unwrap();
        assert!(claim.revalidation_flagged);
        assert!(
            CredibilityStore::score(&store, &agent("scout-7"), "system-capability")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_partial_votes_stay_pending() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(
            &mut store,
            claim_id,
            QuorumRule::AtLeast(2),
            &["checker-1", "checker-2", "checker-3"],
        );

        let outcome = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("checker-1", Verdict::Approve, 0.9),
                NOW + 5,
            )
            .unwrap();
        assert_eq!(
            outcome,
            VoteOutcome::Pending {
                approvals: 1,
                required: 2,
            }
        );
    }

    #[test]
    fn test_expired_round_soft_cancels() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(&mut store, claim_id, QuorumRule::AtLeast(1), &["checker-1"]);

        let expired = cv.expire_rounds(&mut store, NOW + TIMEOUT + 1).unwrap();
        assert_eq!(expired, 1);

        let claim = ClaimStore::get_claim(&store, claim_id).unwrap().unwrap();
        assert_eq!(claim.state, ClaimState::Hypothesis);
        assert!(claim.revalidation_flagged);
        assert!(claim.namespace.is_private());

        // Idempotent: nothing left to expire
        assert_eq!(cv.expire_rounds(&mut store, NOW + TIMEOUT + 2).unwrap(), 0);
    }

    #[test]
    fn test_late_vote_expires_instead_of_counting() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(&mut store, claim_id, QuorumRule::AtLeast(1), &["checker-1"]);

        let err = cv
            .submit_vote(
                &mut store,
                claim_id,
                vote("checker-1", Verdict::Approve, 0.9),
                NOW + TIMEOUT + 1,
            )
            .unwrap_err();
        assert!(matches!(err, QuorumError::RoundClosed(_)));

        // The expired claim was never promoted from the stale vote
        let claim = ClaimStore::get_claim(&store, claim_id).unwrap().unwrap();
        assert!(claim.namespace.is_private());
        assert!(claim.revalidation_flagged);
    }

    #[test]
    fn test_only_one_round_per_claim() {
        let mut store = MemoryStore::new();
        let claim_id = seed_claim(&mut store, true);
        open(&mut store, claim_id, QuorumRule::AtLeast(1), &["checker-1"]);

        let err = CrossValidator::new(TIMEOUT)
            .open_round(
                &mut store,
                claim_id,
                QuorumRule::AtLeast(1),
                vec![agent("checker-2")],
                NOW + 1,
            )
            .unwrap_err();
        assert!(matches!(err, QuorumError::RoundAlreadyOpen(_)));
    }

    #[test]
    fn test_validated_claim_not_eligible() {
        let mut store = MemoryStore::new();
        let claim_id = seed_claim(&mut store, true);
        let mut claim = ClaimStore::get_claim(&store, claim_id).unwrap().unwrap();
        let version = claim.version;
        claim.state = ClaimState::EmpiricalValidated;
        ClaimStore::update_claim(&mut store, &claim, version).unwrap();

        let err = CrossValidator::new(TIMEOUT)
            .open_round(
                &mut store,
                claim_id,
                QuorumRule::AtLeast(1),
                vec![agent("checker-1")],
                NOW,
            )
            .unwrap_err();
        assert!(matches!(err, QuorumError::NotEligible { .. }));
    }

    #[test]
    fn test_approval_raises_originator_credibility() {
        let mut store = MemoryStore::new();
        let cv = CrossValidator::new(TIMEOUT);
        let claim_id = seed_claim(&mut store, true);
        open(&mut store, claim_id, QuorumRule::AtLeast(1), &["checker-1"]);

        cv.submit_vote(
            &mut store,
            claim_id,
            vote("checker-1", Verdict::Approve, 0.85),
            NOW + 10,
        )
        .unwrap();

        let score = CredibilityStore::score(&store, &agent("scout-7"), "system-capability")
            .unwrap()
            .unwrap();
        assert!(score.value > NEUTRAL_SCORE);
    }
}
