//! The service facade tying every component together
//!
//! One [`CairnService`] wraps the store handle, the validation gate,
//! the cross-validator, the quarantine manager, and the access
//! controller. Handlers and tests speak to this facade; nothing above
//! it touches the store directly.

use cairn_access::{AccessController, AccessDecision, Principal};
use cairn_domain::traits::{
    ClaimQuery, ClaimStore, CredibilityStore, EventFilter, EventStore, EvidenceStore,
    ValidationStore,
};
use cairn_domain::{
    AgentId, ArtifactId, Claim, ClaimId, ContaminationEvent, CredibilityScore, EventId,
    Namespace, NEUTRAL_SCORE,
};
use cairn_gate::{GateError, SharedPolicy, SubmitOutcome, SubmitRequest, ValidationGate};
use cairn_quarantine::{QuarantineError, QuarantineManager, Resolution};
use cairn_quorum::{CrossValidator, QuorumError, Vote, VoteOutcome};
use cairn_store::SharedStore;
use std::fmt::Display;
use thiserror::Error;

/// Errors surfaced by the service facade
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Validation gate refused or demoted the write
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Cross-validation error
    #[error(transparent)]
    Quorum(#[from] QuorumError),

    /// Quarantine error
    #[error(transparent)]
    Quarantine(#[from] QuarantineError),

    /// Namespace scope violation
    #[error("Access denied: {reason}")]
    AccessDenied {
        /// Why the access controller refused
        reason: String,
    },

    /// Claim not found
    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    /// Storage layer error
    #[error("Store error: {0}")]
    Store(String),
}

/// Bounds every store behind the facade must satisfy
pub trait ServiceStore:
    ClaimStore + EvidenceStore + ValidationStore + EventStore + CredibilityStore
{
}

impl<S> ServiceStore for S where
    S: ClaimStore + EvidenceStore + ValidationStore + EventStore + CredibilityStore
{
}

/// The contamination-prevention service
pub struct CairnService<S> {
    store: SharedStore<S>,
    gate: ValidationGate,
    policy: SharedPolicy,
    quarantine: QuarantineManager,
    access: AccessController,
    validator_pool: Vec<AgentId>,
}

impl<S> CairnService<S>
where
    S: ServiceStore,
    <S as ClaimStore>::Error: Display,
    <S as EvidenceStore>::Error: Display,
    <S as ValidationStore>::Error: Display,
    <S as EventStore>::Error: Display,
    <S as CredibilityStore>::Error: Display,
{
    /// Build the service over a shared store handle
    pub fn new(
        store: SharedStore<S>,
        policy: SharedPolicy,
        access: AccessController,
        validator_pool: Vec<AgentId>,
    ) -> Self {
        Self {
            store,
            gate: ValidationGate::new(policy.clone()),
            policy,
            quarantine: QuarantineManager::new(),
            access,
            validator_pool,
        }
    }

    /// The shared policy handle (hot-reloadable)
    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    /// A clone of the underlying store handle
    pub fn store(&self) -> SharedStore<S> {
        self.store.clone()
    }

    fn cross_validator(&self) -> CrossValidator {
        CrossValidator::new(self.policy.read(|p| p.validation_timeout_secs))
    }

    /// Resume after a restart: expire validation rounds whose deadline
    /// passed while the service was down
    pub fn recover(&self, now: u64) -> Result<usize, ServiceError> {
        let mut store = self.store.clone();
        Ok(self.cross_validator().expire_rounds(&mut store, now)?)
    }

    /// Submit a claim through the validation gate
    ///
    /// If the gate routes the claim to cross-validation, a round is
    /// opened against the configured validator pool before returning.
    pub fn submit_claim(
        &self,
        request: SubmitRequest,
        now: u64,
    ) -> Result<SubmitOutcome, ServiceError> {
        let mut store = self.store.clone();
        let outcome = self.gate.submit(&mut store, &self.access, request, now)?;

        if outcome.pending_validation {
            if let Some(rule) = outcome.quorum {
                match self.cross_validator().open_round(
                    &mut store,
                    outcome.claim,
                    rule,
                    self.validator_pool.clone(),
                    now,
                ) {
                    Ok(round) => {
                        tracing::debug!(claim = %outcome.claim, round = %round.id, "round opened");
                    }
                    Err(QuorumError::NoValidators(claim)) => {
                        // Nobody to validate; the claim simply stays private
                        tracing::warn!(claim = %claim, "no validators available, claim stays private");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(outcome)
    }

    /// Fetch one claim, enforcing namespace scope
    ///
    /// A read by anyone other than the originator counts as a citation.
    pub fn get_claim(
        &self,
        principal: &Principal,
        id: ClaimId,
        now: u64,
    ) -> Result<Claim, ServiceError> {
        let mut store = self.store.clone();
        let claim = ClaimStore::get_claim(&store, id)
            .map_err(store_err)?
            .ok_or(ServiceError::ClaimNotFound(id))?;

        self.allow_read(principal, &claim.namespace)?;

        let cited_by_other = !matches!(principal, Principal::Agent(a) if *a == claim.agent);
        if cited_by_other {
            ClaimStore::record_citation(&mut store, id, now).map_err(store_err)?;
        }
        Ok(claim)
    }

    /// Query claims within one namespace (shared by default)
    pub fn query_claims(
        &self,
        principal: &Principal,
        mut query: ClaimQuery,
    ) -> Result<Vec<Claim>, ServiceError> {
        let namespace = query.namespace.clone().unwrap_or(Namespace::Shared);
        self.allow_read(principal, &namespace)?;
        query.namespace = Some(namespace);

        let store = self.store.clone();
        ClaimStore::query_claims(&store, &query).map_err(store_err)
    }

    /// Store evidence bytes, returning the content-derived id
    pub fn upload_evidence(&self, bytes: &[u8]) -> Result<ArtifactId, ServiceError> {
        let mut store = self.store.clone();
        EvidenceStore::put_artifact(&mut store, bytes).map_err(store_err)
    }

    /// Fetch evidence bytes by id
    pub fn get_evidence(&self, id: &ArtifactId) -> Result<Option<Vec<u8>>, ServiceError> {
        let store = self.store.clone();
        EvidenceStore::get_artifact(&store, id).map_err(store_err)
    }

    /// Record a validator's vote on a claim's open round
    pub fn submit_vote(
        &self,
        claim: ClaimId,
        vote: Vote,
        now: u64,
    ) -> Result<VoteOutcome, ServiceError> {
        let mut store = self.store.clone();
        Ok(self.cross_validator().submit_vote(&mut store, claim, vote, now)?)
    }

    /// Expire validation rounds past their deadline
    pub fn expire_rounds(&self, now: u64) -> Result<usize, ServiceError> {
        let mut store = self.store.clone();
        Ok(self.cross_validator().expire_rounds(&mut store, now)?)
    }

    /// Contamination events, for principals with quarantine visibility
    pub fn contamination_events(
        &self,
        principal: &Principal,
        filter: EventFilter,
    ) -> Result<Vec<ContaminationEvent>, ServiceError> {
        self.allow_read(principal, &Namespace::Quarantine)?;
        let store = self.store.clone();
        EventStore::query_events(&store, &filter).map_err(store_err)
    }

    /// Move the claim flagged by an open event into quarantine
    pub fn quarantine_claim(
        &self,
        principal: &Principal,
        event: EventId,
    ) -> Result<ClaimId, ServiceError> {
        self.require_operator(principal)?;
        let mut store = self.store.clone();
        Ok(self.quarantine.quarantine(&mut store, event)?)
    }

    /// Resolve a contamination event over a quarantined claim
    pub fn resolve_quarantine(
        &self,
        principal: &Principal,
        event: EventId,
        resolution: Resolution,
        now: u64,
    ) -> Result<(), ServiceError> {
        self.require_operator(principal)?;
        let mut store = self.store.clone();
        Ok(self.quarantine.resolve(&mut store, event, resolution, now)?)
    }

    /// Current credibility for one (agent, category), decay applied
    ///
    /// An agent with no ledger history reads as neutral.
    pub fn credibility(
        &self,
        agent: &AgentId,
        category: &str,
        now: u64,
    ) -> Result<f64, ServiceError> {
        let store = self.store.clone();
        let window = self.policy.read(|p| p.credibility_decay_window_secs);
        let value = CredibilityStore::score(&store, agent, category)
            .map_err(store_err)?
            .map(|s| s.decayed_value(now, window))
            .unwrap_or(NEUTRAL_SCORE);
        Ok(value)
    }

    /// All materialized credibility scores (raw, without decay)
    pub fn credibility_scores(&self) -> Result<Vec<CredibilityScore>, ServiceError> {
        let store = self.store.clone();
        CredibilityStore::scores(&store).map_err(store_err)
    }

    fn allow_read(&self, principal: &Principal, namespace: &Namespace) -> Result<(), ServiceError> {
        match self.access.check_read(principal, namespace) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny { reason } => Err(ServiceError::AccessDenied { reason }),
        }
    }

    fn require_operator(&self, principal: &Principal) -> Result<(), ServiceError> {
        match principal {
            Principal::Operator(_) => Ok(()),
            _ => Err(ServiceError::AccessDenied {
                reason: "quarantine transitions require an operator".to_string(),
            }),
        }
    }
}

fn store_err<E: Display>(e: E) -> ServiceError {
    ServiceError::Store(e.to_string())
}
