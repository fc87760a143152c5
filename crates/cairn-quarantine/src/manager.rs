//! Quarantine transitions and their credibility consequences

use crate::QuarantineError;
use cairn_domain::claim::HYPOTHESIS_CONFIDENCE_CAP;
use cairn_domain::traits::{ClaimStore, CredibilityStore, EventFilter, EventStore};
use cairn_domain::{
    AdjustmentReason, ClaimId, ClaimState, ContaminationEvent, CredibilityEvent, EventId,
    Namespace,
};
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Mutex;

/// How an operator resolved a contamination event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The finding was wrong or acceptable; the claim returns to its
    /// originator's private namespace as a hypothesis flagged for
    /// re-validation, and the originator is credited for the override
    Restore,

    /// Contamination confirmed; the claim is archived permanently and
    /// the originator's credibility is debited by event severity
    Archive,
}

/// The Quarantine Manager isolates flagged claims
///
/// Holds an in-process lock set keyed by claim id; every transition is
/// exclusive per claim. The manager itself is stateless across restarts
/// because quarantine membership lives in the claim records.
pub struct QuarantineManager {
    in_transition: Mutex<HashSet<ClaimId>>,
}

impl QuarantineManager {
    /// Create a quarantine manager
    pub fn new() -> Self {
        Self {
            in_transition: Mutex::new(HashSet::new()),
        }
    }

    /// Move the claim flagged by `event` into quarantine
    ///
    /// The event stays open; only resolution closes it. Quarantining a
    /// claim that is already quarantined is an error, as is racing a
    /// concurrent transition on the same claim.
    pub fn quarantine<S>(
        &self,
        store: &mut S,
        event_id: EventId,
    ) -> Result<ClaimId, QuarantineError>
    where
        S: ClaimStore + EventStore,
        <S as ClaimStore>::Error: Display,
        <S as EventStore>::Error: Display,
    {
        let event = self.find_event(store, event_id)?;
        if !event.is_open() {
            return Err(QuarantineError::AlreadyResolved(event_id));
        }

        let _guard = self.lock_claim(event.claim)?;

        let mut claim = ClaimStore::get_claim(store, event.claim)
            .map_err(store_err)?
            .ok_or(QuarantineError::ClaimNotFound(event.claim))?;
        if claim.state == ClaimState::Quarantined {
            return Err(QuarantineError::WrongState {
                claim: claim.id,
                state: claim.state,
                expected: ClaimState::Claim,
            });
        }

        let version = claim.version;
        claim.namespace = Namespace::Quarantine;
        claim.state = ClaimState::Quarantined;
        ClaimStore::update_claim(store, &claim, version).map_err(store_err)?;

        tracing::warn!(
            claim = %claim.id,
            event = %event_id,
            kind = event.kind.as_str(),
            severity = event.severity.as_str(),
            "claim quarantined"
        );
        Ok(claim.id)
    }

    /// Resolve a contamination event over a quarantined claim
    ///
    /// Closes the event, applies the claim transition for `resolution`,
    /// and adjusts the originator's credibility ledger.
    pub fn resolve<S>(
        &self,
        store: &mut S,
        event_id: EventId,
        resolution: Resolution,
        now: u64,
    ) -> Result<(), QuarantineError>
    where
        S: ClaimStore + EventStore + CredibilityStore,
        <S as ClaimStore>::Error: Display,
        <S as EventStore>::Error: Display,
        <S as CredibilityStore>::Error: Display,
    {
        let event = self.find_event(store, event_id)?;
        if !event.is_open() {
            return Err(QuarantineError::AlreadyResolved(event_id));
        }

        let _guard = self.lock_claim(event.claim)?;

        let mut claim = ClaimStore::get_claim(store, event.claim)
            .map_err(store_err)?
            .ok_or(QuarantineError::ClaimNotFound(event.claim))?;
        if claim.state != ClaimState::Quarantined {
            return Err(QuarantineError::WrongState {
                claim: claim.id,
                state: claim.state,
                expected: ClaimState::Quarantined,
            });
        }

        let version = claim.version;
        let reason = match resolution {
            Resolution::Restore => {
                // Back to the originator; shared status must be re-earned
                claim.namespace = Namespace::Private(claim.agent.clone());
                claim.state = ClaimState::Hypothesis;
                claim.confidence = claim.confidence.min(HYPOTHESIS_CONFIDENCE_CAP);
                claim.revalidation_flagged = true;
                AdjustmentReason::OverrideApproved
            }
            Resolution::Archive => {
                claim.namespace = Namespace::Private(claim.agent.clone());
                claim.state = ClaimState::Archived;
                AdjustmentReason::ContaminationConfirmed(event.severity)
            }
        };
        ClaimStore::update_claim(store, &claim, version).map_err(store_err)?;
        EventStore::resolve_event(store, event_id, now).map_err(store_err)?;

        CredibilityStore::append_adjustment(
            store,
            &CredibilityEvent::new(
                claim.agent.clone(),
                claim.payload.category.clone(),
                reason,
                now,
            ),
        )
        .map_err(store_err)?;

        tracing::info!(
            claim = %claim.id,
            event = %event_id,
            resolution = ?resolution,
            state = %claim.state,
            "quarantine resolved"
        );
        Ok(())
    }

    fn find_event<S>(
        &self,
        store: &S,
        event_id: EventId,
    ) -> Result<ContaminationEvent, QuarantineError>
    where
        S: EventStore,
        <S as EventStore>::Error: Display,
    {
        EventStore::query_events(store, &EventFilter::default())
            .map_err(store_err)?
            .into_iter()
            .find(|e| e.id == event_id)
            .ok_or(QuarantineError::EventNotFound(event_id))
    }

    fn lock_claim(&self, claim: ClaimId) -> Result<TransitionGuard<'_>, QuarantineError> {
        let mut held = self
            .in_transition
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if !held.insert(claim) {
            return Err(QuarantineError::LockConflict(claim));
        }
        Ok(TransitionGuard {
            locks: &self.in_transition,
            claim,
        })
    }
}

impl Default for QuarantineManager {
    fn default() -> Self {
        Self::new()
    }
}

struct TransitionGuard<'a> {
    locks: &'a Mutex<HashSet<ClaimId>>,
    claim: ClaimId,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.claim);
    }
}

fn store_err<E: Display>(e: E) -> QuarantineError {
    QuarantineError::Store(e.to_string())
}
