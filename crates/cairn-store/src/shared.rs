//! Cloneable handle sharing one store across tasks
//!
//! The service layer and the background workers (hygiene, detector,
//! round expiry) all operate on the same store. [`SharedStore`] wraps
//! any store behind an `Arc<Mutex<_>>` and forwards every trait method
//! under the lock, so each holder can treat its clone as a store of
//! its own.

use cairn_domain::traits::{
    ClaimQuery, ClaimStore, CredibilityStore, EventFilter, EventStore, EvidenceStore,
    ValidationStore,
};
use cairn_domain::{
    AgentId, ArtifactId, Claim, ClaimId, ContaminationEvent, CredibilityEvent, CredibilityScore,
    EventId, RoundId, RoundState, ValidationRecord,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// A cloneable, lock-guarded handle to a single underlying store
pub struct SharedStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> SharedStore<S> {
    /// Wrap a store for shared access
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        // Poisoning only happens if a holder panicked mid-write;
        // recover the data rather than propagate the panic
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ClaimStore> ClaimStore for SharedStore<S> {
    type Error = S::Error;

    fn insert_claim(&mut self, claim: &Claim) -> Result<ClaimId, Self::Error> {
        self.lock().insert_claim(claim)
    }

    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, Self::Error> {
        self.lock().get_claim(id)
    }

    fn update_claim(&mut self, claim: &Claim, expected_version: u64) -> Result<(), Self::Error> {
        self.lock().update_claim(claim, expected_version)
    }

    fn query_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, Self::Error> {
        self.lock().query_claims(query)
    }

    fn record_citation(&mut self, id: ClaimId, at: u64) -> Result<(), Self::Error> {
        self.lock().record_citation(id, at)
    }
}

impl<S: EvidenceStore> EvidenceStore for SharedStore<S> {
    type Error = S::Error;

    fn put_artifact(&mut self, bytes: &[u8]) -> Result<ArtifactId, Self::Error> {
        self.lock().put_artifact(bytes)
    }

    fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Vec<u8>>, Self::Error> {
        self.lock().get_artifact(id)
    }

    fn has_artifact(&self, id: &ArtifactId) -> Result<bool, Self::Error> {
        self.lock().has_artifact(id)
    }

    fn collect_unreferenced(&mut self, live: &[ArtifactId]) -> Result<usize, Self::Error> {
        self.lock().collect_unreferenced(live)
    }
}

impl<S: ValidationStore> ValidationStore for SharedStore<S> {
    type Error = S::Error;

    fn append_record(&mut self, record: &ValidationRecord) -> Result<(), Self::Error> {
        self.lock().append_record(record)
    }

    fn records_for_round(&self, round: RoundId) -> Result<Vec<ValidationRecord>, Self::Error> {
        self.lock().records_for_round(round)
    }

    fn records_for_claim(&self, claim: ClaimId) -> Result<Vec<ValidationRecord>, Self::Error> {
        self.lock().records_for_claim(claim)
    }

    fn save_round(&mut self, round: &RoundState) -> Result<(), Self::Error> {
        self.lock().save_round(round)
    }

    fn open_round_for_claim(&self, claim: ClaimId) -> Result<Option<RoundState>, Self::Error> {
        self.lock().open_round_for_claim(claim)
    }

    fn open_rounds(&self) -> Result<Vec<RoundState>, Self::Error> {
        self.lock().open_rounds()
    }

    fn close_round(&mut self, round: RoundId) -> Result<(), Self::Error> {
        self.lock().close_round(round)
    }
}

impl<S: EventStore> EventStore for SharedStore<S> {
    type Error = S::Error;

    fn append_event(&mut self, event: &ContaminationEvent) -> Result<(), Self::Error> {
        self.lock().append_event(event)
    }

    fn query_events(&self, filter: &EventFilter) -> Result<Vec<ContaminationEvent>, Self::Error> {
        self.lock().query_events(filter)
    }

    fn resolve_event(&mut self, id: EventId, at: u64) -> Result<(), Self::Error> {
        self.lock().resolve_event(id, at)
    }
}

impl<S: CredibilityStore> CredibilityStore for SharedStore<S> {
    type Error = S::Error;

    fn append_adjustment(&mut self, event: &CredibilityEvent) -> Result<(), Self::Error> {
        self.lock().append_adjustment(event)
    }

    fn score(
        &self,
        agent: &AgentId,
        category: &str,
    ) -> Result<Option<CredibilityScore>, Self::Error> {
        self.lock().score(agent, category)
    }

    fn scores(&self) -> Result<Vec<CredibilityScore>, Self::Error> {
        self.lock().scores()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use cairn_domain::{Payload, Claim};

    #[test]
    fn test_clones_see_the_same_store() {
        let mut handle_a = SharedStore::new(MemoryStore::new());
        let handle_b = handle_a.clone();

        let claim = Claim::new(
            AgentId::new("scout-7").unwrap(),
            Payload::new("research-finding", "topic", "body"),
            0.5,
            0,
        );
        let id = handle_a.insert_claim(&claim).unwrap();

        assert!(handle_b.get_claim(id).unwrap().is_some());
    }

    #[test]
    fn test_cas_still_enforced_through_handle() {
        let mut handle = SharedStore::new(MemoryStore::new());
        let claim = Claim::new(
            AgentId::new("scout-7").unwrap(),
            Payload::new("research-finding", "topic", "body"),
            0.5,
            0,
        );
        let id = handle.insert_claim(&claim).unwrap();

        let stored = handle.get_claim(id).unwrap().unwrap();
        assert!(handle.update_claim(&stored, 7).is_err());
        assert!(handle.update_claim(&stored, stored.version).is_ok());
    }
}
