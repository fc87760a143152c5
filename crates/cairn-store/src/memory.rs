//! In-memory store with the same semantics as the SQLite store
//!
//! Used by unit tests across the workspace and for embedding without a
//! database file. Mirrors the SQLite implementation's behavior exactly:
//! compare-and-set versioning, append-only history, content-addressed
//! artifacts, and materialized credibility scores.

use crate::{artifact_checksum, StoreError};
use cairn_domain::traits::{
    ClaimQuery, ClaimStore, CredibilityStore, EventFilter, EventStore, EvidenceStore,
    ValidationStore,
};
use cairn_domain::{
    AgentId, ArtifactId, Claim, ClaimId, ContaminationEvent, CredibilityEvent, CredibilityScore,
    EventId, RoundId, RoundState, ValidationRecord,
};
use std::collections::HashMap;

/// One entry in the in-memory claim history
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// The claim this version belongs to
    pub claim: ClaimId,
    /// The version written
    pub version: u64,
    /// Snapshot of the claim at that version
    pub snapshot: Claim,
}

/// In-memory implementation of all Cairn store traits
#[derive(Default)]
pub struct MemoryStore {
    claims: HashMap<ClaimId, Claim>,
    history: Vec<HistoryEntry>,
    artifacts: HashMap<ArtifactId, Vec<u8>>,
    records: Vec<ValidationRecord>,
    rounds: HashMap<RoundId, (RoundState, bool)>,
    events: Vec<ContaminationEvent>,
    ledger: Vec<CredibilityEvent>,
    scores: HashMap<(AgentId, String), CredibilityScore>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// History entries recorded for a claim (audit surface)
    pub fn history_for(&self, id: ClaimId) -> Vec<&HistoryEntry> {
        self.history.iter().filter(|h| h.claim == id).collect()
    }

    /// The full credibility ledger, in append order
    pub fn ledger(&self) -> &[CredibilityEvent] {
        &self.ledger
    }

    fn push_history(&mut self, claim: &Claim) {
        self.history.push(HistoryEntry {
            claim: claim.id,
            version: claim.version,
            snapshot: claim.clone(),
        });
    }
}

impl ClaimStore for MemoryStore {
    type Error = StoreError;

    fn insert_claim(&mut self, claim: &Claim) -> Result<ClaimId, Self::Error> {
        if self.claims.contains_key(&claim.id) {
            return Err(StoreError::Duplicate(claim.id));
        }
        self.claims.insert(claim.id, claim.clone());
        self.push_history(claim);
        Ok(claim.id)
    }

    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, Self::Error> {
        Ok(self.claims.get(&id).cloned())
    }

    fn update_claim(&mut self, claim: &Claim, expected_version: u64) -> Result<(), Self::Error> {
        let current = self
            .claims
            .get(&claim.id)
            .ok_or_else(|| StoreError::NotFound(claim.id.to_string()))?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                claim: claim.id,
                expected: expected_version,
            });
        }
        let mut written = claim.clone();
        written.version = expected_version + 1;
        self.claims.insert(claim.id, written.clone());
        self.push_history(&written);
        Ok(())
    }

    fn query_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, Self::Error> {
        let mut results: Vec<Claim> = self
            .claims
            .values()
            .filter(|c| query.namespace.as_ref().is_none_or(|ns| &c.namespace == ns))
            .filter(|c| query.agent.as_ref().is_none_or(|a| &c.agent == a))
            .filter(|c| {
                query
                    .category
                    .as_ref()
                    .is_none_or(|cat| &c.payload.category == cat)
            })
            .filter(|c| query.topic.as_ref().is_none_or(|t| &c.payload.topic == t))
            .filter(|c| query.state.is_none_or(|s| c.state == s))
            .filter(|c| query.min_confidence.is_none_or(|m| c.confidence >= m))
            .cloned()
            .collect();
        results.sort_by_key(|c| c.id);
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn record_citation(&mut self, id: ClaimId, at: u64) -> Result<(), Self::Error> {
        let claim = self
            .claims
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        claim.last_cited_at = Some(at);
        Ok(())
    }
}

impl EvidenceStore for MemoryStore {
    type Error = StoreError;

    fn put_artifact(&mut self, bytes: &[u8]) -> Result<ArtifactId, Self::Error> {
        let id = artifact_checksum(bytes);
        self.artifacts.entry(id.clone()).or_insert_with(|| bytes.to_vec());
        Ok(id)
    }

    fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.artifacts.get(id).cloned())
    }

    fn has_artifact(&self, id: &ArtifactId) -> Result<bool, Self::Error> {
        Ok(self.artifacts.contains_key(id))
    }

    fn collect_unreferenced(&mut self, live: &[ArtifactId]) -> Result<usize, Self::Error> {
        let before = self.artifacts.len();
        self.artifacts.retain(|id, _| live.contains(id));
        Ok(before - self.artifacts.len())
    }
}

impl ValidationStore for MemoryStore {
    type Error = StoreError;

    fn append_record(&mut self, record: &ValidationRecord) -> Result<(), Self::Error> {
        self.records.push(record.clone());
        Ok(())
    }

    fn records_for_round(&self, round: RoundId) -> Result<Vec<ValidationRecord>, Self::Error> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.round == round)
            .cloned()
            .collect())
    }

    fn records_for_claim(&self, claim: ClaimId) -> Result<Vec<ValidationRecord>, Self::Error> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.claim == claim)
            .cloned()
            .collect())
    }

    fn save_round(&mut self, round: &RoundState) -> Result<(), Self::Error> {
        let open = self
            .rounds
            .get(&round.id)
            .map(|(_, open)| *open)
            .unwrap_or(true);
        self.rounds.insert(round.id, (round.clone(), open));
        Ok(())
    }

    fn open_round_for_claim(&self, claim: ClaimId) -> Result<Option<RoundState>, Self::Error> {
        Ok(self
            .rounds
            .values()
            .find(|(r, open)| *open && r.claim == claim)
            .map(|(r, _)| r.clone()))
    }

    fn open_rounds(&self) -> Result<Vec<RoundState>, Self::Error> {
        let mut rounds: Vec<RoundState> = self
            .rounds
            .values()
            .filter(|(_, open)| *open)
            .map(|(r, _)| r.clone())
            .collect();
        rounds.sort_by_key(|r| r.opened_at);
        Ok(rounds)
    }

    fn close_round(&mut self, round: RoundId) -> Result<(), Self::Error> {
        match self.rounds.get_mut(&round) {
            Some((_, open)) => {
                *open = false;
                Ok(())
            }
            None => Err(StoreError::NotFound(round.to_string())),
        }
    }
}

impl EventStore for MemoryStore {
    type Error = StoreError;

    fn append_event(&mut self, event: &ContaminationEvent) -> Result<(), Self::Error> {
        self.events.push(event.clone());
        Ok(())
    }

    fn query_events(&self, filter: &EventFilter) -> Result<Vec<ContaminationEvent>, Self::Error> {
        Ok(self
            .events
            .iter()
            .filter(|e| filter.claim.is_none_or(|c| e.claim == c))
            .filter(|e| filter.kind.is_none_or(|k| e.kind == k))
            .filter(|e| filter.min_severity.is_none_or(|s| e.severity >= s))
            .filter(|e| !filter.open_only || e.is_open())
            .cloned()
            .collect())
    }

    fn resolve_event(&mut self, id: EventId, at: u64) -> Result<(), Self::Error> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == id && e.is_open())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        event.resolved_at = Some(at);
        Ok(())
    }
}

impl CredibilityStore for MemoryStore {
    type Error = StoreError;

    fn append_adjustment(&mut self, event: &CredibilityEvent) -> Result<(), Self::Error> {
        self.ledger.push(event.clone());
        let key = (event.agent.clone(), event.category.clone());
        let score = self.scores.entry(key).or_insert_with(|| {
            CredibilityScore::neutral(event.agent.clone(), &event.category, event.recorded_at)
        });
        score.apply(event);
        Ok(())
    }

    fn score(
        &self,
        agent: &AgentId,
        category: &str,
    ) -> Result<Option<CredibilityScore>, Self::Error> {
        Ok(self
            .scores
            .get(&(agent.clone(), category.to_string()))
            .cloned())
    }

    fn scores(&self) -> Result<Vec<CredibilityScore>, Self::Error> {
        let mut scores: Vec<CredibilityScore> = self.scores.values().cloned().collect();
        scores.sort_by(|a, b| {
            (a.agent.as_str(), &a.category).cmp(&(b.agent.as_str(), &b.category))
        });
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_domain::{AdjustmentReason, Payload};

    fn test_claim(agent: &str) -> Claim {
        Claim::new(
            AgentId::new(agent).unwrap(),
            Payload::new("research-finding", "topic-1", "body"),
            0.4,
            1_700_000_000,
        )
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = MemoryStore::new();
        let claim = test_claim("scout-7");
        let id = store.insert_claim(&claim).unwrap();
        assert_eq!(store.get_claim(id).unwrap().unwrap(), claim);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = MemoryStore::new();
        let claim = test_claim("scout-7");
        store.insert_claim(&claim).unwrap();
        assert!(matches!(
            store.insert_claim(&claim),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn test_cas_version_conflict() {
        let mut store = MemoryStore::new();
        let mut claim = test_claim("scout-7");
        store.insert_claim(&claim).unwrap();

        claim.confidence = 0.5;
        store.update_claim(&claim, 0).unwrap();

        // Stale writer with the old version loses
        claim.confidence = 0.6;
        assert!(matches!(
            store.update_claim(&claim, 0),
            Err(StoreError::VersionConflict { .. })
        ));

        let stored = store.get_claim(claim.id).unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.confidence, 0.5);
    }

    #[test]
    fn test_history_appended_per_write() {
        let mut store = MemoryStore::new();
        let mut claim = test_claim("scout-7");
        store.insert_claim(&claim).unwrap();
        claim.confidence = 0.5;
        store.update_claim(&claim, 0).unwrap();

        let history = store.history_for(claim.id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 0);
        assert_eq!(history[1].version, 1);
    }

    #[test]
    fn test_artifact_content_addressing() {
        let mut store = MemoryStore::new();
        let a = store.put_artifact(b"transcript").unwrap();
        let b = store.put_artifact(b"transcript").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.get_artifact(&a).unwrap().unwrap(), b"transcript");
    }

    #[test]
    fn test_artifact_gc_keeps_live() {
        let mut store = MemoryStore::new();
        let live = store.put_artifact(b"keep").unwrap();
        store.put_artifact(b"drop").unwrap();

        let removed = store.collect_unreferenced(&[live.clone()]).unwrap();
        assert_eq!(removed, 1);
        assert!(store.has_artifact(&live).unwrap());
    }

    #[test]
    fn test_credibility_materialization() {
        let mut store = MemoryStore::new();
        let agent = AgentId::new("scout-7").unwrap();
        store
            .append_adjustment(&CredibilityEvent::new(
                agent.clone(),
                "research-finding",
                AdjustmentReason::ValidationApproved,
                100,
            ))
            .unwrap();

        let score = store.score(&agent, "research-finding").unwrap().unwrap();
        assert!(score.value > 0.5);
        assert_eq!(store.ledger().len(), 1);
    }
}
