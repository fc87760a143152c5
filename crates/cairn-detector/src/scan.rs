//! The scan cycle: four checks over the claim corpus

use crate::{DetectorConfig, DetectorError, ScanMetrics};
use cairn_domain::traits::{ClaimQuery, ClaimStore, EventFilter, EventStore, ValidationStore};
use cairn_domain::{
    Claim, ClaimId, ContaminationEvent, ContaminationKind, Namespace, Verdict,
};
use std::collections::HashMap;
use std::fmt::Display;

/// The Contamination Detector scans the corpus and raises events
///
/// Detection and consequence are separate: the detector appends events
/// and nothing else. A claim already carrying an open event of the same
/// kind is skipped, so repeated scans over an unchanged corpus raise
/// nothing new.
pub struct Detector {
    config: DetectorConfig,
    metrics: ScanMetrics,
}

impl Detector {
    /// Create a detector with the given configuration
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            metrics: ScanMetrics::new(),
        }
    }

    /// Accumulated metrics across all scans so far
    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Reset the accumulated metrics
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Run one scan over the whole corpus at `now`
    pub fn scan<S>(&mut self, store: &mut S, now: u64) -> Result<ScanMetrics, DetectorError>
    where
        S: ClaimStore + ValidationStore + EventStore,
        <S as ClaimStore>::Error: Display,
        <S as ValidationStore>::Error: Display,
        <S as EventStore>::Error: Display,
    {
        let mut cycle = ScanMetrics {
            scan_count: 1,
            ..Default::default()
        };

        let claims =
            ClaimStore::query_claims(store, &ClaimQuery::default()).map_err(store_err)?;
        cycle.claims_scanned = claims.len();

        for claim in &claims {
            if claim.state.is_terminal() && !self.cited_after_expiry(claim) {
                continue;
            }

            if !claim.state.is_terminal() && !claim.confidence_supported() {
                self.raise(
                    store,
                    &mut cycle,
                    claim.id,
                    ContaminationKind::UnsupportedConfidence,
                    now,
                )?;
            }

            if self.cited_after_expiry(claim) {
                self.raise(store, &mut cycle, claim.id, ContaminationKind::StaleUse, now)?;
            }

            if self.has_drifted(store, claim)? {
                self.raise(
                    store,
                    &mut cycle,
                    claim.id,
                    ContaminationKind::ConfidenceDrift,
                    now,
                )?;
            }
        }

        for id in contradiction_set(&claims) {
            self.raise(store, &mut cycle, id, ContaminationKind::Contradiction, now)?;
        }

        self.metrics.absorb(&cycle);
        tracing::info!(
            scanned = cycle.claims_scanned,
            raised = cycle.total_raised(),
            "contamination scan completed"
        );
        Ok(cycle)
    }

    fn cited_after_expiry(&self, claim: &Claim) -> bool {
        matches!(
            (claim.expires_at, claim.last_cited_at),
            (Some(expiry), Some(cited)) if cited > expiry
        )
    }

    /// A validated claim's confidence must stay within what its
    /// approving records back (their mean, up to tolerance)
    fn has_drifted<S>(&self, store: &S, claim: &Claim) -> Result<bool, DetectorError>
    where
        S: ValidationStore,
        <S as ValidationStore>::Error: Display,
    {
        if !claim.state.is_validated() {
            return Ok(false);
        }
        let approvals: Vec<f64> = ValidationStore::records_for_claim(store, claim.id)
            .map_err(store_err)?
            .into_iter()
            .filter(|r| r.verdict == Verdict::Approve)
            .map(|r| r.confidence)
            .collect();
        if approvals.is_empty() {
            // Nothing on record to measure drift against
            return Ok(false);
        }
        let backed = approvals.iter().sum::<f64>() / approvals.len() as f64;
        Ok(claim.confidence > backed + self.config.drift_tolerance)
    }

    fn raise<S>(
        &self,
        store: &mut S,
        cycle: &mut ScanMetrics,
        claim: ClaimId,
        kind: ContaminationKind,
        now: u64,
    ) -> Result<(), DetectorError>
    where
        S: EventStore,
        <S as EventStore>::Error: Display,
    {
        let open = EventStore::query_events(
            store,
            &EventFilter {
                claim: Some(claim),
                kind: Some(kind),
                open_only: true,
                ..Default::default()
            },
        )
        .map_err(store_err)?;
        if !open.is_empty() {
            return Ok(());
        }

        let event = ContaminationEvent::new(claim, kind, now);
        EventStore::append_event(store, &event).map_err(store_err)?;
        cycle.record(kind);

        tracing::warn!(
            event = %event.id,
            claim = %claim,
            kind = kind.as_str(),
            severity = event.severity.as_str(),
            "contamination detected"
        );
        Ok(())
    }
}

/// Claims involved in a shared-namespace contradiction
///
/// Live shared claims are grouped by (category, topic); a group with
/// more than one distinct body flags every claim in it.
fn contradiction_set(claims: &[Claim]) -> Vec<ClaimId> {
    let mut groups: HashMap<(&str, &str), Vec<&Claim>> = HashMap::new();
    for claim in claims {
        if claim.state.is_live() && claim.namespace == Namespace::Shared {
            groups
                .entry((&claim.payload.category, &claim.payload.topic))
                .or_default()
                .push(claim);
        }
    }

    let mut flagged = Vec::new();
    for group in groups.values() {
        let contradicted = group
            .iter()
            .any(|a| group.iter().any(|b| a.payload.contradicts(&b.payload)));
        if contradicted {
            flagged.extend(group.iter().map(|c| c.id));
        }
    }
    flagged
}

fn store_err<E: Display>(e: E) -> DetectorError {
    DetectorError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_domain::{
        AgentId, ClaimState, Payload, RoundId, Severity, ValidationRecord,
    };
    use cairn_store::MemoryStore;

    const NOW: u64 = 1_700_000_000;

    fn agent(name: &str) -> AgentId {
        AgentId::new(name).unwrap()
    }

    fn shared_claim(topic: &str, body: &str) -> Claim {
        let mut claim = Claim::new(
            agent("scout-7"),
            Payload::new("api-functionality", topic, body),
            0.6,
            NOW - 1000,
        );
        claim.namespace = Namespace::Shared;
        claim.state = ClaimState::EmpiricalValidated;
        claim
    }

    fn open_events(store: &MemoryStore, kind: ContaminationKind) -> Vec<ContaminationEvent> {
        EventStore::query_events(
            store,
            &EventFilter {
                kind: Some(kind),
                open_only: true,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_contradiction_flags_both_claims() {
        let mut store = MemoryStore::new();
        ClaimStore::insert_claim(&mut store, &shared_claim("search/v2", "paginated")).unwrap();
        ClaimStore::insert_claim(&mut store, &shared_claim("search/v2", "removed")).unwrap();
        ClaimStore::insert_claim(&mut store, &shared_claim("search/v3", "unrelated")).unwrap();

        let mut detector = Detector::new(DetectorConfig::default());
        let cycle = detector.scan(&mut store, NOW).unwrap();
        assert_eq!(cycle.raised_for(ContaminationKind::Contradiction), 2);

        let events = open_events(&store, ContaminationKind::Contradiction);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.severity == Severity::High));
    }

    #[test]
    fn test_private_disagreement_is_not_contradiction() {
        let mut store = MemoryStore::new();
        let mut a = shared_claim("search/v2", "paginated");
        a.namespace = Namespace::Private(agent("scout-7"));
        ClaimStore::insert_claim(&mut store, &a).unwrap();
        ClaimStore::insert_claim(&mut store, &shared_claim("search/v2", "removed")).unwrap();

        let mut detector = Detector::new(DetectorConfig::default());
        let cycle = detector.scan(&mut store, NOW).unwrap();
        assert_eq!(cycle.raised_for(ContaminationKind::Contradiction), 0);
    }

    #[test]
    fn test_stale_use_detected() {
        let mut store = MemoryStore::new();
        let mut claim = shared_claim("search/v2", "paginated");
        claim.expires_at = Some(NOW - 100);
        claim.last_cited_at = Some(NOW - 10);
        ClaimStore::insert_claim(&mut store, &claim).unwrap();

        let mut detector = Detector::new(DetectorConfig::default());
        let cycle = detector.scan(&mut store, NOW).unwrap();
        assert_eq!(cycle.raised_for(ContaminationKind::StaleUse), 1);
        assert_eq!(
            open_events(&store, ContaminationKind::StaleUse)[0].severity,
            Severity::Medium
        );
    }

    #[test]
    fn test_citation_before_expiry_is_clean() {
        let mut store = MemoryStore::new();
        let mut claim = shared_claim("search/v2", "paginated");
        claim.expires_at = Some(NOW + 100);
        claim.last_cited_at = Some(NOW - 10);
        ClaimStore::insert_claim(&mut store, &claim).unwrap();

        let mut detector = Detector::new(DetectorConfig::default());
        let cycle = detector.scan(&mut store, NOW).unwrap();
        assert_eq!(cycle.raised_for(ContaminationKind::StaleUse), 0);
    }

    #[test]
    fn test_unsupported_confidence_detected() {
        let mut store = MemoryStore::new();
        let mut claim = shared_claim("search/v2", "paginated");
        claim.confidence = 0.9;
        claim.evidence = Vec::new(); // validated yet nothing cited
        ClaimStore::insert_claim(&mut store, &claim).unwrap();

        let mut detector = Detector::new(DetectorConfig::default());
        let cycle = detector.scan(&mut store, NOW).unwrap();
        assert_eq!(cycle.raised_for(ContaminationKind::UnsupportedConfidence), 1);
        assert_eq!(
            open_events(&store, ContaminationKind::UnsupportedConfidence)[0].severity,
            Severity::Critical
        );
    }

    #[test]
    fn test_confidence_drift_detected() {
        let mut store = MemoryStore::new();
        let mut claim = shared_claim("search/v2", "paginated");
        let artifact =
            cairn_domain::traits::EvidenceStore::put_artifact(&mut store, b"log").unwrap();
        claim.evidence = vec![artifact];
        claim.confidence = 0.95;
        let id = ClaimStore::insert_claim(&mut store, &claim).unwrap();

        // The only approval on record backs 0.8, not 0.95
        ValidationStore::append_record(
            &mut store,
            &ValidationRecord::new(
                RoundId::new(),
                id,
                agent("checker-1"),
                Verdict::Approve,
                0.8,
                NOW - 500,
            ),
        )
        .unwrap();

        let mut detector = Detector::new(DetectorConfig::default());
        let cycle = detector.scan(&mut store, NOW).unwrap();
        assert_eq!(cycle.raised_for(ContaminationKind::ConfidenceDrift), 1);
    }

    #[test]
    fn test_backed_confidence_is_clean() {
        let mut store = MemoryStore::new();
        let mut claim = shared_claim("search/v2", "paginated");
        let artifact =
            cairn_domain::traits::EvidenceStore::put_artifact(&mut store, b"log").unwrap();
        claim.evidence = vec![artifact];
        claim.confidence = 0.8;
        let id = ClaimStore::insert_claim(&mut store, &claim).unwrap();

        ValidationStore::append_record(
            &mut store,
            &ValidationRecord::new(
                RoundId::new(),
                id,
                agent("checker-1"),
                Verdict::Approve,
                0.8,
                NOW - 500,
            ),
        )
        .unwrap();

        let mut detector = Detector::new(DetectorConfig::default());
        let cycle = detector.scan(&mut store, NOW).unwrap();
        assert_eq!(cycle.raised_for(ContaminationKind::ConfidenceDrift), 0);
    }

    #[test]
    fn test_rescan_raises_nothing_new() {
        let mut store = MemoryStore::new();
        ClaimStore::insert_claim(&mut store, &shared_claim("search/v2", "paginated")).unwrap();
        ClaimStore::insert_claim(&mut store, &shared_claim("search/v2", "removed")).unwrap();

        let mut detector = Detector::new(DetectorConfig::default());
        assert_eq!(detector.scan(&mut store, NOW).unwrap().total_raised(), 2);
        assert_eq!(detector.scan(&mut store, NOW + 60).unwrap().total_raised(), 0);
        assert_eq!(detector.metrics().scan_count, 2);
    }
}
