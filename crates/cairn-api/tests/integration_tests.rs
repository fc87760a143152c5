//! End-to-end scenarios over the service facade
//!
//! Each test drives the full pipeline: gate, cross-validation,
//! hygiene, detection, quarantine, and the credibility ledger,
//! backed by SQLite.

use cairn_access::{AccessController, Principal};
use cairn_api::service::{CairnService, ServiceError};
use cairn_detector::{Detector, DetectorConfig};
use cairn_domain::traits::{ClaimQuery, ClaimStore, EventFilter};
use cairn_domain::{
    AgentId, Claim, ClaimState, ContaminationKind, Namespace, Payload, Verdict, NEUTRAL_SCORE,
};
use cairn_gate::{GateError, GatePolicy, SubmitRequest};
use cairn_hygiene::{HygieneConfig, HygieneEngine};
use cairn_quarantine::Resolution;
use cairn_quorum::{Vote, VoteOutcome};
use cairn_store::{SharedStore, SqliteStore};

const NOW: u64 = 1_700_000_000;
const DAY: u64 = 86_400;

fn agent(name: &str) -> AgentId {
    AgentId::new(name).unwrap()
}

fn service() -> CairnService<SqliteStore> {
    service_over(SharedStore::new(SqliteStore::new(":memory:").unwrap()))
}

fn service_over(store: SharedStore<SqliteStore>) -> CairnService<SqliteStore> {
    CairnService::new(
        store,
        GatePolicy::default().into_shared(),
        AccessController::with_auditors([agent("overseer-1")]),
        vec![agent("checker-1"), agent("checker-2")],
    )
}

fn request(name: &str, category: &str, topic: &str, body: &str, confidence: f64) -> SubmitRequest {
    SubmitRequest {
        agent: agent(name),
        namespace: Namespace::Private(agent(name)),
        payload: Payload::new(category, topic, body),
        confidence,
        evidence: Vec::new(),
    }
}

/// Drive one claim through submission and unanimous approval.
fn promote(svc: &CairnService<SqliteStore>, name: &str, topic: &str, body: &str) -> Claim {
    let artifact = svc.upload_evidence(body.as_bytes()).unwrap();
    let mut req = request(name, "system-capability", topic, body, 0.7);
    req.evidence = vec![artifact];
    let outcome = svc.submit_claim(req, NOW).unwrap();
    assert!(outcome.pending_validation);

    for checker in ["checker-1", "checker-2"] {
        svc.submit_vote(
            outcome.claim,
            Vote {
                validator: agent(checker),
                verdict: Verdict::Approve,
                external: false,
                confidence: 0.85,
            },
            NOW + 10,
        )
        .unwrap();
    }

    let store = svc.store();
    ClaimStore::get_claim(&store, outcome.claim)
        .unwrap()
        .expect("claim should exist")
}

#[test]
fn test_overclaim_without_evidence_is_demoted() {
    let svc = service();
    let err = svc
        .submit_claim(request("scout-7", "research-finding", "t1", "b", 0.9), NOW)
        .unwrap_err();

    let ServiceError::Gate(GateError::InsufficientEvidence {
        claim,
        stored_state,
        capped_confidence,
        ..
    }) = err
    else {
        panic!("expected InsufficientEvidence, got {err}");
    };
    assert_eq!(stored_state, ClaimState::Hypothesis);
    assert_eq!(capped_confidence, 0.5);

    // The claim was still stored, demoted, in the originator's private space
    let owner = Principal::Agent(agent("scout-7"));
    let stored = svc.get_claim(&owner, claim, NOW).unwrap();
    assert_eq!(stored.state, ClaimState::Hypothesis);
    assert_eq!(stored.confidence, 0.5);
    assert_eq!(stored.namespace, Namespace::Private(agent("scout-7")));
}

#[test]
fn test_validated_promotion_end_to_end() {
    let svc = service();
    let claim = promote(&svc, "scout-7", "gpu-access", "cluster has 8 gpus");

    assert_eq!(claim.namespace, Namespace::Shared);
    assert_eq!(claim.state, ClaimState::EmpiricalValidated);
    assert_eq!(claim.confidence, 0.85);

    // Now visible to every agent through the default shared query
    let stranger = Principal::Agent(agent("scout-8"));
    let results = svc.query_claims(&stranger, ClaimQuery::default()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, claim.id);
}

#[test]
fn test_external_confirmation_reaches_top_state() {
    let svc = service();
    let artifact = svc.upload_evidence(b"vendor doc").unwrap();
    let mut req = request("scout-7", "system-capability", "t1", "b", 0.7);
    req.evidence = vec![artifact];
    let outcome = svc.submit_claim(req, NOW).unwrap();

    svc.submit_vote(
        outcome.claim,
        Vote {
            validator: agent("checker-1"),
            verdict: Verdict::Approve,
            external: true,
            confidence: 0.9,
        },
        NOW + 10,
    )
    .unwrap();
    let settled = svc
        .submit_vote(
            outcome.claim,
            Vote {
                validator: agent("checker-2"),
                verdict: Verdict::Approve,
                external: false,
                confidence: 0.8,
            },
            NOW + 20,
        )
        .unwrap();

    assert!(matches!(
        settled,
        VoteOutcome::Promoted {
            state: ClaimState::ExternalVerified,
            ..
        }
    ));
}

#[test]
fn test_round_timeout_flags_revalidation() {
    let svc = service();
    let outcome = svc
        .submit_claim(request("scout-7", "system-capability", "t1", "b", 0.6), NOW)
        .unwrap();
    assert!(outcome.pending_validation);

    // Default validation timeout is 300 seconds; nobody voted
    let expired = svc.expire_rounds(NOW + 301).unwrap();
    assert_eq!(expired, 1);

    let owner = Principal::Agent(agent("scout-7"));
    let claim = svc.get_claim(&owner, outcome.claim, NOW + 302).unwrap();
    assert_eq!(claim.state, ClaimState::Hypothesis);
    assert!(claim.revalidation_flagged);
    assert_eq!(claim.namespace, Namespace::Private(agent("scout-7")));
}

#[test]
fn test_contradiction_scan_flags_both_shared_claims() {
    let svc = service();
    promote(&svc, "scout-7", "gpu-access", "cluster has 8 gpus");
    promote(&svc, "scout-8", "gpu-access", "cluster has 4 gpus");

    let mut store = svc.store();
    let metrics = Detector::new(DetectorConfig::default())
        .scan(&mut store, NOW + 60)
        .unwrap();
    assert_eq!(metrics.raised_for(ContaminationKind::Contradiction), 2);

    let auditor = Principal::Agent(agent("overseer-1"));
    let events = svc
        .contamination_events(
            &auditor,
            EventFilter {
                kind: Some(ContaminationKind::Contradiction),
                open_only: true,
                ..EventFilter::default()
            },
        )
        .unwrap();
    assert_eq!(events.len(), 2);
}

/// Seed a claim that bypassed the gate: shared, high confidence, no
/// evidence. The detector must flag it as critical.
fn seed_unsupported_claim(svc: &CairnService<SqliteStore>) -> cairn_domain::ClaimId {
    let mut claim = Claim::new(
        agent("scout-7"),
        Payload::new("research-finding", "t1", "certain"),
        0.9,
        NOW,
    );
    claim.namespace = Namespace::Shared;
    claim.expires_at = Some(NOW + 30 * DAY);

    let mut store = svc.store();
    let id = ClaimStore::insert_claim(&mut store, &claim).unwrap();

    let metrics = Detector::new(DetectorConfig::default())
        .scan(&mut store, NOW + 5)
        .unwrap();
    assert_eq!(
        metrics.raised_for(ContaminationKind::UnsupportedConfidence),
        1
    );
    id
}

#[test]
fn test_quarantine_archive_lowers_credibility() {
    let svc = service();
    let claim_id = seed_unsupported_claim(&svc);

    let operator = Principal::Operator("op-1".to_string());
    let events = svc
        .contamination_events(&operator, EventFilter::default())
        .unwrap();
    assert_eq!(events.len(), 1);
    let event = events[0].id;

    let isolated = svc.quarantine_claim(&operator, event).unwrap();
    assert_eq!(isolated, claim_id);
    let claim = svc.get_claim(&operator, claim_id, NOW + 10).unwrap();
    assert_eq!(claim.state, ClaimState::Quarantined);
    assert_eq!(claim.namespace, Namespace::Quarantine);

    svc.resolve_quarantine(&operator, event, Resolution::Archive, NOW + 20)
        .unwrap();

    let claim = svc.get_claim(&operator, claim_id, NOW + 30).unwrap();
    assert_eq!(claim.state, ClaimState::Archived);
    assert_eq!(claim.namespace, Namespace::Private(agent("scout-7")));

    // Critical contamination costs 0.20 off the neutral score
    let score = svc
        .credibility(&agent("scout-7"), "research-finding", NOW + 20)
        .unwrap();
    assert!((score - 0.30).abs() < 1e-9);

    // The event is closed
    let open = svc
        .contamination_events(
            &operator,
            EventFilter {
                open_only: true,
                ..EventFilter::default()
            },
        )
        .unwrap();
    assert!(open.is_empty());
}

#[test]
fn test_quarantine_restore_demotes_to_private_hypothesis() {
    let svc = service();
    let claim_id = seed_unsupported_claim(&svc);

    let operator = Principal::Operator("op-1".to_string());
    let events = svc
        .contamination_events(&operator, EventFilter::default())
        .unwrap();
    let event = events[0].id;

    svc.quarantine_claim(&operator, event).unwrap();
    svc.resolve_quarantine(&operator, event, Resolution::Restore, NOW + 20)
        .unwrap();

    // Restored claims re-earn shared status through validation
    let claim = svc.get_claim(&operator, claim_id, NOW + 30).unwrap();
    assert_eq!(claim.state, ClaimState::Hypothesis);
    assert_eq!(claim.namespace, Namespace::Private(agent("scout-7")));
    assert!(claim.revalidation_flagged);

    let score = svc
        .credibility(&agent("scout-7"), "research-finding", NOW + 20)
        .unwrap();
    assert!(score > NEUTRAL_SCORE);
}

#[test]
fn test_hygiene_evicts_expired_shared_claim() {
    let svc = service();
    let claim = promote(&svc, "scout-7", "gpu-access", "cluster has 8 gpus");

    // system-capability expiry is 7 days
    let mut store = svc.store();
    let metrics = HygieneEngine::new(HygieneConfig::default())
        .sweep(&mut store, NOW + 8 * DAY)
        .unwrap();
    assert_eq!(metrics.expired, 1);
    assert_eq!(metrics.expired_from_shared, 1);

    let operator = Principal::Operator("op-1".to_string());
    let swept = svc.get_claim(&operator, claim.id, NOW + 8 * DAY).unwrap();
    assert_eq!(swept.state, ClaimState::Expired);
    assert_eq!(swept.namespace, Namespace::Private(agent("scout-7")));

    // Gone from the shared query
    let reader = Principal::Agent(agent("scout-8"));
    let results = svc.query_claims(&reader, ClaimQuery::default()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_recovery_expires_rounds_opened_before_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cairn.db");

    let claim_id = {
        let svc = service_over(SharedStore::new(SqliteStore::new(&path).unwrap()));
        let outcome = svc
            .submit_claim(request("scout-7", "system-capability", "t1", "b", 0.6), NOW)
            .unwrap();
        assert!(outcome.pending_validation);
        outcome.claim
    };

    // Restart: reopen the database and recover past the round deadline
    let svc = service_over(SharedStore::new(SqliteStore::new(&path).unwrap()));
    let expired = svc.recover(NOW + 400).unwrap();
    assert_eq!(expired, 1);

    let owner = Principal::Agent(agent("scout-7"));
    let claim = svc.get_claim(&owner, claim_id, NOW + 401).unwrap();
    assert_eq!(claim.state, ClaimState::Hypothesis);
    assert!(claim.revalidation_flagged);
}
