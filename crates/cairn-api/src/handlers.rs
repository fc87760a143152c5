//! HTTP request handlers for the oversight and agent API
//!
//! Principals come from headers: agents send `x-cairn-agent`, operators
//! send `x-cairn-operator`. All responses are JSON.

use crate::service::{CairnService, ServiceError};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use cairn_access::Principal;
use cairn_domain::traits::{ClaimQuery, EventFilter};
use cairn_domain::{
    AgentId, ArtifactId, Claim, ClaimId, ClaimState, ContaminationEvent, ContaminationKind,
    EventId, Namespace, Severity, Verdict,
};
use cairn_gate::GateError;
use cairn_quarantine::{QuarantineError, Resolution};
use cairn_quorum::{QuorumError, Vote, VoteOutcome};
use cairn_store::SqliteStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The service facade
    pub service: Arc<CairnService<SqliteStore>>,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type mapping service errors to status codes
#[derive(Debug)]
pub enum AppError {
    /// Service-layer error
    Service(ServiceError),
    /// Malformed request
    BadRequest(String),
    /// Resource does not exist
    NotFound(String),
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        AppError::Service(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Service(e) => {
                let status = match &e {
                    ServiceError::AccessDenied { .. }
                    | ServiceError::Gate(GateError::AccessDenied { .. }) => StatusCode::FORBIDDEN,
                    ServiceError::Gate(GateError::InsufficientEvidence { .. }) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    ServiceError::Gate(
                        GateError::InvalidConfidence(_) | GateError::UnknownEvidence(_),
                    ) => StatusCode::BAD_REQUEST,
                    ServiceError::ClaimNotFound(_)
                    | ServiceError::Quorum(
                        QuorumError::ClaimNotFound(_) | QuorumError::NoOpenRound(_),
                    )
                    | ServiceError::Quarantine(
                        QuarantineError::EventNotFound(_) | QuarantineError::ClaimNotFound(_),
                    ) => StatusCode::NOT_FOUND,
                    ServiceError::Quorum(QuorumError::InvalidConfidence(_)) => {
                        StatusCode::BAD_REQUEST
                    }
                    ServiceError::Quorum(_) | ServiceError::Quarantine(_) => StatusCode::CONFLICT,
                    ServiceError::Gate(_) | ServiceError::Store(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, e.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AppError> {
    if let Some(value) = headers.get("x-cairn-operator") {
        let id = value
            .to_str()
            .map_err(|_| AppError::BadRequest("invalid x-cairn-operator header".into()))?;
        return Ok(Principal::Operator(id.to_string()));
    }
    if let Some(value) = headers.get("x-cairn-agent") {
        let id = value
            .to_str()
            .map_err(|_| AppError::BadRequest("invalid x-cairn-agent header".into()))?;
        let agent = AgentId::new(id).map_err(AppError::BadRequest)?;
        return Ok(Principal::Agent(agent));
    }
    Err(AppError::BadRequest(
        "missing x-cairn-agent or x-cairn-operator header".into(),
    ))
}

fn parse_claim_id(s: &str) -> Result<ClaimId, AppError> {
    ClaimId::from_string(s).map_err(AppError::BadRequest)
}

fn parse_event_id(s: &str) -> Result<EventId, AppError> {
    uuid::Uuid::parse_str(s)
        .map(|u| EventId::from_value(u.as_u128()))
        .map_err(|e| AppError::BadRequest(format!("Invalid event id: {}", e)))
}

/// Claim as serialized in responses
#[derive(Debug, Serialize)]
pub struct ClaimView {
    /// Claim id (UUID)
    pub id: String,
    /// Originating agent
    pub agent: String,
    /// Namespace path
    pub namespace: String,
    /// Claim category
    pub category: String,
    /// Topic key
    pub topic: String,
    /// Opaque body
    pub body: String,
    /// Classification state
    pub state: String,
    /// Confidence
    pub confidence: f64,
    /// Evidence checksums
    pub evidence: Vec<String>,
    /// Expiration timestamp
    pub expires_at: Option<u64>,
    /// Set when re-validation is pending
    pub revalidation_flagged: bool,
    /// Version stamp
    pub version: u64,
}

impl From<Claim> for ClaimView {
    fn from(claim: Claim) -> Self {
        Self {
            id: claim.id.to_string(),
            agent: claim.agent.to_string(),
            namespace: claim.namespace.as_path(),
            category: claim.payload.category,
            topic: claim.payload.topic,
            body: claim.payload.body,
            state: claim.state.as_str().to_string(),
            confidence: claim.confidence,
            evidence: claim.evidence.iter().map(|a| a.to_string()).collect(),
            expires_at: claim.expires_at,
            revalidation_flagged: claim.revalidation_flagged,
            version: claim.version,
        }
    }
}

/// Contamination event as serialized in responses
#[derive(Debug, Serialize)]
pub struct EventView {
    /// Event id (UUID)
    pub id: String,
    /// The flagged claim
    pub claim: String,
    /// Contamination kind
    pub kind: String,
    /// Severity
    pub severity: String,
    /// Detection timestamp
    pub detected_at: u64,
    /// Resolution timestamp, if resolved
    pub resolved_at: Option<u64>,
}

impl From<ContaminationEvent> for EventView {
    fn from(event: ContaminationEvent) -> Self {
        Self {
            id: event.id.to_string(),
            claim: event.claim.to_string(),
            kind: event.kind.as_str().to_string(),
            severity: event.severity.as_str().to_string(),
            detected_at: event.detected_at,
            resolved_at: event.resolved_at,
        }
    }
}

/// POST /claims request body
#[derive(Debug, Deserialize)]
pub struct SubmitClaimRequest {
    /// Claim category
    pub category: String,
    /// Topic key
    pub topic: String,
    /// Opaque body
    pub body: String,
    /// Asserted confidence
    pub confidence: f64,
    /// Evidence checksums (must already be uploaded)
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// POST /claims response body
#[derive(Debug, Serialize)]
pub struct SubmitClaimResponse {
    /// The stored claim
    pub claim_id: String,
    /// State the claim was stored in
    pub state: String,
    /// Confidence actually stored
    pub confidence: f64,
    /// Expiration stamp
    pub expires_at: u64,
    /// Whether a validation round was opened
    pub pending_validation: bool,
}

/// POST /claims - submit a claim through the validation gate
async fn submit_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<SubmitClaimResponse>), AppError> {
    let principal = principal_from_headers(&headers)?;
    let Principal::Agent(agent) = principal else {
        return Err(AppError::BadRequest(
            "claims are submitted by agents, not operators".into(),
        ));
    };

    let evidence = request
        .evidence
        .into_iter()
        .map(|c| ArtifactId::from_checksum(c).map_err(AppError::BadRequest))
        .collect::<Result<Vec<_>, _>>()?;

    let outcome = state.service.submit_claim(
        cairn_gate::SubmitRequest {
            namespace: Namespace::Private(agent.clone()),
            agent,
            payload: cairn_domain::Payload::new(request.category, request.topic, request.body),
            confidence: request.confidence,
            evidence,
        },
        unix_now(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitClaimResponse {
            claim_id: outcome.claim.to_string(),
            state: outcome.state.as_str().to_string(),
            confidence: outcome.confidence,
            expires_at: outcome.expires_at,
            pending_validation: outcome.pending_validation,
        }),
    ))
}

/// GET /claims/{id} - fetch one claim (counts as a citation)
async fn get_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ClaimView>, AppError> {
    let principal = principal_from_headers(&headers)?;
    let id = parse_claim_id(&id)?;
    let claim = state.service.get_claim(&principal, id, unix_now())?;
    Ok(Json(claim.into()))
}

/// GET /claims query parameters
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// Namespace path; defaults to "shared"
    pub namespace: Option<String>,
    /// Filter by category
    pub category: Option<String>,
    /// Filter by topic
    pub topic: Option<String>,
    /// Filter by state
    pub state: Option<String>,
    /// Filter by minimum confidence
    pub min_confidence: Option<f64>,
    /// Maximum results
    pub limit: Option<usize>,
}

/// GET /claims - query claims within one namespace
async fn query_claims(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<ClaimView>>, AppError> {
    let principal = principal_from_headers(&headers)?;

    let namespace = params
        .namespace
        .map(|p| Namespace::parse(&p).map_err(AppError::BadRequest))
        .transpose()?;
    let claim_state = params
        .state
        .map(|s| {
            ClaimState::parse(&s)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid claim state: {}", s)))
        })
        .transpose()?;

    let query = ClaimQuery {
        namespace,
        agent: None,
        category: params.category,
        topic: params.topic,
        state: claim_state,
        min_confidence: params.min_confidence,
        limit: params.limit,
    };
    let claims = state.service.query_claims(&principal, query)?;
    Ok(Json(claims.into_iter().map(ClaimView::from).collect()))
}

/// POST /evidence response body
#[derive(Debug, Serialize)]
pub struct UploadEvidenceResponse {
    /// Content-derived artifact checksum
    pub checksum: String,
}

/// POST /evidence - upload evidence bytes, content-addressed
async fn upload_evidence(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadEvidenceResponse>), AppError> {
    let artifact = state.service.upload_evidence(&body)?;
    Ok((
        StatusCode::CREATED,
        Json(UploadEvidenceResponse {
            checksum: artifact.to_string(),
        }),
    ))
}

/// GET /evidence/{checksum} - fetch raw evidence bytes
async fn get_evidence(
    State(state): State<AppState>,
    Path(checksum): Path<String>,
) -> Result<Bytes, AppError> {
    let artifact = ArtifactId::from_checksum(checksum).map_err(AppError::BadRequest)?;
    match state.service.get_evidence(&artifact)? {
        Some(bytes) => Ok(Bytes::from(bytes)),
        None => Err(AppError::NotFound(format!(
            "Unknown evidence artifact: {}",
            artifact
        ))),
    }
}

/// POST /claims/{id}/votes request body
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// The verdict: approve, reject, or needs_evidence
    pub verdict: String,
    /// Whether the confirmation is externally sourced
    #[serde(default)]
    pub external: bool,
    /// Validator's confidence estimate
    pub confidence: f64,
}

/// POST /claims/{id}/votes response body
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    /// What the vote did: pending, promoted, rejected, evidence_requested
    pub status: String,
    /// Settled state, when promoted
    pub state: Option<String>,
    /// Settled confidence, when promoted
    pub confidence: Option<f64>,
}

/// POST /claims/{id}/votes - record a validator's verdict
async fn submit_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, AppError> {
    let principal = principal_from_headers(&headers)?;
    let Principal::Agent(validator) = principal else {
        return Err(AppError::BadRequest(
            "votes are cast by validator agents".into(),
        ));
    };
    let claim = parse_claim_id(&id)?;
    let verdict = Verdict::parse(&request.verdict)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid verdict: {}", request.verdict)))?;

    let outcome = state.service.submit_vote(
        claim,
        Vote {
            validator,
            verdict,
            external: request.external,
            confidence: request.confidence,
        },
        unix_now(),
    )?;

    let response = match outcome {
        VoteOutcome::Pending { .. } => VoteResponse {
            status: "pending".to_string(),
            state: None,
            confidence: None,
        },
        VoteOutcome::Promoted { state, confidence } => VoteResponse {
            status: "promoted".to_string(),
            state: Some(state.as_str().to_string()),
            confidence: Some(confidence),
        },
        VoteOutcome::Rejected => VoteResponse {
            status: "rejected".to_string(),
            state: None,
            confidence: None,
        },
        VoteOutcome::EvidenceRequested => VoteResponse {
            status: "evidence_requested".to_string(),
            state: None,
            confidence: None,
        },
    };
    Ok(Json(response))
}

/// GET /events query parameters
#[derive(Debug, Deserialize)]
pub struct EventParams {
    /// Filter by flagged claim
    pub claim: Option<String>,
    /// Filter by contamination kind
    pub kind: Option<String>,
    /// Filter by minimum severity
    pub min_severity: Option<String>,
    /// Only unresolved events
    #[serde(default)]
    pub open_only: bool,
}

/// GET /events - contamination events (auditors and operators)
async fn list_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<EventParams>,
) -> Result<Json<Vec<EventView>>, AppError> {
    let principal = principal_from_headers(&headers)?;

    let claim = params.claim.as_deref().map(parse_claim_id).transpose()?;
    let kind = params
        .kind
        .map(|k| {
            ContaminationKind::parse(&k)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid contamination kind: {}", k)))
        })
        .transpose()?;
    let min_severity = params
        .min_severity
        .map(|s| {
            Severity::parse(&s)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid severity: {}", s)))
        })
        .transpose()?;

    let filter = EventFilter {
        claim,
        kind,
        min_severity,
        open_only: params.open_only,
    };
    let events = state.service.contamination_events(&principal, filter)?;
    Ok(Json(events.into_iter().map(EventView::from).collect()))
}

/// POST /events/{id}/quarantine response body
#[derive(Debug, Serialize)]
pub struct QuarantineResponse {
    /// The isolated claim
    pub claim_id: String,
}

/// POST /events/{id}/quarantine - isolate the flagged claim
async fn quarantine_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<QuarantineResponse>, AppError> {
    let principal = principal_from_headers(&headers)?;
    let event = parse_event_id(&id)?;
    let claim = state.service.quarantine_claim(&principal, event)?;
    Ok(Json(QuarantineResponse {
        claim_id: claim.to_string(),
    }))
}

/// POST /events/{id}/resolve request body
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// "restore" or "archive"
    pub resolution: String,
}

/// POST /events/{id}/resolve - resolve a quarantined claim's event
async fn resolve_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<StatusCode, AppError> {
    let principal = principal_from_headers(&headers)?;
    let event = parse_event_id(&id)?;
    let resolution = match request.resolution.as_str() {
        "restore" => Resolution::Restore,
        "archive" => Resolution::Archive,
        other => {
            return Err(AppError::BadRequest(format!(
                "Invalid resolution: {}",
                other
            )))
        }
    };
    state
        .service
        .resolve_quarantine(&principal, event, resolution, unix_now())?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /agents/{agent}/credibility query parameters
#[derive(Debug, Deserialize)]
pub struct CredibilityParams {
    /// Claim category the score applies to
    pub category: String,
}

/// Credibility response body
#[derive(Debug, Serialize)]
pub struct CredibilityResponse {
    /// The agent
    pub agent: String,
    /// The claim category
    pub category: String,
    /// Current score with inactivity decay applied
    pub score: f64,
}

/// GET /agents/{agent}/credibility - decayed credibility score
async fn get_credibility(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Query(params): Query<CredibilityParams>,
) -> Result<Json<CredibilityResponse>, AppError> {
    let agent = AgentId::new(&agent).map_err(AppError::BadRequest)?;
    let score = state
        .service
        .credibility(&agent, &params.category, unix_now())?;
    Ok(Json(CredibilityResponse {
        agent: agent.to_string(),
        category: params.category,
        score,
    }))
}

/// One materialized credibility score
#[derive(Debug, Serialize)]
pub struct ScoreView {
    /// The agent
    pub agent: String,
    /// The claim category
    pub category: String,
    /// Raw materialized value, without decay
    pub value: f64,
    /// Timestamp of the last ledger entry applied
    pub updated_at: u64,
}

/// GET /credibility - every materialized score on record
async fn list_credibility(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScoreView>>, AppError> {
    let scores = state.service.credibility_scores()?;
    Ok(Json(
        scores
            .into_iter()
            .map(|s| ScoreView {
                agent: s.agent.to_string(),
                category: s.category,
                value: s.value,
                updated_at: s.updated_at,
            })
            .collect(),
    ))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/claims", post(submit_claim).get(query_claims))
        .route("/claims/:id", get(get_claim))
        .route("/claims/:id/votes", post(submit_vote))
        .route("/evidence", post(upload_evidence))
        .route("/evidence/:checksum", get(get_evidence))
        .route("/events", get(list_events))
        .route("/events/:id/quarantine", post(quarantine_claim))
        .route("/events/:id/resolve", post(resolve_event))
        .route("/agents/:agent/credibility", get(get_credibility))
        .route("/credibility", get(list_credibility))
        .route("/health", get(health_check))
        .with_state(state)
}
