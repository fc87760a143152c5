//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and
//! infrastructure. The SQLite implementations live in `cairn-store`;
//! tests use in-memory mocks.

use crate::agent::AgentId;
use crate::claim::{Claim, ClaimId};
use crate::contamination::{ContaminationEvent, ContaminationKind, EventId, Severity};
use crate::credibility::{CredibilityEvent, CredibilityScore};
use crate::evidence::ArtifactId;
use crate::namespace::Namespace;
use crate::state::ClaimState;
use crate::validation::{RoundId, RoundState, ValidationRecord};

/// Query criteria for retrieving claims
#[derive(Debug, Clone, Default)]
pub struct ClaimQuery {
    /// Filter by namespace
    pub namespace: Option<Namespace>,

    /// Filter by originating agent
    pub agent: Option<AgentId>,

    /// Filter by claim category
    pub category: Option<String>,

    /// Filter by topic key
    pub topic: Option<String>,

    /// Filter by classification state
    pub state: Option<ClaimState>,

    /// Filter by minimum confidence
    pub min_confidence: Option<f64>,

    /// Maximum results to return
    pub limit: Option<usize>,
}

/// Filter criteria for contamination events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Filter by flagged claim
    pub claim: Option<ClaimId>,

    /// Filter by contamination kind
    pub kind: Option<ContaminationKind>,

    /// Filter by minimum severity
    pub min_severity: Option<Severity>,

    /// Only events awaiting resolution
    pub open_only: bool,
}

/// Storage of claim records and their classification state
///
/// Every mutation appends a history row; the current row is replaced
/// only through a compare-and-set on the version stamp, so two writers
/// racing on the same claim cannot silently lose an update.
pub trait ClaimStore {
    /// Error type for store operations
    type Error;

    /// Insert a new claim (version 0)
    fn insert_claim(&mut self, claim: &Claim) -> Result<ClaimId, Self::Error>;

    /// Get a claim by id
    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, Self::Error>;

    /// Replace a claim's current record, expecting `expected_version`
    ///
    /// The stored version must equal `expected_version`; on success the
    /// claim is written with `expected_version + 1` and the previous
    /// record is appended to history. A version mismatch is an error.
    fn update_claim(&mut self, claim: &Claim, expected_version: u64) -> Result<(), Self::Error>;

    /// Query claims matching criteria
    fn query_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, Self::Error>;

    /// Record that a claim was cited/read by another agent at `at`
    fn record_citation(&mut self, id: ClaimId, at: u64) -> Result<(), Self::Error>;
}

/// Content-addressed storage of evidence artifacts
pub trait EvidenceStore {
    /// Error type for store operations
    type Error;

    /// Store artifact bytes, returning the content-derived id
    ///
    /// Storing the same bytes twice returns the same id; artifacts are
    /// never mutated.
    fn put_artifact(&mut self, bytes: &[u8]) -> Result<ArtifactId, Self::Error>;

    /// Retrieve artifact bytes by id
    fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Whether an artifact exists
    fn has_artifact(&self, id: &ArtifactId) -> Result<bool, Self::Error>;

    /// Remove artifacts referenced by no live claim, returning how many
    /// were collected
    fn collect_unreferenced(&mut self, live: &[ArtifactId]) -> Result<usize, Self::Error>;
}

/// Storage of validation records and round state
pub trait ValidationStore {
    /// Error type for store operations
    type Error;

    /// Append a validation record (immutable once written)
    fn append_record(&mut self, record: &ValidationRecord) -> Result<(), Self::Error>;

    /// All records received for a round
    fn records_for_round(&self, round: RoundId) -> Result<Vec<ValidationRecord>, Self::Error>;

    /// All records ever attached to a claim
    fn records_for_claim(&self, claim: ClaimId) -> Result<Vec<ValidationRecord>, Self::Error>;

    /// Persist round state so a crash mid-round can resume
    fn save_round(&mut self, round: &RoundState) -> Result<(), Self::Error>;

    /// The open round for a claim, if any
    fn open_round_for_claim(&self, claim: ClaimId) -> Result<Option<RoundState>, Self::Error>;

    /// All open rounds (for resume after restart)
    fn open_rounds(&self) -> Result<Vec<RoundState>, Self::Error>;

    /// Mark a round closed
    fn close_round(&mut self, round: RoundId) -> Result<(), Self::Error>;
}

/// Storage of contamination events
pub trait EventStore {
    /// Error type for store operations
    type Error;

    /// Append a detector finding
    fn append_event(&mut self, event: &ContaminationEvent) -> Result<(), Self::Error>;

    /// Query events
    fn query_events(&self, filter: &EventFilter) -> Result<Vec<ContaminationEvent>, Self::Error>;

    /// Stamp an event resolved at `at`
    fn resolve_event(&mut self, id: EventId, at: u64) -> Result<(), Self::Error>;
}

/// Storage of the credibility ledger and its materialized scores
pub trait CredibilityStore {
    /// Error type for store operations
    type Error;

    /// Append a ledger entry and update the materialized score
    fn append_adjustment(&mut self, event: &CredibilityEvent) -> Result<(), Self::Error>;

    /// Materialized score for one (agent, category) pair
    fn score(&self, agent: &AgentId, category: &str)
        -> Result<Option<CredibilityScore>, Self::Error>;

    /// All materialized scores
    fn scores(&self) -> Result<Vec<CredibilityScore>, Self::Error>;
}
