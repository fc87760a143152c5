//! Cairn Domain Layer
//!
//! Core data model for the contamination-prevention layer. This crate
//! defines the fundamental concepts, value objects, and trait interfaces
//! that all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **Claim**: An atomic, attributed assertion with a classification
//!   state and confidence -- never a bare fact
//! - **Classification state**: `Claim` → `Hypothesis` →
//!   `EmpiricalValidated` → `ExternalVerified`, with `Quarantined`,
//!   `Expired`, and `Archived` as side/terminal states
//! - **Namespace**: per-agent private, shared-validated, or quarantine;
//!   a claim lives in exactly one at a time
//! - **Evidence artifact**: immutable, content-addressed supporting
//!   material a claim can cite
//! - **Validation record**: one validator's independent verdict on a claim
//! - **Contamination event**: a detector finding over the claim corpus
//! - **Credibility**: per-agent, per-category trust derived from
//!   validation and quarantine outcomes, kept as an append-only ledger
//!
//! ## Architecture
//!
//! Pure domain logic only: infrastructure implementations (SQLite,
//! HTTP) live in other crates behind the traits defined in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod claim;
pub mod contamination;
pub mod credibility;
pub mod evidence;
pub mod namespace;
pub mod payload;
pub mod state;
pub mod traits;
pub mod validation;

// Re-exports for convenience
pub use agent::AgentId;
pub use claim::{Claim, ClaimId};
pub use contamination::{ContaminationEvent, ContaminationKind, EventId, Severity};
pub use credibility::{AdjustmentReason, CredibilityEvent, CredibilityScore, NEUTRAL_SCORE};
pub use evidence::ArtifactId;
pub use namespace::Namespace;
pub use payload::Payload;
pub use state::ClaimState;
pub use validation::{QuorumRule, RoundId, RoundState, ValidationRecord, Verdict};
