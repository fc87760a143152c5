//! Credibility - per-agent, per-category trust as an append-only ledger
//!
//! Scores are never a single mutable cell: every change is a
//! [`CredibilityEvent`] appended to the ledger, and the current value is
//! a materialization that can be rebuilt by replay. Concurrent
//! adjustments are commutative deltas.

use crate::agent::AgentId;
use crate::contamination::Severity;
use serde::{Deserialize, Serialize};

/// The neutral score an agent starts at and decays back toward
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Why a credibility score was adjusted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// A claim by this agent passed cross-validation
    ValidationApproved,

    /// A claim by this agent was rejected at quorum
    ValidationRejected,

    /// A quarantine override was approved (claim restored)
    OverrideApproved,

    /// Contamination was confirmed at the given severity
    ContaminationConfirmed(Severity),

    /// Explicit administrative reset to neutral
    AdministrativeReset,
}

impl AdjustmentReason {
    /// The signed delta this reason applies to the materialized score
    pub fn delta(&self) -> f64 {
        match self {
            AdjustmentReason::ValidationApproved => 0.03,
            AdjustmentReason::ValidationRejected => -0.03,
            AdjustmentReason::OverrideApproved => 0.02,
            AdjustmentReason::ContaminationConfirmed(severity) => -severity.credibility_penalty(),
            AdjustmentReason::AdministrativeReset => 0.0,
        }
    }
}

/// One entry in the credibility ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityEvent {
    /// Agent whose score is adjusted
    pub agent: AgentId,

    /// Claim category the adjustment applies to
    pub category: String,

    /// Why the adjustment happened
    pub reason: AdjustmentReason,

    /// When it was recorded (seconds since Unix epoch)
    pub recorded_at: u64,
}

impl CredibilityEvent {
    /// Create a ledger entry
    pub fn new(
        agent: AgentId,
        category: impl Into<String>,
        reason: AdjustmentReason,
        recorded_at: u64,
    ) -> Self {
        Self {
            agent,
            category: category.into(),
            reason,
            recorded_at,
        }
    }
}

/// Materialized current score for one (agent, category) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityScore {
    /// The agent
    pub agent: AgentId,

    /// The claim category
    pub category: String,

    /// Current value in [0.0, 1.0]
    pub value: f64,

    /// Timestamp of the last ledger entry applied
    pub updated_at: u64,
}

impl CredibilityScore {
    /// A fresh score at neutral
    pub fn neutral(agent: AgentId, category: impl Into<String>, at: u64) -> Self {
        Self {
            agent,
            category: category.into(),
            value: NEUTRAL_SCORE,
            updated_at: at,
        }
    }

    /// Apply one ledger entry to the materialized value
    ///
    /// An administrative reset snaps the value back to neutral; every
    /// other reason applies its delta, clamped to [0.0, 1.0].
    pub fn apply(&mut self, event: &CredibilityEvent) {
        match event.reason {
            AdjustmentReason::AdministrativeReset => self.value = NEUTRAL_SCORE,
            reason => self.value = (self.value + reason.delta()).clamp(0.0, 1.0),
        }
        self.updated_at = event.recorded_at;
    }

    /// Score after inactivity decay, without mutating the ledger
    ///
    /// Decay is linear toward [`NEUTRAL_SCORE`]: an agent idle for a
    /// full `decay_window_secs` reads as neutral, an agent idle for half
    /// the window reads halfway back. Activity before the window leaves
    /// the value untouched.
    pub fn decayed_value(&self, now: u64, decay_window_secs: u64) -> f64 {
        if decay_window_secs == 0 || now <= self.updated_at {
            return self.value;
        }
        let idle = now - self.updated_at;
        if idle >= decay_window_secs {
            return NEUTRAL_SCORE;
        }
        let fraction = idle as f64 / decay_window_secs as f64;
        self.value + (NEUTRAL_SCORE - self.value) * fraction
    }
}
