//! Cairn Cross-Validator
//!
//! Runs cross-validation rounds: a claim routed here by the gate is
//! assigned independent validators, their verdicts accumulate as
//! immutable validation records, and the round settles when the quorum
//! rule is met or becomes unreachable. Settlement is what moves a claim
//! into the shared namespace; nothing else does.
//!
//! Round state is persisted, so a crash mid-round resumes with the
//! votes already received. A round past its deadline is a soft cancel:
//! the claim drops back to `Hypothesis`, flagged for re-validation, and
//! is never promoted from stale votes.

#![warn(missing_docs)]

mod error;
mod validator;

pub use error::QuorumError;
pub use validator::{CrossValidator, Vote, VoteOutcome};
