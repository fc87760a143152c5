//! Cairn Quarantine Manager
//!
//! Isolates claims flagged by the contamination detector and applies
//! the credibility consequences when an operator resolves the finding.
//!
//! - Quarantine moves the claim into the quarantine namespace in the
//!   `Quarantined` state; its history and evidence stay intact
//! - Resolution either restores the claim as a private hypothesis
//!   flagged for re-validation, or archives it for good
//! - Confirmed contamination debits the originator's credibility in
//!   proportion to the event's severity; an approved restore credits it
//!
//! Transitions hold an exclusive per-claim lock, so two concurrent
//! resolutions of the same claim cannot interleave.

#![warn(missing_docs)]

mod error;
mod manager;

pub use error::QuarantineError;
pub use manager::{QuarantineManager, Resolution};
