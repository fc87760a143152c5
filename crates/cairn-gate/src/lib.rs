//! Cairn Validation Gate
//!
//! The synchronous policy check applied to every claim write. The gate:
//!
//! - rejects confidence at or above 0.8 without evidence, storing the
//!   claim as a capped `Hypothesis` instead of dropping it
//! - stamps an expiration time from the per-category policy table
//! - decides whether the claim's category requires cross-validation,
//!   so the caller can open a round rather than writing to shared
//!
//! Policy is data, not code: the per-category expiration durations,
//! quorum rules, and the cross-validation timeout live in a TOML
//! document that can be reloaded without restarting the service.
//!
//! # Examples
//!
//! ```no_run
//! use cairn_gate::{GatePolicy, ValidationGate};
//!
//! let policy = GatePolicy::default();
//! let gate = ValidationGate::new(policy.into_shared());
//! // let outcome = gate.submit(&mut store, &access, request, now)?;
//! ```

#![warn(missing_docs)]

mod error;
mod gate;
mod policy;

pub use error::GateError;
pub use gate::{SubmitOutcome, SubmitRequest, ValidationGate};
pub use policy::{CategoryPolicy, GatePolicy, SharedPolicy};
