//! Cairn Access Controller
//!
//! Enforces per-agent read/write scopes across private, shared, and
//! quarantine namespaces. The rules are few and fixed:
//!
//! - an agent may always write to its own private namespace and to the
//!   quarantine review queue
//! - only the cross-validator and hygiene engine service roles write to
//!   the shared-validated namespace
//! - every agent may read the shared-validated namespace
//! - quarantine is readable only with the auditor capability
//!
//! Denial is a result, not an exception, and every denial is logged
//! with the requesting principal and target namespace.

#![warn(missing_docs)]

mod controller;

pub use controller::{AccessController, AccessDecision, Principal};
