//! Cairn Hygiene Engine
//!
//! Periodic sweeps that keep the shared corpus fresh:
//!
//! - claims past their expiry leave the shared namespace and become
//!   `Expired` (archived, never deleted)
//! - claims nearing expiry while still actively cited are flagged for
//!   re-validation instead of silently going stale
//! - evidence artifacts referenced by no live claim are collected
//!
//! Sweeps are idempotent; running twice over the same corpus changes
//! nothing the second time. The [`HygieneWorker`] runs sweeps on a
//! schedule until shutdown.

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod sweep;
mod worker;

pub use config::HygieneConfig;
pub use error::HygieneError;
pub use metrics::SweepMetrics;
pub use sweep::HygieneEngine;
pub use worker::HygieneWorker;
