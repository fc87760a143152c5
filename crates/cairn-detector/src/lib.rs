//! Cairn Contamination Detector
//!
//! Batch scans over the claim corpus that turn structural anomalies
//! into [`ContaminationEvent`](cairn_domain::ContaminationEvent)s:
//!
//! - **Unsupported confidence**: high confidence with no evidence or
//!   validation behind it; impossible past the gate, kept as an audit
//! - **Contradiction**: live shared claims on the same topic key with
//!   incompatible bodies
//! - **Stale use**: a claim cited after its expiry passed
//! - **Confidence drift**: a validated claim's confidence above what
//!   its validation records back
//!
//! The detector only reports; isolation and credibility consequences
//! belong to the quarantine manager. Scans are idempotent because a
//! claim with an open event of the same kind is not flagged again.

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod scan;
mod worker;

pub use config::DetectorConfig;
pub use error::DetectorError;
pub use metrics::ScanMetrics;
pub use scan::Detector;
pub use worker::DetectorWorker;
