//! Configuration for hygiene sweeps

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the hygiene engine
///
/// # Examples
///
/// ```
/// use cairn_hygiene::HygieneConfig;
///
/// let config = HygieneConfig::default();
/// assert_eq!(config.sweep_interval_minutes, 60);
///
/// let config = HygieneConfig::aggressive();
/// assert_eq!(config.sweep_interval_minutes, 15);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HygieneConfig {
    /// How often to run the sweep cycle (in minutes)
    /// Default: every 60 minutes
    pub sweep_interval_minutes: u64,

    /// Window before expiry in which an actively cited claim is flagged
    /// for re-validation instead of being left to expire (in hours)
    /// Default: 24 hours
    pub near_expiry_window_hours: u64,

    /// How recent a citation must be to count as active use (in hours)
    /// Default: 48 hours
    pub citation_recency_hours: u64,

    /// Whether to collect evidence artifacts no live claim references
    /// Default: true
    #[serde(default = "default_collect_evidence")]
    pub collect_evidence: bool,

    /// Dry-run mode: log what a sweep would change without writing
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

fn default_collect_evidence() -> bool {
    true
}

impl Default for HygieneConfig {
    fn default() -> Self {
        Self {
            sweep_interval_minutes: 60,
            near_expiry_window_hours: 24,
            citation_recency_hours: 48,
            collect_evidence: true,
            dry_run: false,
        }
    }
}

impl HygieneConfig {
    /// Frequent sweeps with a wide re-validation window
    ///
    /// Suitable when the agent population writes fast and stale shared
    /// claims are expensive.
    pub fn aggressive() -> Self {
        Self {
            sweep_interval_minutes: 15,
            near_expiry_window_hours: 48,
            citation_recency_hours: 24,
            collect_evidence: true,
            dry_run: false,
        }
    }

    /// Infrequent sweeps with a narrow re-validation window
    pub fn lenient() -> Self {
        Self {
            sweep_interval_minutes: 240,
            near_expiry_window_hours: 12,
            citation_recency_hours: 96,
            collect_evidence: true,
            dry_run: false,
        }
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes * 60)
    }

    /// Near-expiry window in seconds
    pub fn near_expiry_window_secs(&self) -> u64 {
        self.near_expiry_window_hours * 3600
    }

    /// Citation recency window in seconds
    pub fn citation_recency_secs(&self) -> u64 {
        self.citation_recency_hours * 3600
    }
}
