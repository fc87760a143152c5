//! Configuration for contamination scans

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the contamination detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// How often to run a scan (in minutes)
    /// Default: every 30 minutes
    pub scan_interval_minutes: u64,

    /// Slack allowed between a validated claim's confidence and the
    /// confidence its records back before drift is flagged
    /// Default: 1e-6
    #[serde(default = "default_drift_tolerance")]
    pub drift_tolerance: f64,
}

fn default_drift_tolerance() -> f64 {
    1e-6
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            scan_interval_minutes: 30,
            drift_tolerance: default_drift_tolerance(),
        }
    }
}

impl DetectorConfig {
    /// Get scan interval as Duration
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.scan_interval_minutes, 30);
        assert_eq!(config.scan_interval(), Duration::from_secs(1800));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = DetectorConfig::default();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: DetectorConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config.scan_interval_minutes, deserialized.scan_interval_minutes);
    }
}
