//! Metrics collected during contamination scans

use cairn_domain::ContaminationKind;
use std::collections::HashMap;

/// Counters for one scan, or accumulated across scans
#[derive(Debug, Clone, Default)]
pub struct ScanMetrics {
    /// New events raised, per contamination kind
    pub raised: HashMap<ContaminationKind, usize>,

    /// Claims examined
    pub claims_scanned: usize,

    /// Scan cycles completed
    pub scan_count: usize,
}

impl ScanMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one raised event
    pub fn record(&mut self, kind: ContaminationKind) {
        *self.raised.entry(kind).or_insert(0) += 1;
    }

    /// Total events raised across all kinds
    pub fn total_raised(&self) -> usize {
        self.raised.values().sum()
    }

    /// Events raised for one kind
    pub fn raised_for(&self, kind: ContaminationKind) -> usize {
        self.raised.get(&kind).copied().unwrap_or(0)
    }

    /// Fold another scan's counters into this accumulator
    pub fn absorb(&mut self, other: &ScanMetrics) {
        for (kind, count) in &other.raised {
            *self.raised.entry(*kind).or_insert(0) += count;
        }
        self.claims_scanned += other.claims_scanned;
        self.scan_count += other.scan_count;
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        self.raised.clear();
        self.claims_scanned = 0;
        self.scan_count = 0;
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Detector Metrics Summary".to_string(),
            "========================".to_string(),
            format!("Scan cycles: {}", self.scan_count),
            format!("Claims scanned: {}", self.claims_scanned),
            format!("Events raised: {}", self.total_raised()),
        ];
        for (kind, count) in &self.raised {
            lines.push(format!("  {}: {}", kind.as_str(), count));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_totals() {
        let mut metrics = ScanMetrics::new();
        metrics.record(ContaminationKind::Contradiction);
        metrics.record(ContaminationKind::Contradiction);
        metrics.record(ContaminationKind::StaleUse);

        assert_eq!(metrics.raised_for(ContaminationKind::Contradiction), 2);
        assert_eq!(metrics.raised_for(ContaminationKind::StaleUse), 1);
        assert_eq!(metrics.raised_for(ContaminationKind::ConfidenceDrift), 0);
        assert_eq!(metrics.total_raised(), 3);
    }

    #[test]
    fn test_absorb_and_reset() {
        let mut total = ScanMetrics::new();
        let mut cycle = ScanMetrics::new();
        cycle.record(ContaminationKind::StaleUse);
        cycle.claims_scanned = 10;
        cycle.scan_count = 1;

        total.absorb(&cycle);
        total.absorb(&cycle);
        assert_eq!(total.total_raised(), 2);
        assert_eq!(total.claims_scanned, 20);
        assert_eq!(total.scan_count, 2);

        total.reset();
        assert_eq!(total.total_raised(), 0);
        assert_eq!(total.scan_count, 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = ScanMetrics::new();
        metrics.record(ContaminationKind::Contradiction);
        metrics.scan_count = 1;
        metrics.claims_scanned = 5;

        let summary = metrics.summary();
        assert!(summary.contains("Scan cycles: 1"));
        assert!(summary.contains("contradiction: 1"));
    }
}
