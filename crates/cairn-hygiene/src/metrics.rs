//! Metrics collected during hygiene sweeps

/// Counters for one sweep cycle, or accumulated across cycles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Claims moved to `Expired`
    pub expired: usize,

    /// Of the expired claims, how many were evicted from shared
    pub expired_from_shared: usize,

    /// Claims flagged for re-validation (near expiry, actively cited)
    pub flagged_for_revalidation: usize,

    /// Evidence artifacts collected
    pub artifacts_collected: usize,

    /// Sweep cycles completed
    pub sweep_count: usize,
}

impl SweepMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another cycle's counters into this accumulator
    pub fn absorb(&mut self, other: &SweepMetrics) {
        self.expired += other.expired;
        self.expired_from_shared += other.expired_from_shared;
        self.flagged_for_revalidation += other.flagged_for_revalidation;
        self.artifacts_collected += other.artifacts_collected;
        self.sweep_count += other.sweep_count;
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        format!(
            "Hygiene Metrics Summary\n\
             =======================\n\
             Sweep cycles: {}\n\
             Claims expired: {} ({} evicted from shared)\n\
             Flagged for re-validation: {}\n\
             Artifacts collected: {}",
            self.sweep_count,
            self.expired,
            self.expired_from_shared,
            self.flagged_for_revalidation,
            self.artifacts_collected,
        )
    }
}
