//! Background worker for continuous detection

use crate::{Detector, DetectorConfig, DetectorError, ScanMetrics};
use cairn_domain::traits::{ClaimStore, EventStore, ValidationStore};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{interval, Duration};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Background worker that runs contamination scans on a schedule
pub struct DetectorWorker {
    detector: Detector,
    interval: Duration,
}

impl DetectorWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: DetectorConfig) -> Self {
        let interval = config.scan_interval();
        Self {
            detector: Detector::new(config),
            interval,
        }
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    pub async fn run<S>(&mut self, store: &mut S) -> Result<(), DetectorError>
    where
        S: ClaimStore + ValidationStore + EventStore,
        <S as ClaimStore>::Error: std::fmt::Display,
        <S as ValidationStore>::Error: std::fmt::Display,
        <S as EventStore>::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!("Detector worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.detector.scan(store, unix_now()) {
                        Ok(cycle) => {
                            tracing::info!(
                                "Scan completed: {} claims, {} events raised",
                                cycle.claims_scanned,
                                cycle.total_raised()
                            );
                        }
                        Err(e) => {
                            tracing::error!("Scan failed: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping detector");
                    break;
                }
            }
        }

        tracing::info!("Detector stopped. Final metrics:\n{}", self.detector.metrics().summary());
        Ok(())
    }

    /// Run for a specific number of cycles (useful for testing)
    pub async fn run_cycles<S>(&mut self, store: &mut S, cycles: usize) -> Result<(), DetectorError>
    where
        S: ClaimStore + ValidationStore + EventStore,
        <S as ClaimStore>::Error: std::fmt::Display,
        <S as ValidationStore>::Error: std::fmt::Display,
        <S as EventStore>::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);

        for cycle in 0..cycles {
            ticker.tick().await;
            self.detector.scan(store, unix_now())?;
            tracing::debug!("Completed scan cycle {}/{}", cycle + 1, cycles);
        }
        Ok(())
    }

    /// Accumulated metrics so far
    pub fn metrics(&self) -> &ScanMetrics {
        self.detector.metrics()
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&mut self) {
        self.detector.reset_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_domain::traits::ClaimStore;
    use cairn_domain::{AgentId, Claim, ClaimState, ContaminationKind, Namespace, Payload};
    use cairn_store::MemoryStore;

    #[tokio::test]
    async fn test_worker_creation() {
        let worker = DetectorWorker::new(DetectorConfig::default());
        assert_eq!(worker.metrics().scan_count, 0);
    }

    #[tokio::test]
    async fn test_run_cycles() {
        let mut store = MemoryStore::new();
        for body in ["paginated", "removed"] {
            let mut claim = Claim::new(
                AgentId::new("scout-7").unwrap(),
                Payload::new("api-functionality", "search/v2", body),
                0.6,
                0,
            );
            claim.namespace = Namespace::Shared;
            claim.state = ClaimState::EmpiricalValidated;
            ClaimStore::insert_claim(&mut store, &claim).unwrap();
        }

        let mut worker = DetectorWorker::new(DetectorConfig {
            scan_interval_minutes: 1,
            ..Default::default()
        });
        worker.run_cycles(&mut store, 2).await.unwrap();

        assert_eq!(worker.metrics().scan_count, 2);
        // Both claims flagged once; the second cycle raised nothing new
        assert_eq!(
            worker.metrics().raised_for(ContaminationKind::Contradiction),
            2
        );
    }
}
