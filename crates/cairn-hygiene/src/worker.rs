//! Background worker for continuous hygiene operation

use crate::{HygieneConfig, HygieneEngine, HygieneError, SweepMetrics};
use cairn_domain::traits::{ClaimStore, EvidenceStore};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{interval, Duration};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Background worker that runs hygiene sweeps on a schedule
///
/// # Examples
///
/// ```no_run
/// use cairn_hygiene::{HygieneConfig, HygieneWorker};
/// use cairn_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut store = SqliteStore::new("cairn.db")?;
///     let mut worker = HygieneWorker::new(HygieneConfig::default());
///
///     // Run until Ctrl+C
///     worker.run(&mut store).await?;
///     Ok(())
/// }
/// ```
pub struct HygieneWorker {
    engine: HygieneEngine,
    interval: Duration,
}

impl HygieneWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: HygieneConfig) -> Self {
        let interval = config.sweep_interval();
        Self {
            engine: HygieneEngine::new(config),
            interval,
        }
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// A failed sweep is logged and the worker keeps its schedule; a
    /// transient store error must not stop hygiene for good.
    pub async fn run<S>(&mut self, store: &mut S) -> Result<(), HygieneError>
    where
        S: ClaimStore + EvidenceStore,
        <S as ClaimStore>::Error: std::fmt::Display,
        <S as EvidenceStore>::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!("Hygiene worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.engine.sweep(store, unix_now()) {
                        Ok(cycle) => {
                            tracing::info!(
                                "Sweep completed: {} expired, {} flagged, {} artifacts collected",
                                cycle.expired,
                                cycle.flagged_for_revalidation,
                                cycle.artifacts_collected
                            );
                        }
                        Err(e) => {
                            tracing::error!("Sweep failed: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping hygiene worker");
                    break;
                }
            }
        }

        tracing::info!("Hygiene worker stopped. Final metrics:\n{}", self.engine.metrics().summary());
        Ok(())
    }

    /// Run for a specific number of cycles (useful for testing)
    pub async fn run_cycles<S>(&mut self, store: &mut S, cycles: usize) -> Result<(), HygieneError>
    where
        S: ClaimStore + EvidenceStore,
        <S as ClaimStore>::Error: std::fmt::Display,
        <S as EvidenceStore>::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);

        for cycle in 0..cycles {
            ticker.tick().await;
            self.engine.sweep(store, unix_now())?;
            tracing::debug!("Completed sweep cycle {}/{}", cycle + 1, cycles);
        }
        Ok(())
    }

    /// Accumulated metrics so far
    pub fn metrics(&self) -> &SweepMetrics {
        self.engine.metrics()
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&mut self) {
        self.engine.reset_metrics();
    }
}
