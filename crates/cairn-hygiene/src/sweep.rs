//! The sweep cycle itself

use crate::{HygieneConfig, HygieneError, SweepMetrics};
use cairn_domain::traits::{ClaimQuery, ClaimStore, EvidenceStore};
use cairn_domain::{ArtifactId, ClaimState, Namespace};
use std::fmt::Display;

/// The Hygiene Engine sweeps the claim corpus on behalf of freshness
///
/// Expiry is archival, not deletion: an expired claim keeps its history
/// and evidence references, it just stops circulating. Claims in the
/// shared namespace are additionally evicted back to their originator's
/// private namespace so shared reads never serve stale knowledge.
pub struct HygieneEngine {
    config: HygieneConfig,
    metrics: SweepMetrics,
}

impl HygieneEngine {
    /// Create a hygiene engine with the given configuration
    pub fn new(config: HygieneConfig) -> Self {
        Self {
            config,
            metrics: SweepMetrics::new(),
        }
    }

    /// Accumulated metrics across all sweeps so far
    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }

    /// Reset the accumulated metrics
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Run one sweep cycle over the whole corpus at `now`
    ///
    /// Returns the counters for this cycle; the engine also accumulates
    /// them. Idempotent: a second sweep at the same instant is a no-op.
    pub fn sweep<S>(&mut self, store: &mut S, now: u64) -> Result<SweepMetrics, HygieneError>
    where
        S: ClaimStore + EvidenceStore,
        <S as ClaimStore>::Error: Display,
        <S as EvidenceStore>::Error: Display,
    {
        let mut cycle = SweepMetrics {
            sweep_count: 1,
            ..Default::default()
        };

        let claims =
            ClaimStore::query_claims(store, &ClaimQuery::default()).map_err(store_err)?;

        let near_expiry = self.config.near_expiry_window_secs();
        let citation_recency = self.config.citation_recency_secs();

        for claim in &claims {
            if claim.state.is_terminal() {
                continue;
            }

            if claim.is_expired_at(now) {
                let from_shared = claim.namespace == Namespace::Shared;
                if self.config.dry_run {
                    tracing::info!(claim = %claim.id, from_shared, "dry run: would expire");
                } else {
                    let mut updated = claim.clone();
                    let version = updated.version;
                    updated.state = ClaimState::Expired;
                    if from_shared {
                        updated.namespace = Namespace::Private(updated.agent.clone());
                    }
                    ClaimStore::update_claim(store, &updated, version).map_err(store_err)?;
                    tracing::debug!(claim = %claim.id, from_shared, "claim expired");
                }
                cycle.expired += 1;
                if from_shared {
                    cycle.expired_from_shared += 1;
                }
                continue;
            }

            // Near expiry and still in active use: ask for fresh
            // validation before the knowledge goes dark
            let nearing = matches!(claim.expires_at, Some(t) if t.saturating_sub(now) <= near_expiry);
            let active = matches!(
                claim.last_cited_at,
                Some(t) if now.saturating_sub(t) <= citation_recency
            );
            if claim.state.is_live() && nearing && active && !claim.revalidation_flagged {
                if self.config.dry_run {
                    tracing::info!(claim = %claim.id, "dry run: would flag for re-validation");
                } else {
                    let mut updated = claim.clone();
                    let version = updated.version;
                    updated.revalidation_flagged = true;
                    ClaimStore::update_claim(store, &updated, version).map_err(store_err)?;
                    tracing::debug!(claim = %claim.id, "flagged for re-validation");
                }
                cycle.flagged_for_revalidation += 1;
            }
        }

        if self.config.collect_evidence && !self.config.dry_run {
            // Quarantined claims keep their evidence for oversight;
            // only terminal claims release their references
            let live: Vec<ArtifactId> = ClaimStore::query_claims(store, &ClaimQuery::default())
                .map_err(store_err)?
                .into_iter()
                .filter(|c| !c.state.is_terminal())
                .flat_map(|c| c.evidence)
                .collect();
            cycle.artifacts_collected =
                EvidenceStore::collect_unreferenced(store, &live).map_err(store_err)?;
        }

        self.metrics.absorb(&cycle);
        tracing::info!(
            expired = cycle.expired,
            flagged = cycle.flagged_for_revalidation,
            collected = cycle.artifacts_collected,
            "sweep cycle completed"
        );
        Ok(cycle)
    }
}

fn store_err<E: Display>(e: E) -> HygieneError {
    HygieneError::Store(e.to_string())
}
