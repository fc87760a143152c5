//! Policy document consumed by the gate and cross-validator
//!
//! Expiration durations and quorum strength vary by claim category and
//! are deliberately configuration, never conditionals in code.

use cairn_domain::QuorumRule;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Policy for one claim category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    /// How long a claim of this category stays fresh (seconds)
    pub expire_after_secs: u64,

    /// Whether claims of this category must pass cross-validation
    /// before reaching the shared namespace
    #[serde(default)]
    pub requires_cross_validation: bool,

    /// Quorum requirement when cross-validation runs
    #[serde(default = "default_quorum")]
    pub quorum: QuorumRule,
}

fn default_quorum() -> QuorumRule {
    QuorumRule::AtLeast(1)
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            // One week, the general-claim baseline
            expire_after_secs: 7 * 86400,
            requires_cross_validation: false,
            quorum: default_quorum(),
        }
    }
}

/// The full policy document
///
/// Loaded from TOML; all values are hot-reloadable through
/// [`SharedPolicy::reload_from_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Cross-validation round timeout (seconds)
    #[serde(default = "default_timeout")]
    pub validation_timeout_secs: u64,

    /// Credibility decay window (seconds of inactivity until a score
    /// reads as neutral)
    #[serde(default = "default_decay_window")]
    pub credibility_decay_window_secs: u64,

    /// Fallback policy for categories without an explicit entry
    #[serde(default)]
    pub default_category: CategoryPolicy,

    /// Per-category policies, keyed by category name
    #[serde(default)]
    pub categories: HashMap<String, CategoryPolicy>,
}

fn default_timeout() -> u64 {
    300
}

fn default_decay_window() -> u64 {
    30 * 86400
}

impl Default for GatePolicy {
    /// Baseline policy table:
    ///
    /// - `system-capability`: 7 days, cross-validation required, all
    ///   assigned validators must agree
    /// - `api-functionality`: 7 days
    /// - `library-version`: 3 days
    /// - `research-finding`: 30 days
    fn default() -> Self {
        let mut categories = HashMap::new();
        categories.insert(
            "system-capability".to_string(),
            CategoryPolicy {
                expire_after_secs: 7 * 86400,
                requires_cross_validation: true,
                quorum: QuorumRule::All,
            },
        );
        categories.insert(
            "api-functionality".to_string(),
            CategoryPolicy {
                expire_after_secs: 7 * 86400,
                ..Default::default()
            },
        );
        categories.insert(
            "library-version".to_string(),
            CategoryPolicy {
                expire_after_secs: 3 * 86400,
                ..Default::default()
            },
        );
        categories.insert(
            "research-finding".to_string(),
            CategoryPolicy {
                expire_after_secs: 30 * 86400,
                ..Default::default()
            },
        );

        Self {
            validation_timeout_secs: default_timeout(),
            credibility_decay_window_secs: default_decay_window(),
            default_category: CategoryPolicy::default(),
            categories,
        }
    }
}

impl GatePolicy {
    /// Load a policy document from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read policy: {}", e))?;
        toml::from_str(&contents).map_err(|e| format!("Failed to parse policy TOML: {}", e))
    }

    /// Policy for a category, falling back to the default entry
    pub fn category(&self, name: &str) -> &CategoryPolicy {
        self.categories.get(name).unwrap_or(&self.default_category)
    }

    /// Cross-validation timeout as a Duration
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    /// Wrap into a hot-reloadable handle
    pub fn into_shared(self) -> SharedPolicy {
        SharedPolicy(Arc::new(RwLock::new(self)))
    }
}

/// Hot-reloadable policy handle shared across components
///
/// Readers take a cheap read lock per decision; a reload swaps the
/// document in place without restarting anything.
#[derive(Debug, Clone)]
pub struct SharedPolicy(Arc<RwLock<GatePolicy>>);

impl SharedPolicy {
    /// Read the current policy through a closure
    pub fn read<T>(&self, f: impl FnOnce(&GatePolicy) -> T) -> T {
        // Lock poisoning only happens if a reader panicked; recover the data
        let guard = self.0.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Replace the current policy document
    pub fn replace(&self, policy: GatePolicy) {
        let mut guard = self.0.write().unwrap_or_else(|e| e.into_inner());
        *guard = policy;
    }

    /// Reload the policy from a TOML file without a restart
    pub fn reload_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let policy = GatePolicy::from_file(path)?;
        tracing::info!("policy document reloaded");
        self.replace(policy);
        Ok(())
    }
}
