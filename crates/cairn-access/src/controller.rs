//! Namespace scope checks

use cairn_domain::{AgentId, Namespace};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Who is asking for access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role", content = "id")]
pub enum Principal {
    /// An ordinary agent, identified by its id
    Agent(AgentId),

    /// The cross-validator service (promotes claims into shared)
    CrossValidator,

    /// The hygiene engine service (expires claims out of shared)
    HygieneEngine,

    /// A human or supervising-agent operator using the oversight API
    Operator(String),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Agent(id) => write!(f, "agent:{}", id),
            Principal::CrossValidator => write!(f, "service:cross-validator"),
            Principal::HygieneEngine => write!(f, "service:hygiene-engine"),
            Principal::Operator(id) => write!(f, "operator:{}", id),
        }
    }
}

/// Outcome of a scope check
///
/// Denial carries the reason for the audit log; it is an ordinary
/// value, never an error or a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access granted
    Allow,

    /// Access refused
    Deny {
        /// Why the request was refused
        reason: String,
    },
}

impl AccessDecision {
    /// Whether access was granted
    pub fn is_allow(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    fn deny(reason: impl Into<String>) -> Self {
        AccessDecision::Deny {
            reason: reason.into(),
        }
    }
}

/// Enforces namespace scopes for every read and write
#[derive(Debug, Clone, Default)]
pub struct AccessController {
    /// Agents granted the auditor capability (may read quarantine)
    auditors: HashSet<AgentId>,
}

impl AccessController {
    /// Create a controller with no auditor grants
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller with an initial set of auditor grants
    pub fn with_auditors(auditors: impl IntoIterator<Item = AgentId>) -> Self {
        Self {
            auditors: auditors.into_iter().collect(),
        }
    }

    /// Grant the auditor capability to an agent
    pub fn grant_auditor(&mut self, agent: AgentId) {
        self.auditors.insert(agent);
    }

    /// Revoke the auditor capability
    pub fn revoke_auditor(&mut self, agent: &AgentId) {
        self.auditors.remove(agent);
    }

    /// Whether an agent holds the auditor capability
    pub fn is_auditor(&self, agent: &AgentId) -> bool {
        self.auditors.contains(agent)
    }

    /// Check whether `principal` may write into `namespace`
    pub fn check_write(&self, principal: &Principal, namespace: &Namespace) -> AccessDecision {
        let decision = match (principal, namespace) {
            // Service roles move claims through shared and private spaces
            (Principal::CrossValidator | Principal::HygieneEngine, _) => AccessDecision::Allow,

            // Agents own their private namespace
            (Principal::Agent(agent), Namespace::Private(owner)) if agent == owner => {
                AccessDecision::Allow
            }
            (Principal::Agent(_), Namespace::Private(_)) => {
                AccessDecision::deny("private namespace belongs to another agent")
            }

            // The quarantine review queue accepts submissions from anyone
            (Principal::Agent(_) | Principal::Operator(_), Namespace::Quarantine) => {
                AccessDecision::Allow
            }

            // Shared truth is written only through promotion
            (Principal::Agent(_), Namespace::Shared) => AccessDecision::deny(
                "shared namespace is written only by the cross-validator and hygiene engine",
            ),
            (Principal::Operator(_), _) => {
                AccessDecision::deny("operators write only to the quarantine queue")
            }
        };

        if let AccessDecision::Deny { reason } = &decision {
            tracing::warn!(
                principal = %principal,
                namespace = %namespace,
                reason = %reason,
                "write denied"
            );
        }
        decision
    }

    /// Check whether `principal` may read from `namespace`
    pub fn check_read(&self, principal: &Principal, namespace: &Namespace) -> AccessDecision {
        let decision = match (principal, namespace) {
            (Principal::CrossValidator | Principal::HygieneEngine | Principal::Operator(_), _) => {
                AccessDecision::Allow
            }

            // Everyone reads shared
            (Principal::Agent(_), Namespace::Shared) => AccessDecision::Allow,

            (Principal::Agent(agent), Namespace::Private(owner)) => {
                if agent == owner {
                    AccessDecision::Allow
                } else {
                    AccessDecision::deny("private namespace belongs to another agent")
                }
            }

            (Principal::Agent(agent), Namespace::Quarantine) => {
                if self.is_auditor(agent) {
                    AccessDecision::Allow
                } else {
                    AccessDecision::deny("quarantine reads require the auditor capability")
                }
            }
        };

        if let AccessDecision::Deny { reason } = &decision {
            tracing::warn!(
                principal = %principal,
                namespace = %namespace,
                reason = %reason,
                "read denied"
            );
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> AgentId {
        AgentId::new(name).unwrap()
    }

    #[test]
    fn test_agent_writes_own_private() {
        let controller = AccessController::new();
        let scout = Principal::Agent(agent("scout-7"));
        assert!(controller
            .check_write(&scout, &Namespace::Private(agent("scout-7")))
            .is_allow());
    }

    #[test]
    fn test_agent_cannot_write_others_private() {
        let controller = AccessController::new();
        let scout = Principal::Agent(agent("scout-7"));
        assert!(!controller
            .check_write(&scout, &Namespace::Private(agent("scout-8")))
            .is_allow());
    }

    #[test]
    fn test_agent_cannot_write_shared() {
        let controller = AccessController::new();
        let scout = Principal::Agent(agent("scout-7"));
        assert!(!controller.check_write(&scout, &Namespace::Shared).is_allow());
    }

    #[test]
    fn test_agent_writes_quarantine_queue() {
        let controller = AccessController::new();
        let scout = Principal::Agent(agent("scout-7"));
        assert!(controller
            .check_write(&scout, &Namespace::Quarantine)
            .is_allow());
    }

    #[test]
    fn test_services_write_shared() {
        let controller = AccessController::new();
        assert!(controller
            .check_write(&Principal::CrossValidator, &Namespace::Shared)
            .is_allow());
        assert!(controller
            .check_write(&Principal::HygieneEngine, &Namespace::Shared)
            .is_allow());
    }

    #[test]
    fn test_everyone_reads_shared() {
        let controller = AccessController::new();
        assert!(controller
            .check_read(&Principal::Agent(agent("scout-7")), &Namespace::Shared)
            .is_allow());
    }

    #[test]
    fn test_quarantine_reads_need_auditor() {
        let mut controller = AccessController::new();
        let scout = Principal::Agent(agent("scout-7"));

        assert!(!controller.check_read(&scout, &Namespace::Quarantine).is_allow());

        controller.grant_auditor(agent("scout-7"));
        assert!(controller.check_read(&scout, &Namespace::Quarantine).is_allow());

        controller.revoke_auditor(&agent("scout-7"));
        assert!(!controller.check_read(&scout, &Namespace::Quarantine).is_allow());
    }

    #[test]
    fn test_operator_reads_everywhere_writes_only_quarantine() {
        let controller = AccessController::new();
        let op = Principal::Operator("overseer".to_string());

        assert!(controller.check_read(&op, &Namespace::Quarantine).is_allow());
        assert!(controller
            .check_read(&op, &Namespace::Private(agent("scout-7")))
            .is_allow());
        assert!(controller.check_write(&op, &Namespace::Quarantine).is_allow());
        assert!(!controller.check_write(&op, &Namespace::Shared).is_allow());
    }

    #[test]
    fn test_agent_cannot_read_others_private() {
        let controller = AccessController::new();
        let scout = Principal::Agent(agent("scout-7"));
        assert!(!controller
            .check_read(&scout, &Namespace::Private(agent("scout-8")))
            .is_allow());
        assert!(controller
            .check_read(&scout, &Namespace::Private(agent("scout-7")))
            .is_allow());
    }
}
