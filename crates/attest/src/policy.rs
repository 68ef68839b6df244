//! Execution gating through policy plugins.
//!
//! The policy engine asks every registered [`PolicyPlugin`] whether a test
//! should run and combines the answers with AND semantics. With the engine
//! disabled or no plugins registered it always approves, so a missing policy
//! integration never blocks execution.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ConfigError;
use crate::isolation::{PluginError, isolate};
use crate::registry::PluginRegistry;

/// A gate deciding whether tests carrying certain ids should execute.
#[async_trait]
pub trait PolicyPlugin: Send + Sync {
    /// Returns `true` to let the test run. `test_ids` is empty for an
    /// untracked test.
    async fn should_run(&self, test_ids: &[String]) -> Result<bool, PluginError>;
}

/// How a policy plugin that errors, panics, or times out affects the vote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolicyFaultMode {
    /// The faulting plugin has no opinion and is left out of the AND.
    #[default]
    Abstain,
    /// The fault counts as a veto.
    Deny,
}

impl FromStr for PolicyFaultMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abstain" => Ok(Self::Abstain),
            "deny" => Ok(Self::Deny),
            _ => Err(ConfigError::InvalidPolicyFaultMode(s.to_owned())),
        }
    }
}

/// Result of a policy check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The policy engine is disabled or has no plugins.
    Unrestricted,
    /// Every consulted plugin approved or abstained.
    Approved,
    /// A plugin vetoed execution.
    Denied {
        /// Name of the vetoing plugin.
        plugin: String,
    },
}

impl PolicyDecision {
    /// Whether the test may run.
    #[must_use]
    pub fn allows(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }
}

impl fmt::Display for PolicyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrestricted => f.write_str("no policy applies"),
            Self::Approved => f.write_str("approved by policy"),
            Self::Denied { plugin } => write!(f, "execution denied by policy plugin '{plugin}'"),
        }
    }
}

/// Combines policy plugin votes for one test.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    registry: Arc<PluginRegistry>,
    enabled: bool,
}

impl PolicyEngine {
    /// Creates a policy engine over `registry`'s policy plugins.
    #[must_use]
    pub fn new(registry: Arc<PluginRegistry>, enabled: bool) -> Self {
        Self { registry, enabled }
    }

    /// Returns whether a test carrying `test_ids` should execute.
    pub async fn should_run(&self, test_ids: &[String]) -> bool {
        self.decide(test_ids).await.allows()
    }

    /// Queries plugins in registration order, stopping at the first veto.
    pub async fn decide(&self, test_ids: &[String]) -> PolicyDecision {
        if !self.enabled || self.registry.policies().is_empty() {
            return PolicyDecision::Unrestricted;
        }
        let fault_mode = self.registry.policy_fault_mode();
        for registration in self.registry.policies() {
            let plugin = Arc::clone(registration.plugin());
            let ids = test_ids.to_vec();
            let vote = isolate(self.registry.plugin_timeout(), async move {
                plugin.should_run(&ids).await
            })
            .await;
            let approved = vote.unwrap_or_else(|fault| {
                log::warn!(
                    "policy plugin '{}' {fault} while checking {test_ids:?}; treating as {}",
                    registration.name(),
                    match fault_mode {
                        PolicyFaultMode::Abstain => "no opinion",
                        PolicyFaultMode::Deny => "a veto",
                    }
                );
                fault_mode == PolicyFaultMode::Abstain
            });
            if !approved {
                log::debug!(
                    "policy plugin '{}' denied {test_ids:?}",
                    registration.name()
                );
                return PolicyDecision::Denied {
                    plugin: registration.name().to_owned(),
                };
            }
        }
        PolicyDecision::Approved
    }
}
