//! Plugin registrations shared by every engine instance.
//!
//! The registry is assembled once at startup through [`PluginRegistryBuilder`]
//! and then shared read-only behind an [`Arc`]. No mutation API exists after
//! [`PluginRegistryBuilder::build`], so concurrent engines can read it without
//! locking.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::config::{ConfigError, DEFAULT_PLUGIN_TIMEOUT, RuntimeConfig};
use crate::level::LevelFilter;
use crate::policy::{PolicyFaultMode, PolicyPlugin};
use crate::reporting::ReportingPlugin;

/// Option key overriding the reporter threshold for one plugin.
pub const LOG_LEVEL_OPTION: &str = "logLevel";

/// A plugin instance together with its name and resolved options.
pub struct PluginRegistration<P: ?Sized> {
    name: String,
    options: Map<String, Value>,
    level_override: Option<LevelFilter>,
    plugin: Arc<P>,
}

/// Registration of a reporting plugin.
pub type ReporterRegistration = PluginRegistration<dyn ReportingPlugin>;

/// Registration of a policy plugin.
pub type PolicyRegistration = PluginRegistration<dyn PolicyPlugin>;

impl<P: ?Sized> PluginRegistration<P> {
    /// Registers `plugin` under `name` with no options.
    #[must_use]
    pub fn new(name: impl Into<String>, plugin: Arc<P>) -> Self {
        Self {
            name: name.into(),
            options: Map::new(),
            level_override: None,
            plugin,
        }
    }

    /// Attaches host-resolved options such as `outputDir` or `logLevel`.
    #[must_use]
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Name the plugin was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options supplied with the registration.
    #[must_use]
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Per-plugin threshold parsed from the `logLevel` option.
    #[must_use]
    pub fn level_override(&self) -> Option<LevelFilter> {
        self.level_override
    }

    /// The plugin instance.
    #[must_use]
    pub fn plugin(&self) -> &Arc<P> {
        &self.plugin
    }

    fn resolve(mut self) -> Result<Self, ConfigError> {
        self.level_override = match self.options.get(LOG_LEVEL_OPTION) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => {
                Some(raw.parse().map_err(|err: ConfigError| self.option_error(err.to_string()))?)
            }
            Some(other) => {
                return Err(self.option_error(format!("expected a string, found {other}")));
            }
        };
        Ok(self)
    }

    fn option_error(&self, reason: String) -> ConfigError {
        ConfigError::InvalidPluginOption {
            plugin: self.name.clone(),
            option: LOG_LEVEL_OPTION.to_owned(),
            reason,
        }
    }
}

impl<P: ?Sized> fmt::Debug for PluginRegistration<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistration")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("level_override", &self.level_override)
            .finish_non_exhaustive()
    }
}

/// Read-only set of reporting and policy plugins.
#[derive(Debug)]
pub struct PluginRegistry {
    reporters: Vec<ReporterRegistration>,
    policies: Vec<PolicyRegistration>,
    plugin_timeout: Duration,
    policy_fault_mode: PolicyFaultMode,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self {
            reporters: Vec::new(),
            policies: Vec::new(),
            plugin_timeout: DEFAULT_PLUGIN_TIMEOUT,
            policy_fault_mode: PolicyFaultMode::default(),
        }
    }
}

impl PluginRegistry {
    /// Starts assembling a registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use attest::{LogPlugin, PluginRegistry, ReporterRegistration};
    /// use std::sync::Arc;
    ///
    /// let registry = PluginRegistry::builder()
    ///     .reporter(ReporterRegistration::new("console", Arc::new(LogPlugin::new())))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(registry.reporters().len(), 1);
    /// assert!(registry.policies().is_empty());
    /// ```
    #[must_use]
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::default()
    }

    /// Reporting plugins in registration order.
    #[must_use]
    pub fn reporters(&self) -> &[ReporterRegistration] {
        &self.reporters
    }

    /// Policy plugins in registration order.
    #[must_use]
    pub fn policies(&self) -> &[PolicyRegistration] {
        &self.policies
    }

    /// Upper bound for each plugin or callback invocation.
    #[must_use]
    pub fn plugin_timeout(&self) -> Duration {
        self.plugin_timeout
    }

    /// How a faulting policy plugin counts in the vote.
    #[must_use]
    pub fn policy_fault_mode(&self) -> PolicyFaultMode {
        self.policy_fault_mode
    }
}

/// Collects registrations before freezing them into a [`PluginRegistry`].
#[derive(Debug, Default)]
pub struct PluginRegistryBuilder {
    registry: PluginRegistry,
}

impl PluginRegistryBuilder {
    /// Copies the plugin bound and policy fault mode from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &RuntimeConfig) -> Self {
        self.registry.plugin_timeout = config.plugin_timeout;
        self.registry.policy_fault_mode = config.policy_fault_mode;
        self
    }

    /// Appends a reporting plugin.
    #[must_use]
    pub fn reporter(mut self, registration: ReporterRegistration) -> Self {
        self.registry.reporters.push(registration);
        self
    }

    /// Appends a policy plugin.
    #[must_use]
    pub fn policy(mut self, registration: PolicyRegistration) -> Self {
        self.registry.policies.push(registration);
        self
    }

    /// Overrides the per-invocation bound.
    #[must_use]
    pub fn plugin_timeout(mut self, timeout: Duration) -> Self {
        self.registry.plugin_timeout = timeout;
        self
    }

    /// Overrides the policy fault mode.
    #[must_use]
    pub fn policy_fault_mode(mut self, mode: PolicyFaultMode) -> Self {
        self.registry.policy_fault_mode = mode;
        self
    }

    /// Validates every registration and freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] for a zero plugin bound and
    /// [`ConfigError::InvalidPluginOption`] when a `logLevel` option cannot be
    /// parsed.
    pub fn build(self) -> Result<Arc<PluginRegistry>, ConfigError> {
        let PluginRegistry {
            reporters,
            policies,
            plugin_timeout,
            policy_fault_mode,
        } = self.registry;
        if plugin_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("0".to_owned()));
        }
        let reporters = reporters
            .into_iter()
            .map(PluginRegistration::resolve)
            .collect::<Result<_, _>>()?;
        let policies = policies
            .into_iter()
            .map(PluginRegistration::resolve)
            .collect::<Result<_, _>>()?;
        Ok(Arc::new(PluginRegistry {
            reporters,
            policies,
            plugin_timeout,
            policy_fault_mode,
        }))
    }
}
