//! Process-wide runtime configuration.
//!
//! Settings can be overridden through environment variables prefixed with
//! `ATTEST_`. Per-test [`TestOptions`](crate::TestOptions) are seeded from this
//! configuration and may override individual values.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::level::LevelFilter;
use crate::policy::PolicyFaultMode;

/// Default upper bound for a single plugin or callback invocation.
pub const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(10);

const LOG_LEVEL_VAR: &str = "ATTEST_LOG_LEVEL";
const POLICY_ENGINE_ENABLED_VAR: &str = "ATTEST_POLICY_ENGINE_ENABLED";
const HALT_ON_VERIFY_FAILURE_VAR: &str = "ATTEST_HALT_ON_VERIFY_FAILURE";
const PLUGIN_TIMEOUT_VAR: &str = "ATTEST_PLUGIN_TIMEOUT_MS";
const POLICY_FAULT_MODE_VAR: &str = "ATTEST_POLICY_FAULT_MODE";

/// Errors raised while resolving configuration or plugin options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A log level string did not name a known level.
    #[error(
        "unknown log level '{0}', expected one of: none, error, warn, step, info, debug, trace"
    )]
    InvalidLogLevel(String),
    /// A boolean setting could not be parsed.
    #[error("invalid value '{value}' for {key}, expected true/false, yes/no, on/off or 1/0")]
    InvalidBool {
        /// Name of the offending setting.
        key: &'static str,
        /// Raw value supplied.
        value: String,
    },
    /// A timeout was not a positive number of milliseconds.
    #[error("invalid timeout '{0}', expected a positive number of milliseconds")]
    InvalidTimeout(String),
    /// A policy fault mode string was not recognised.
    #[error("unknown policy fault mode '{0}', expected 'abstain' or 'deny'")]
    InvalidPolicyFaultMode(String),
    /// A plugin registration carried an option with an unusable value.
    #[error("plugin '{plugin}' has an invalid '{option}' option: {reason}")]
    InvalidPluginOption {
        /// Registered plugin name.
        plugin: String,
        /// Option key.
        option: String,
        /// Why the value was rejected.
        reason: String,
    },
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" | "Yes" | "on" | "ON" | "On" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" | "NO" | "No" | "off" | "OFF" | "Off" => {
            Some(false)
        }
        _ => None,
    }
}

fn bool_setting(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::InvalidBool {
        key,
        value: value.to_owned(),
    })
}

pub(crate) fn parse_timeout_ms(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidTimeout(value.to_owned())),
    }
}

/// Process-wide defaults for test execution.
///
/// # Environment Variables
///
/// - `ATTEST_LOG_LEVEL`: reporter threshold (`none`, `error`, `warn`, `step`,
///   `info`, `debug`, `trace`)
/// - `ATTEST_POLICY_ENGINE_ENABLED`: whether policy plugins are consulted
/// - `ATTEST_HALT_ON_VERIFY_FAILURE`: whether a failed verification aborts
///   the test body
/// - `ATTEST_PLUGIN_TIMEOUT_MS`: upper bound for each plugin call
/// - `ATTEST_POLICY_FAULT_MODE`: `abstain` or `deny`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Reporter threshold applied to leveled events.
    pub log_level: LevelFilter,
    /// Whether registered policy plugins gate execution.
    pub policy_engine_enabled: bool,
    /// Whether a failed verification aborts the remaining body.
    pub halt_on_verify_failure: bool,
    /// Upper bound for one plugin or lifecycle callback invocation.
    pub plugin_timeout: Duration,
    /// How a faulting policy plugin affects the vote.
    pub policy_fault_mode: PolicyFaultMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::default(),
            policy_engine_enabled: true,
            halt_on_verify_failure: true,
            plugin_timeout: DEFAULT_PLUGIN_TIMEOUT,
            policy_fault_mode: PolicyFaultMode::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from `ATTEST_*` environment variables.
    ///
    /// Missing variables fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a looked-up value is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use attest::{LevelFilter, RuntimeConfig};
    ///
    /// let config = RuntimeConfig::from_lookup(|key| {
    ///     (key == "ATTEST_LOG_LEVEL").then(|| "debug".to_string())
    /// })
    /// .unwrap();
    /// assert_eq!(config.log_level, LevelFilter::Debug);
    /// assert!(config.halt_on_verify_failure);
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(LOG_LEVEL_VAR) {
            config.log_level = value.parse()?;
        }
        if let Some(value) = lookup(POLICY_ENGINE_ENABLED_VAR) {
            config.policy_engine_enabled = bool_setting(POLICY_ENGINE_ENABLED_VAR, &value)?;
        }
        if let Some(value) = lookup(HALT_ON_VERIFY_FAILURE_VAR) {
            config.halt_on_verify_failure = bool_setting(HALT_ON_VERIFY_FAILURE_VAR, &value)?;
        }
        if let Some(value) = lookup(PLUGIN_TIMEOUT_VAR) {
            config.plugin_timeout = parse_timeout_ms(&value)?;
        }
        if let Some(value) = lookup(POLICY_FAULT_MODE_VAR) {
            config.policy_fault_mode = value.parse()?;
        }
        Ok(config)
    }

    /// Override the reporter threshold.
    #[must_use]
    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Enable or disable the policy engine.
    #[must_use]
    pub fn with_policy_engine_enabled(mut self, enabled: bool) -> Self {
        self.policy_engine_enabled = enabled;
        self
    }

    /// Choose whether failed verifications abort the body.
    #[must_use]
    pub fn with_halt_on_verify_failure(mut self, halt: bool) -> Self {
        self.halt_on_verify_failure = halt;
        self
    }

    /// Override the per-plugin call bound.
    #[must_use]
    pub fn with_plugin_timeout(mut self, timeout: Duration) -> Self {
        self.plugin_timeout = timeout;
        self
    }

    /// Override how faulting policy plugins are counted.
    #[must_use]
    pub fn with_policy_fault_mode(mut self, mode: PolicyFaultMode) -> Self {
        self.policy_fault_mode = mode;
        self
    }
}
