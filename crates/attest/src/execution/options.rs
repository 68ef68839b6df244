//! Per-test execution options.

use std::time::Duration;

use crate::config::RuntimeConfig;
use crate::events::{EventDispatcher, LifecycleEvent};
use crate::execution::EngineError;
use crate::isolation::PluginError;
use crate::level::LevelFilter;

/// Options governing one test invocation.
///
/// Defaults match [`RuntimeConfig::default`]: halt on the first failed
/// verification, `info` threshold, policy engine enabled, no deadline.
///
/// # Examples
///
/// ```
/// use attest::{LevelFilter, TestOptions};
/// use std::time::Duration;
///
/// let options = TestOptions::default()
///     .halt_on_verify_failure(false)
///     .log_level(LevelFilter::Debug)
///     .timeout(Duration::from_secs(30));
/// assert!(!options.halts_on_verify_failure());
/// assert_eq!(options.timeout_bound(), Some(Duration::from_secs(30)));
/// ```
#[derive(Clone, Debug)]
pub struct TestOptions {
    halt_on_verify_failure: bool,
    log_level: LevelFilter,
    events: EventDispatcher,
    policy_engine_enabled: bool,
    timeout: Option<Duration>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

impl TestOptions {
    /// Seeds options from process-wide configuration.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            halt_on_verify_failure: config.halt_on_verify_failure,
            log_level: config.log_level,
            events: EventDispatcher::new(),
            policy_engine_enabled: config.policy_engine_enabled,
            timeout: None,
        }
    }

    /// Sets whether a failed verification aborts the body.
    #[must_use]
    pub fn halt_on_verify_failure(mut self, halt: bool) -> Self {
        self.halt_on_verify_failure = halt;
        self
    }

    /// Sets the reporter threshold.
    #[must_use]
    pub fn log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Enables or disables policy gating.
    #[must_use]
    pub fn policy_engine_enabled(mut self, enabled: bool) -> Self {
        self.policy_engine_enabled = enabled;
        self
    }

    /// Bounds the body's run time.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the lifecycle callbacks.
    #[must_use]
    pub fn events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Appends a synchronous lifecycle callback.
    #[must_use]
    pub fn on_event<F>(mut self, event: LifecycleEvent, callback: F) -> Self
    where
        F: Fn() -> Result<(), PluginError> + Send + Sync + 'static,
    {
        self.events.register_sync(event, callback);
        self
    }

    /// Whether a failed verification aborts the body.
    #[must_use]
    pub fn halts_on_verify_failure(&self) -> bool {
        self.halt_on_verify_failure
    }

    /// Reporter threshold for the test.
    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level
    }

    /// Whether policy plugins are consulted.
    #[must_use]
    pub fn policy_enabled(&self) -> bool {
        self.policy_engine_enabled
    }

    /// Deadline for the body, if any.
    #[must_use]
    pub fn timeout_bound(&self) -> Option<Duration> {
        self.timeout
    }

    /// Lifecycle callbacks.
    #[must_use]
    pub fn event_dispatcher(&self) -> &EventDispatcher {
        &self.events
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(EngineError::InvalidOptions(
                "timeout must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}
