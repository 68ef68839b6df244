//! Reporting plugin forwarding events to the `log` facade.

use async_trait::async_trait;

use crate::isolation::PluginError;
use crate::level::Level;
use crate::reporting::{ReportingEvent, ReportingPlugin};

const TARGET: &str = "attest::report";

/// Console channel: writes every event through whichever `log` backend the
/// host installed.
///
/// Steps are logged at `info` with their sequence number; passes at `info`,
/// skips at `warn`, and failures at `error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPlugin;

impl LogPlugin {
    /// Creates the plugin.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn log_level(level: Level) -> log::Level {
    match level {
        Level::Error => log::Level::Error,
        Level::Warn => log::Level::Warn,
        Level::Step | Level::Info => log::Level::Info,
        Level::Debug => log::Level::Debug,
        Level::Trace => log::Level::Trace,
    }
}

fn label(test_id: Option<&str>) -> &str {
    test_id.unwrap_or("untracked")
}

#[async_trait]
impl ReportingPlugin for LogPlugin {
    async fn log(&self, event: &ReportingEvent) -> Result<(), PluginError> {
        let step = event
            .sequence()
            .map(|sequence| format!("step {sequence}: "))
            .unwrap_or_default();
        log::log!(
            target: TARGET,
            log_level(event.level()),
            "[{}] {step}{}",
            event.test_description(),
            event.text()
        );
        Ok(())
    }

    async fn on_pass(&self, test_id: Option<&str>) -> Result<(), PluginError> {
        log::info!(target: TARGET, "PASS {}", label(test_id));
        Ok(())
    }

    async fn on_fail(&self, test_id: Option<&str>, message: &str) -> Result<(), PluginError> {
        log::error!(target: TARGET, "FAIL {}: {message}", label(test_id));
        Ok(())
    }

    async fn on_skip(&self, test_id: Option<&str>, reason: &str) -> Result<(), PluginError> {
        log::warn!(target: TARGET, "SKIP {}: {reason}", label(test_id));
        Ok(())
    }
}
