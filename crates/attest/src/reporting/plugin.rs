//! Contract implemented by reporting back ends.

use async_trait::async_trait;

use crate::isolation::PluginError;
use crate::reporting::ReportingEvent;

/// A sink for structured test events.
///
/// Implementations are invoked only through this trait. Each call runs on
/// its own task under the registry's plugin bound; an error, panic, or hang is
/// logged and never affects the test outcome or the remaining plugins.
///
/// `test_id` is `None` when the test description carried no ids.
#[async_trait]
pub trait ReportingPlugin: Send + Sync {
    /// Receives a leveled log or step event that passed the threshold.
    async fn log(&self, event: &ReportingEvent) -> Result<(), PluginError>;

    /// Receives a passed outcome.
    async fn on_pass(&self, test_id: Option<&str>) -> Result<(), PluginError>;

    /// Receives a failed outcome with its message.
    async fn on_fail(&self, test_id: Option<&str>, message: &str) -> Result<(), PluginError>;

    /// Receives a skipped outcome. Ignored unless overridden.
    async fn on_skip(&self, test_id: Option<&str>, reason: &str) -> Result<(), PluginError> {
        let _ = (test_id, reason);
        Ok(())
    }
}
