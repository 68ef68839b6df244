//! Tokio current-thread harness adapter for test execution.

use std::sync::Arc;

use attest::{PluginRegistry, TestOutcome};
use attest_harness::{HarnessAdapter, HarnessError, TestRunRequest};

/// Executes test requests inside a Tokio current-thread runtime.
///
/// `TokioHarness` builds a new single-threaded runtime with all drivers
/// enabled per request and blocks on the engine. Bodies can therefore use
/// `tokio::time`, `tokio::spawn`, and `tokio::runtime::Handle::current()`.
/// Plugin isolation spawns tasks on the same runtime, so a plugin that blocks
/// the thread instead of awaiting stalls the whole test. Synchronous bodies
/// built with [`TestBody::from_fn`](attest::TestBody::from_fn) run on the
/// blocking pool instead, so their timeout still fires.
///
/// # Examples
///
/// ```
/// use attest::{PluginRegistry, TestBody, TestStatus};
/// use attest_harness::{HarnessAdapter, HostVerdict, TestRunRequest};
/// use attest_harness_tokio::TokioHarness;
///
/// let harness = TokioHarness::new(PluginRegistry::builder().build().unwrap());
/// let request = TestRunRequest::new(
///     "[C1234] demo",
///     TestBody::new(|handle| async move {
///         handle.verify(&(2 + 2), &4)?;
///         Ok(())
///     }),
/// );
/// assert_eq!(harness.verdict(request).unwrap(), HostVerdict::Pass);
/// ```
#[derive(Debug, Clone)]
pub struct TokioHarness {
    registry: Arc<PluginRegistry>,
}

impl TokioHarness {
    /// Creates a harness reporting through `registry`.
    #[must_use]
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    /// The registry shared by every request.
    #[must_use]
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }
}

impl HarnessAdapter for TokioHarness {
    fn run(&self, request: TestRunRequest) -> Result<Vec<TestOutcome>, HarnessError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        log::trace!("running '{}' on a current-thread runtime", request.description());
        let outcomes = runtime.block_on(request.execute(Arc::clone(&self.registry)));
        // A timed-out blocking body may still occupy a pool thread; do not
        // wait for it.
        runtime.shutdown_background();
        outcomes.map_err(HarnessError::from)
    }
}
