//! Harness adapter trait for test execution.

use attest::TestOutcome;

use crate::error::HarnessError;
use crate::runner::TestRunRequest;
use crate::verdict::HostVerdict;

/// Runs test requests inside a harness-specific environment.
///
/// Implementations own whatever runtime the engine needs and the plugin
/// registry the engine reports through.
pub trait HarnessAdapter {
    /// Executes one request and returns its per-id outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the engine rejects the request or the
    /// harness cannot start its runtime.
    fn run(&self, request: TestRunRequest) -> Result<Vec<TestOutcome>, HarnessError>;

    /// Executes one request and folds its outcomes into a [`HostVerdict`].
    ///
    /// # Errors
    ///
    /// See [`HarnessAdapter::run`].
    fn verdict(&self, request: TestRunRequest) -> Result<HostVerdict, HarnessError> {
        self.run(request)
            .map(|outcomes| HostVerdict::from_outcomes(&outcomes))
    }
}
