//! The request an adapter hands to a harness.

use std::sync::Arc;

use attest::{EngineError, PluginRegistry, TestBody, TestOptions, TestOutcome, run_test};

/// A harness execution request for one test.
///
/// # Examples
///
/// ```
/// use attest::{TestBody, TestOptions};
/// use attest_harness::TestRunRequest;
///
/// let request = TestRunRequest::new("[C1234] demo", TestBody::new(|_| async { Ok(()) }))
///     .with_options(TestOptions::default().halt_on_verify_failure(false));
/// assert_eq!(request.description(), "[C1234] demo");
/// assert!(!request.options().halts_on_verify_failure());
/// ```
#[derive(Debug)]
pub struct TestRunRequest {
    description: String,
    body: TestBody,
    options: TestOptions,
}

impl TestRunRequest {
    /// Creates a request with default options.
    #[must_use]
    pub fn new(description: impl Into<String>, body: TestBody) -> Self {
        Self {
            description: description.into(),
            body,
            options: TestOptions::default(),
        }
    }

    /// Replaces the request's options.
    #[must_use]
    pub fn with_options(mut self, options: TestOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the raw test description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the options the test will run with.
    #[must_use]
    pub fn options(&self) -> &TestOptions {
        &self.options
    }

    /// Consumes the request and returns description, body, and options.
    #[must_use]
    pub fn into_parts(self) -> (String, TestBody, TestOptions) {
        (self.description, self.body, self.options)
    }

    /// Runs the request through the engine on the current async runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the options are rejected.
    pub async fn execute(self, registry: Arc<PluginRegistry>) -> Result<Vec<TestOutcome>, EngineError> {
        run_test(registry, &self.description, self.body, self.options).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the run request.

    use super::TestRunRequest;
    use attest::{PluginRegistry, TestBody, TestOptions, TestStatus};
    use std::time::Duration;

    #[test]
    fn into_parts_returns_what_was_supplied() {
        let request = TestRunRequest::new("[C5] parts", TestBody::new(|_| async { Ok(()) }))
            .with_options(TestOptions::default().timeout(Duration::from_secs(3)));
        let (description, _body, options) = request.into_parts();
        assert_eq!(description, "[C5] parts");
        assert_eq!(options.timeout_bound(), Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn execute_runs_the_engine() {
        let Ok(registry) = PluginRegistry::builder().build() else {
            panic!("empty registry must build");
        };
        let request = TestRunRequest::new(
            "[C6] executes",
            TestBody::new(|handle| async move {
                handle.verify(&"a", &"a")?;
                Ok(())
            }),
        );
        let Ok(outcomes) = request.execute(registry).await else {
            panic!("default options must be accepted");
        };
        assert_eq!(outcomes.first().map(|o| o.status()), Some(TestStatus::Passed));
    }
}
