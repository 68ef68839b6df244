//! Terminal per-id results returned by the engine.

use std::time::Duration;

use serde::Serialize;

/// Final status of one test id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Every check for the id held.
    Passed,
    /// A verification failed, a failure was injected, or the body faulted.
    Failed,
    /// The body never ran to completion by design (policy denial or an
    /// explicit skip).
    Skipped,
}

impl TestStatus {
    /// Returns the lowercase label for the status.
    ///
    /// # Examples
    ///
    /// ```
    /// use attest::TestStatus;
    ///
    /// assert_eq!(TestStatus::Skipped.label(), "skipped");
    /// ```
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// What produced a failed outcome.
///
/// Adapters see the same outcome shape regardless of kind; the kind is kept
/// for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A `verify` check did not hold.
    Verification,
    /// The body called `fail`.
    Injected,
    /// The body returned an error or panicked.
    Body,
    /// The body exceeded its deadline.
    Timeout,
}

/// Outcome for a single test id, or for the untracked slot when the
/// description carried no ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOutcome {
    test_id: Option<String>,
    status: TestStatus,
    message: Option<String>,
    duration: Duration,
    failure_kind: Option<FailureKind>,
}

impl TestOutcome {
    /// Creates an outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use attest::{TestOutcome, TestStatus};
    /// use std::time::Duration;
    ///
    /// let outcome = TestOutcome::new(
    ///     Some("C1234".into()),
    ///     TestStatus::Passed,
    ///     None,
    ///     Duration::from_millis(12),
    /// );
    /// assert_eq!(outcome.test_id(), Some("C1234"));
    /// assert_eq!(outcome.duration_ms(), 12);
    /// ```
    #[must_use]
    pub fn new(
        test_id: Option<String>,
        status: TestStatus,
        message: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            test_id,
            status,
            message,
            duration,
            failure_kind: None,
        }
    }

    /// Attaches the diagnostic failure classification.
    #[must_use]
    pub fn with_failure_kind(mut self, kind: FailureKind) -> Self {
        self.failure_kind = Some(kind);
        self
    }

    /// The test id this outcome belongs to; `None` for an untracked test.
    #[must_use]
    pub fn test_id(&self) -> Option<&str> {
        self.test_id.as_deref()
    }

    /// Final status.
    #[must_use]
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Failure or skip message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Wall-clock time from the start of the run until the outcome resolved.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Duration in whole milliseconds, saturating at `u64::MAX`.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Diagnostic classification for failed outcomes.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure_kind
    }

    /// Shorthand for `status() == TestStatus::Failed`.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == TestStatus::Failed
    }
}
