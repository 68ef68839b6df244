//! Mapping engine outcomes onto a host runner's verdict.

use std::fmt;

use attest::{TestOutcome, TestStatus};

/// The single signal a host test runner understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostVerdict {
    /// Every id passed, or some passed and the rest were skipped.
    Pass,
    /// At least one id failed. Carries one line per failed id.
    Fail(String),
    /// Every id was skipped.
    Skip(String),
}

impl HostVerdict {
    /// Folds per-id outcomes into one verdict.
    ///
    /// # Examples
    ///
    /// ```
    /// use attest::{TestOutcome, TestStatus};
    /// use attest_harness::HostVerdict;
    /// use std::time::Duration;
    ///
    /// let outcomes = [
    ///     TestOutcome::new(Some("C2345".into()), TestStatus::Failed, Some("oops".into()), Duration::ZERO),
    ///     TestOutcome::new(Some("C3344".into()), TestStatus::Passed, None, Duration::ZERO),
    /// ];
    /// assert_eq!(
    ///     HostVerdict::from_outcomes(&outcomes),
    ///     HostVerdict::Fail("C2345: oops".into())
    /// );
    /// ```
    #[must_use]
    pub fn from_outcomes(outcomes: &[TestOutcome]) -> Self {
        let failures: Vec<String> = outcomes
            .iter()
            .filter(|outcome| outcome.is_failed())
            .map(|outcome| {
                let message = outcome.message().unwrap_or("failed");
                outcome
                    .test_id()
                    .map_or_else(|| message.to_owned(), |id| format!("{id}: {message}"))
            })
            .collect();
        if !failures.is_empty() {
            return Self::Fail(failures.join("\n"));
        }
        let all_skipped = !outcomes.is_empty()
            && outcomes
                .iter()
                .all(|outcome| outcome.status() == TestStatus::Skipped);
        if all_skipped {
            let reason = outcomes
                .iter()
                .find_map(TestOutcome::message)
                .unwrap_or("skipped");
            return Self::Skip(reason.to_owned());
        }
        Self::Pass
    }

    /// Applies the verdict the way libtest expects: failures panic.
    ///
    /// libtest has no skipped state, so a skip returns normally.
    ///
    /// # Panics
    ///
    /// Panics with the failure text for [`HostVerdict::Fail`].
    pub fn enforce(self) {
        if let Self::Fail(message) = self {
            panic!("{message}");
        }
    }

    /// Returns `true` for [`HostVerdict::Fail`].
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

impl fmt::Display for HostVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("passed"),
            Self::Fail(message) => write!(f, "failed: {message}"),
            Self::Skip(reason) => write!(f, "skipped: {reason}"),
        }
    }
}
