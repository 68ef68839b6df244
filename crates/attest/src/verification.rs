//! Outcome of a single `verify` call.

use serde::Serialize;
use serde_json::Value;

/// Immutable record of one actual-versus-expected check.
///
/// `actual` and `expected` are JSON snapshots taken when the check ran; for
/// predicate matchers `expected` describes the matcher rather than a value.
///
/// # Examples
///
/// ```
/// use attest::{Matcher, evaluate};
/// use serde_json::json;
///
/// let result = evaluate(json!(2), &Matcher::equaling(1));
/// assert!(!result.passed());
/// assert_eq!(result.expected(), &json!(1));
/// assert_eq!(result.message(), Some("expected 2 to equal 1"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerificationResult {
    passed: bool,
    message: Option<String>,
    actual: Value,
    expected: Value,
}

impl VerificationResult {
    pub(crate) fn passed_with(actual: Value, expected: Value) -> Self {
        Self {
            passed: true,
            message: None,
            actual,
            expected,
        }
    }

    pub(crate) fn failed_with(actual: Value, expected: Value, message: String) -> Self {
        Self {
            passed: false,
            message: Some(message),
            actual,
            expected,
        }
    }

    /// Whether the check held.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Human-readable mismatch description; `None` when the check passed.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Snapshot of the value under test.
    #[must_use]
    pub fn actual(&self) -> &Value {
        &self.actual
    }

    /// Snapshot of the expectation.
    #[must_use]
    pub fn expected(&self) -> &Value {
        &self.expected
    }
}
