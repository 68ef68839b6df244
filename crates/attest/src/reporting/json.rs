//! JSON writer for test outcomes.
//!
//! The schema keeps status labels in lowercase so downstream tools can rely on
//! consistent casing.

use std::io::Write;

use serde::Serialize;

use crate::outcome::{FailureKind, TestOutcome, TestStatus};

#[derive(Serialize)]
struct JsonReport<'a> {
    outcomes: Vec<JsonOutcome<'a>>,
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    test_id: Option<&'a str>,
    status: TestStatus,
    message: Option<&'a str>,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_kind: Option<FailureKind>,
}

impl<'a> From<&'a [TestOutcome]> for JsonReport<'a> {
    fn from(outcomes: &'a [TestOutcome]) -> Self {
        Self {
            outcomes: outcomes.iter().map(JsonOutcome::from).collect(),
        }
    }
}

impl<'a> From<&'a TestOutcome> for JsonOutcome<'a> {
    fn from(outcome: &'a TestOutcome) -> Self {
        Self {
            test_id: outcome.test_id(),
            status: outcome.status(),
            message: outcome.message(),
            duration_ms: outcome.duration_ms(),
            failure_kind: outcome.failure_kind(),
        }
    }
}

/// Serialize `outcomes` into `writer`.
///
/// # Examples
/// ```rust
/// use attest::reporting::json;
/// use attest::{TestOutcome, TestStatus};
/// use std::time::Duration;
///
/// let outcomes = vec![TestOutcome::new(
///     Some("C1".into()),
///     TestStatus::Passed,
///     None,
///     Duration::from_millis(3),
/// )];
/// let mut buffer = Vec::new();
/// json::write(&mut buffer, &outcomes).unwrap();
/// let output = String::from_utf8(buffer).unwrap();
/// assert!(output.contains("\"status\":\"passed\""));
/// ```
///
/// # Errors
/// Returns an error when serialization or the underlying write fails.
pub fn write<W: Write>(writer: &mut W, outcomes: &[TestOutcome]) -> serde_json::Result<()> {
    serde_json::to_writer(writer, &JsonReport::from(outcomes))
}

/// Produce a JSON string for `outcomes`.
///
/// # Errors
/// Returns an error when serialization fails.
pub fn to_string(outcomes: &[TestOutcome]) -> serde_json::Result<String> {
    serde_json::to_string(&JsonReport::from(outcomes))
}
