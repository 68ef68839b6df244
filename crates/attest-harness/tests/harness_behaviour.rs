//! Behavioural tests for the harness adapter contract.

use std::cell::Cell;
use std::time::Duration;

use attest::{EngineError, TestBody, TestOptions, TestOutcome, TestStatus};
use attest_harness::{HarnessAdapter, HarnessError, HostVerdict, TestRunRequest};
use rstest::{fixture, rstest};

/// Adapter that answers every request with canned outcomes, one per
/// bracketed id, without running the body.
struct CannedHarness {
    status: TestStatus,
    calls: Cell<u8>,
}

impl HarnessAdapter for CannedHarness {
    fn run(&self, request: TestRunRequest) -> Result<Vec<TestOutcome>, HarnessError> {
        self.calls.set(self.calls.get() + 1);
        if request.options().timeout_bound() == Some(Duration::ZERO) {
            return Err(EngineError::InvalidOptions("zero timeout".into()).into());
        }
        let message = (self.status != TestStatus::Passed).then(|| "canned".to_owned());
        Ok(attest::TestDescription::parse(request.description())
            .test_ids()
            .iter()
            .map(|id| TestOutcome::new(Some(id.clone()), self.status, message.clone(), Duration::ZERO))
            .collect())
    }
}

#[fixture]
fn body() -> TestBody {
    TestBody::new(|_| async { Ok(()) })
}

#[rstest]
#[case::pass(TestStatus::Passed, HostVerdict::Pass)]
#[case::fail(TestStatus::Failed, HostVerdict::Fail("C1: canned\nC2: canned".into()))]
#[case::skip(TestStatus::Skipped, HostVerdict::Skip("canned".into()))]
fn verdict_folds_adapter_outcomes(
    body: TestBody,
    #[case] status: TestStatus,
    #[case] expected: HostVerdict,
) {
    let harness = CannedHarness {
        status,
        calls: Cell::new(0),
    };
    let verdict = harness.verdict(TestRunRequest::new("[C1][C2] canned", body));
    assert!(matches!(verdict, Ok(ref found) if *found == expected));
    assert_eq!(harness.calls.get(), 1);
}

#[rstest]
fn verdict_propagates_engine_errors(body: TestBody) {
    let harness = CannedHarness {
        status: TestStatus::Passed,
        calls: Cell::new(0),
    };
    let request = TestRunRequest::new("[C1] bad options", body)
        .with_options(TestOptions::default().timeout(Duration::ZERO));
    let Err(err) = harness.verdict(request) else {
        panic!("zero timeout must be rejected");
    };
    assert!(matches!(err, HarnessError::Engine(EngineError::InvalidOptions(_))));
    assert_eq!(err.to_string(), "invalid test options: zero timeout");
}
