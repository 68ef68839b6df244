//! The handle a running test body talks to.

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::description::TestDescription;
use crate::execution::TestAbort;
use crate::matcher::Matcher;
use crate::outcome::FailureKind;
use crate::reporting::Reporter;
use crate::verification::VerificationResult;

/// A failure message together with its classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) message: String,
    pub(crate) kind: FailureKind,
}

impl Failure {
    pub(crate) fn new(message: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

/// Everything the body recorded while running.
///
/// `failures` is keyed by outcome slot: a test id, or `None` for the
/// untracked slot. A later failure for the same slot replaces the earlier
/// one. `halt` keeps only the first halting failure.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    pub(crate) failures: HashMap<Option<String>, Failure>,
    pub(crate) halt: Option<Failure>,
    pub(crate) verifications: Vec<VerificationResult>,
}

impl Ledger {
    fn record_halt(&mut self, failure: Failure) {
        if self.halt.is_none() {
            self.halt = Some(failure);
        }
    }
}

struct HandleInner {
    reporter: Arc<Reporter>,
    description: TestDescription,
    halt_on_verify_failure: bool,
    ledger: Mutex<Ledger>,
}

/// Capabilities exposed to a running test body.
///
/// Cloning is cheap; every clone records into the same test.
#[derive(Clone)]
pub struct TestHandle {
    inner: Arc<HandleInner>,
}

impl TestHandle {
    pub(crate) fn new(
        reporter: Arc<Reporter>,
        description: TestDescription,
        halt_on_verify_failure: bool,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                reporter,
                description,
                halt_on_verify_failure,
                ledger: Mutex::new(Ledger::default()),
            }),
        }
    }

    /// Checks `actual` for deep equality with `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`TestAbort::Verification`] when the check fails and halting
    /// is enabled, and [`TestAbort::Body`] when either value cannot be
    /// serialised. With halting disabled a failed check is recorded and the
    /// result returned.
    pub fn verify<A, E>(&self, actual: &A, expected: &E) -> Result<VerificationResult, TestAbort>
    where
        A: Serialize + ?Sized,
        E: Serialize + ?Sized,
    {
        let expected = self.snapshot(expected)?;
        self.verify_that(actual, &Matcher::Equaling(expected))
    }

    /// Checks `actual` against an arbitrary [`Matcher`].
    ///
    /// # Errors
    ///
    /// Same as [`TestHandle::verify`].
    pub fn verify_that<A>(&self, actual: &A, matcher: &Matcher) -> Result<VerificationResult, TestAbort>
    where
        A: Serialize + ?Sized,
    {
        let actual = self.snapshot(actual)?;
        let result = matcher.evaluate(actual);
        let mut ledger = self.ledger();
        ledger.verifications.push(result.clone());
        let Some(message) = result.message().filter(|_| !result.passed()) else {
            return Ok(result);
        };
        let failure = Failure::new(message, FailureKind::Verification);
        log::debug!(
            "verification failed in '{}': {message}",
            self.inner.description
        );
        if self.inner.halt_on_verify_failure {
            ledger.record_halt(failure);
            return Err(TestAbort::Verification(result));
        }
        for slot in self.slots() {
            ledger.failures.insert(slot, failure.clone());
        }
        Ok(result)
    }

    /// Injects a failure without running a check.
    ///
    /// With `test_id` set only that id fails, unless halting is enabled, in
    /// which case the body must stop and every id fails.
    ///
    /// # Errors
    ///
    /// Returns [`TestAbort::Failure`] when halting is enabled and
    /// [`TestAbort::Body`] when `test_id` is not part of the description.
    pub fn fail(&self, message: impl Into<String>, test_id: Option<&str>) -> Result<(), TestAbort> {
        let message = message.into();
        if let Some(id) = test_id.filter(|id| !self.inner.description.contains(id)) {
            let abort = TestAbort::body(format!(
                "fail() named test id '{id}' which is not in '{}'",
                self.inner.description
            ));
            self.ledger()
                .record_halt(Failure::new(abort.message(), FailureKind::Body));
            return Err(abort);
        }
        let failure = Failure::new(message.clone(), FailureKind::Injected);
        let mut ledger = self.ledger();
        if self.inner.halt_on_verify_failure {
            ledger.record_halt(failure);
            return Err(TestAbort::Failure {
                message,
                test_id: test_id.map(str::to_owned),
            });
        }
        let slots = test_id.map_or_else(|| self.slots(), |id| vec![Some(id.to_owned())]);
        for slot in slots {
            ledger.failures.insert(slot, failure.clone());
        }
        Ok(())
    }

    /// Builds the signal that skips the rest of the test.
    ///
    /// Return it from the body: `return Err(handle.skip("needs staging"));`.
    #[must_use]
    pub fn skip(&self, reason: impl Into<String>) -> TestAbort {
        TestAbort::Skip {
            reason: reason.into(),
        }
    }

    /// Emits a numbered step event and returns its sequence number.
    pub async fn step(&self, text: impl Into<String>) -> u32 {
        self.inner.reporter.step(text).await
    }

    /// The reporter serving this test.
    #[must_use]
    pub fn reporter(&self) -> &Reporter {
        &self.inner.reporter
    }

    /// The parsed description of the running test.
    #[must_use]
    pub fn description(&self) -> &TestDescription {
        &self.inner.description
    }

    /// Ids the test reports against.
    #[must_use]
    pub fn test_ids(&self) -> &[String] {
        self.inner.description.test_ids()
    }

    /// Number of checks performed so far.
    #[must_use]
    pub fn verification_count(&self) -> usize {
        self.ledger().verifications.len()
    }

    pub(crate) fn slots(&self) -> Vec<Option<String>> {
        let ids = self.inner.description.test_ids();
        if ids.is_empty() {
            return vec![None];
        }
        ids.iter().cloned().map(Some).collect()
    }

    pub(crate) fn take_halt(&self) -> Option<Failure> {
        self.ledger().halt.take()
    }

    pub(crate) fn take_ledger(&self) -> Ledger {
        mem::take(&mut *self.ledger())
    }

    fn snapshot<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, TestAbort> {
        serde_json::to_value(value).map_err(|err| {
            let abort = TestAbort::body(format!("could not snapshot a verified value: {err}"));
            self.ledger()
                .record_halt(Failure::new(abort.message(), FailureKind::Body));
            abort
        })
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.inner.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestHandle")
            .field("description", &self.inner.description)
            .field("halt_on_verify_failure", &self.inner.halt_on_verify_failure)
            .finish_non_exhaustive()
    }
}
