//! The per-test execution state machine.
//!
//! One [`TestExecutionEngine`] drives one test through
//! `Pending -> PolicyCheck -> {Skipped | Running} -> {Completed | Aborted} ->
//! Reported -> Done` and returns one [`TestOutcome`] per test id.
//!
//! # Key Components
//!
//! - [`TestBody`]: the async closure under test.
//! - [`TestHandle`]: what the body uses to verify, fail, skip, and report.
//! - [`TestAbort`]: the early-exit signal a body returns.
//! - [`TestOptions`]: per-test knobs seeded from [`RuntimeConfig`](crate::RuntimeConfig).

mod abort;
mod body;
mod error;
mod handle;
mod options;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinError;

use crate::description::TestDescription;
use crate::events::LifecycleEvent;
use crate::outcome::{FailureKind, TestOutcome, TestStatus};
use crate::panic::panic_message;
use crate::policy::PolicyEngine;
use crate::registry::PluginRegistry;
use crate::reporting::Reporter;

pub use abort::TestAbort;
pub use body::{BodyFuture, TestBody};
pub use error::EngineError;
pub use handle::TestHandle;
pub use options::TestOptions;

use handle::{Failure, Ledger};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Pending,
    PolicyCheck,
    Skipped,
    Running,
    Completed,
    Aborted,
    Reported,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::PolicyCheck => "policy-check",
            Self::Skipped => "skipped",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Reported => "reported",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// How the body phase ended.
#[derive(Debug)]
enum Resolution {
    Skipped(String),
    Completed,
    Aborted(Failure),
}

/// Runs a single test body under policy, verification, and reporting
/// control.
///
/// An engine is consumed by [`TestExecutionEngine::run`]; create one per
/// test. Engines share nothing but the read-only [`PluginRegistry`], so any
/// number may run concurrently.
///
/// # Examples
///
/// ```
/// use attest::{PluginRegistry, TestBody, TestExecutionEngine, TestOptions, TestStatus};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let registry = PluginRegistry::builder().build().unwrap();
/// let engine = TestExecutionEngine::new(registry, "[C1234] demo", TestOptions::default());
/// let outcomes = engine
///     .run(TestBody::new(|handle| async move {
///         handle.verify(&[1, 2, 3], &[1, 2, 3])?;
///         Ok(())
///     }))
///     .await
///     .unwrap();
/// assert_eq!(outcomes.len(), 1);
/// assert_eq!(outcomes[0].test_id(), Some("C1234"));
/// assert_eq!(outcomes[0].status(), TestStatus::Passed);
/// # });
/// ```
pub struct TestExecutionEngine {
    registry: Arc<PluginRegistry>,
    description: TestDescription,
    options: TestOptions,
    phase: Phase,
}

impl TestExecutionEngine {
    /// Prepares an engine for one test.
    #[must_use]
    pub fn new(
        registry: Arc<PluginRegistry>,
        description: impl Into<TestDescription>,
        options: TestOptions,
    ) -> Self {
        Self {
            registry,
            description: description.into(),
            options,
            phase: Phase::Pending,
        }
    }

    /// The parsed description of the test.
    #[must_use]
    pub fn description(&self) -> &TestDescription {
        &self.description
    }

    /// Runs `body` to a set of outcomes, one per unique test id or a single
    /// untracked outcome.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidOptions`] when the options cannot be
    /// honoured. Every failure inside the body resolves to an outcome instead.
    pub async fn run(mut self, body: TestBody) -> Result<Vec<TestOutcome>, EngineError> {
        self.options.validate()?;
        let started = Instant::now();
        let reporter = Arc::new(Reporter::new(
            Arc::clone(&self.registry),
            &self.description,
            self.options.level_filter(),
        ));
        let handle = TestHandle::new(
            Arc::clone(&reporter),
            self.description.clone(),
            self.options.halts_on_verify_failure(),
        );

        self.enter(Phase::PolicyCheck);
        let policy = PolicyEngine::new(Arc::clone(&self.registry), self.options.policy_enabled());
        let decision = policy.decide(self.description.test_ids()).await;
        let resolution = if decision.allows() {
            self.enter(Phase::Running);
            let resolution = self.run_body(body, &handle).await;
            self.enter(match resolution {
                Resolution::Completed => Phase::Completed,
                Resolution::Aborted(_) => Phase::Aborted,
                Resolution::Skipped(_) => Phase::Skipped,
            });
            resolution
        } else {
            self.enter(Phase::Skipped);
            log::debug!("'{}' not run: {decision}", self.description);
            Resolution::Skipped(decision.to_string())
        };
        // An abandoned body may still hold the handle; nothing it reports
        // from here on reaches the plugins.
        reporter.seal().await;

        let ledger = handle.take_ledger();
        log::debug!(
            "'{}' resolved after {} verification(s): {resolution:?}",
            self.description,
            ledger.verifications.len()
        );
        let outcomes = resolve(&handle.slots(), &resolution, &ledger, started.elapsed());

        report(&reporter, &outcomes).await;
        self.enter(Phase::Reported);
        self.fire_events(&reporter, &outcomes).await;
        self.enter(Phase::Done);
        Ok(outcomes)
    }

    async fn run_body(&self, body: TestBody, handle: &TestHandle) -> Resolution {
        let mut task = tokio::spawn(body.start(handle.clone()));
        let joined = match self.options.timeout_bound() {
            Some(limit) => {
                let Ok(joined) = tokio::time::timeout(limit, &mut task).await else {
                    task.abort();
                    return Resolution::Aborted(Failure::new(
                        format!("test timed out after {} ms", limit.as_millis()),
                        FailureKind::Timeout,
                    ));
                };
                joined
            }
            None => (&mut task).await,
        };
        // A halt recorded by the handle wins even when the body swallowed the
        // abort it returned.
        if let Some(halt) = handle.take_halt() {
            return Resolution::Aborted(halt);
        }
        match joined {
            Ok(Ok(())) => Resolution::Completed,
            Ok(Err(abort)) => from_abort(abort),
            Err(join) => Resolution::Aborted(body_fault(join)),
        }
    }

    async fn fire_events(&self, reporter: &Reporter, outcomes: &[TestOutcome]) {
        let events = self.options.event_dispatcher();
        let timeout = self.registry.plugin_timeout();
        if outcomes.iter().any(TestOutcome::is_failed) {
            events.dispatch(LifecycleEvent::Fail, reporter, timeout).await;
        }
        if outcomes
            .iter()
            .any(|outcome| outcome.status() == TestStatus::Skipped)
        {
            events.dispatch(LifecycleEvent::Skip, reporter, timeout).await;
        }
        events.dispatch(LifecycleEvent::Done, reporter, timeout).await;
    }

    fn enter(&mut self, next: Phase) {
        log::trace!("'{}': {} -> {next}", self.description, self.phase);
        self.phase = next;
    }
}

impl fmt::Debug for TestExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestExecutionEngine")
            .field("description", &self.description)
            .field("options", &self.options)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Convenience entry point for adapters: builds an engine and runs `body`.
///
/// # Errors
///
/// See [`TestExecutionEngine::run`].
pub async fn run_test(
    registry: Arc<PluginRegistry>,
    description: &str,
    body: TestBody,
    options: TestOptions,
) -> Result<Vec<TestOutcome>, EngineError> {
    TestExecutionEngine::new(registry, description, options)
        .run(body)
        .await
}

async fn report(reporter: &Reporter, outcomes: &[TestOutcome]) {
    for outcome in outcomes {
        let message = outcome.message().unwrap_or_default();
        match outcome.status() {
            TestStatus::Passed => reporter.pass(outcome.test_id()).await,
            TestStatus::Failed => reporter.fail(outcome.test_id(), message).await,
            TestStatus::Skipped => reporter.skip(outcome.test_id(), message).await,
        }
    }
}

fn from_abort(abort: TestAbort) -> Resolution {
    let kind = match &abort {
        TestAbort::Skip { reason } => return Resolution::Skipped(reason.clone()),
        TestAbort::Verification(_) => FailureKind::Verification,
        TestAbort::Failure { .. } => FailureKind::Injected,
        TestAbort::Body(_) => FailureKind::Body,
    };
    Resolution::Aborted(Failure::new(abort.message(), kind))
}

fn body_fault(join: JoinError) -> Failure {
    let message = join.try_into_panic().map_or_else(
        |_| "test body was cancelled".to_owned(),
        |payload| format!("test body panicked: {}", panic_message(payload.as_ref())),
    );
    Failure::new(message, FailureKind::Body)
}

/// Turns the body's resolution into one outcome per slot.
///
/// A skipped test still reports failures the body recorded before it asked
/// to be skipped.
fn resolve(
    slots: &[Option<String>],
    resolution: &Resolution,
    ledger: &Ledger,
    elapsed: Duration,
) -> Vec<TestOutcome> {
    slots
        .iter()
        .map(|slot| {
            let failure = match resolution {
                Resolution::Aborted(failure) => Some(failure),
                Resolution::Completed | Resolution::Skipped(_) => ledger.failures.get(slot),
            };
            if let Some(failure) = failure {
                return TestOutcome::new(
                    slot.clone(),
                    TestStatus::Failed,
                    Some(failure.message.clone()),
                    elapsed,
                )
                .with_failure_kind(failure.kind);
            }
            match resolution {
                Resolution::Skipped(reason) => {
                    TestOutcome::new(slot.clone(), TestStatus::Skipped, Some(reason.clone()), elapsed)
                }
                Resolution::Completed | Resolution::Aborted(_) => {
                    TestOutcome::new(slot.clone(), TestStatus::Passed, None, elapsed)
                }
            }
        })
        .collect()
}
