//! Behavioural tests for the test execution engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use attest::test_support::{FaultyPlugin, Recorded, RecordingPlugin, StaticPolicy};
use attest::{
    EngineError, FailureKind, LifecycleEvent, Matcher, PluginRegistry, PolicyFaultMode,
    PolicyPlugin, PolicyRegistration, ReporterRegistration, ReportingPlugin, TestBody,
    TestExecutionEngine, TestOptions, TestOutcome, TestStatus, run_test,
};
use rstest::{fixture, rstest};

struct Harness {
    registry: Arc<PluginRegistry>,
    recorder: Arc<RecordingPlugin>,
}

impl Harness {
    fn with(policies: Vec<PolicyRegistration>, faulty_reporters: bool) -> Self {
        let recorder = Arc::new(RecordingPlugin::new());
        let mut builder = PluginRegistry::builder()
            .plugin_timeout(Duration::from_millis(200))
            .policy_fault_mode(PolicyFaultMode::Abstain);
        if faulty_reporters {
            builder = builder
                .reporter(ReporterRegistration::new("erroring", Arc::new(FaultyPlugin::erroring())))
                .reporter(ReporterRegistration::new("panicking", Arc::new(FaultyPlugin::panicking())));
        }
        builder = builder.reporter(ReporterRegistration::new(
            "recorder",
            Arc::clone(&recorder) as Arc<dyn ReportingPlugin>,
        ));
        for policy in policies {
            builder = builder.policy(policy);
        }
        let Ok(registry) = builder.build() else {
            panic!("test registry must build");
        };
        Self { registry, recorder }
    }

    async fn run(&self, description: &str, options: TestOptions, body: TestBody) -> Vec<TestOutcome> {
        match run_test(Arc::clone(&self.registry), description, body, options).await {
            Ok(outcomes) => outcomes,
            Err(err) => panic!("run_test rejected valid options: {err}"),
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::with(Vec::new(), false)
}

fn summary(outcomes: &[TestOutcome]) -> Vec<(Option<&str>, TestStatus, Option<&str>)> {
    outcomes
        .iter()
        .map(|outcome| (outcome.test_id(), outcome.status(), outcome.message()))
        .collect()
}

fn passing_body() -> TestBody {
    TestBody::new(|_handle| async { Ok(()) })
}

#[rstest]
#[case::single("[C1234] demo", vec![Some("C1234")])]
#[case::several("[C2] a [C1] b", vec![Some("C2"), Some("C1")])]
#[case::duplicates("[C7] twice [C7]", vec![Some("C7")])]
#[case::untracked("no ids at all", vec![None])]
#[tokio::test]
async fn outcome_ids_match_parsed_ids(
    harness: Harness,
    #[case] description: &str,
    #[case] expected: Vec<Option<&str>>,
) {
    let outcomes = harness
        .run(description, TestOptions::default(), passing_body())
        .await;
    let ids: Vec<_> = outcomes.iter().map(TestOutcome::test_id).collect();
    assert_eq!(ids, expected);
}

#[rstest]
#[tokio::test]
async fn passing_scenario_reports_pass(harness: Harness) {
    let outcomes = harness
        .run(
            "[C1234] demo",
            TestOptions::default(),
            TestBody::new(|handle| async move {
                handle.verify(&"ok", &"ok")?;
                Ok(())
            }),
        )
        .await;
    assert_eq!(summary(&outcomes), [(Some("C1234"), TestStatus::Passed, None)]);
    assert_eq!(harness.recorder.verdicts(), [Recorded::Pass(Some("C1234".into()))]);
}

#[rstest]
#[tokio::test]
async fn policy_denial_skips_without_running_body() {
    let deny = Arc::new(StaticPolicy::deny());
    let harness = Harness::with(
        vec![
            PolicyRegistration::new("allow", Arc::new(StaticPolicy::allow())),
            PolicyRegistration::new("jira", Arc::clone(&deny) as Arc<dyn PolicyPlugin>),
        ],
        false,
    );
    let ran = Arc::new(AtomicBool::new(false));
    let sentinel = Arc::clone(&ran);
    let outcomes = harness
        .run(
            "[C1][C2] gated",
            TestOptions::default(),
            TestBody::from_fn(move |_handle| {
                sentinel.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await;
    assert!(!ran.load(Ordering::SeqCst));
    assert!(outcomes.iter().all(|outcome| outcome.status() == TestStatus::Skipped));
    assert_eq!(
        outcomes.first().and_then(TestOutcome::message),
        Some("execution denied by policy plugin 'jira'")
    );
    assert_eq!(deny.queries(), [vec!["C1".to_owned(), "C2".to_owned()]]);
    assert_eq!(harness.recorder.verdicts().len(), 2);
}

#[rstest]
#[tokio::test]
async fn disabled_policy_engine_runs_denied_tests() {
    let harness = Harness::with(
        vec![PolicyRegistration::new("jira", Arc::new(StaticPolicy::deny()))],
        false,
    );
    let outcomes = harness
        .run(
            "[C1] ungated",
            TestOptions::default().policy_engine_enabled(false),
            passing_body(),
        )
        .await;
    assert_eq!(summary(&outcomes), [(Some("C1"), TestStatus::Passed, None)]);
}

#[rstest]
#[tokio::test]
async fn no_policy_plugins_means_the_test_runs(harness: Harness) {
    let ran = Arc::new(AtomicBool::new(false));
    let sentinel = Arc::clone(&ran);
    harness
        .run(
            "[C1] open",
            TestOptions::default().policy_engine_enabled(true),
            TestBody::from_fn(move |_handle| {
                sentinel.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await;
    assert!(ran.load(Ordering::SeqCst));
}

#[rstest]
#[tokio::test]
async fn faulting_policy_plugin_does_not_veto() {
    let harness = Harness::with(
        vec![PolicyRegistration::new("broken", Arc::new(FaultyPlugin::erroring()))],
        false,
    );
    let outcomes = harness.run("[C1] x", TestOptions::default(), passing_body()).await;
    assert_eq!(summary(&outcomes), [(Some("C1"), TestStatus::Passed, None)]);
}

#[rstest]
#[tokio::test]
async fn halting_verify_stops_the_body(harness: Harness) {
    let reached = Arc::new(AtomicBool::new(false));
    let sentinel = Arc::clone(&reached);
    let outcomes = harness
        .run(
            "[C1][C2] strict",
            TestOptions::default(),
            TestBody::new(move |handle| async move {
                handle.verify(&1, &2)?;
                sentinel.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await;
    assert!(!reached.load(Ordering::SeqCst));
    assert_eq!(
        summary(&outcomes),
        [
            (Some("C1"), TestStatus::Failed, Some("expected 1 to equal 2")),
            (Some("C2"), TestStatus::Failed, Some("expected 1 to equal 2")),
        ]
    );
    assert!(
        outcomes
            .iter()
            .all(|outcome| outcome.failure_kind() == Some(FailureKind::Verification))
    );
}

#[rstest]
#[tokio::test]
async fn swallowed_halt_still_fails_the_test(harness: Harness) {
    let outcomes = harness
        .run(
            "[C1] stubborn",
            TestOptions::default(),
            TestBody::new(|handle| async move {
                let _ignored = handle.verify(&1, &2);
                Ok(())
            }),
        )
        .await;
    assert_eq!(
        summary(&outcomes),
        [(Some("C1"), TestStatus::Failed, Some("expected 1 to equal 2"))]
    );
}

#[rstest]
#[tokio::test]
async fn lenient_verify_continues_and_last_failure_wins(harness: Harness) {
    let reached = Arc::new(AtomicBool::new(false));
    let sentinel = Arc::clone(&reached);
    let outcomes = harness
        .run(
            "[C1] lenient",
            TestOptions::default().halt_on_verify_failure(false),
            TestBody::new(move |handle| async move {
                let first = handle.verify(&1, &2)?;
                assert!(!first.passed());
                sentinel.store(true, Ordering::SeqCst);
                handle.verify(&3, &3)?;
                handle.verify_that(&"abc", &Matcher::containing("z"))?;
                handle.verify(&4, &4)?;
                Ok(())
            }),
        )
        .await;
    assert!(reached.load(Ordering::SeqCst));
    assert_eq!(
        summary(&outcomes),
        [(Some("C1"), TestStatus::Failed, Some(r#"expected "abc" to contain "z""#))]
    );
}

#[rstest]
#[tokio::test]
async fn targeted_failure_fails_only_that_id(harness: Harness) {
    let outcomes = harness
        .run(
            "[C2345][C3344] demo",
            TestOptions::default().halt_on_verify_failure(false),
            TestBody::new(|handle| async move {
                handle.fail("oops", Some("C2345"))?;
                Ok(())
            }),
        )
        .await;
    assert_eq!(
        summary(&outcomes),
        [
            (Some("C2345"), TestStatus::Failed, Some("oops")),
            (Some("C3344"), TestStatus::Passed, None),
        ]
    );
    assert_eq!(
        harness.recorder.verdicts(),
        [
            Recorded::Fail(Some("C2345".into()), "oops".into()),
            Recorded::Pass(Some("C3344".into())),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn halting_failure_fails_every_id(harness: Harness) {
    let outcomes = harness
        .run(
            "[C1][C2] halted",
            TestOptions::default(),
            TestBody::new(|handle| async move {
                handle.fail("stop here", Some("C1"))?;
                Ok(())
            }),
        )
        .await;
    assert!(outcomes.iter().all(|outcome| {
        outcome.message() == Some("stop here")
            && outcome.failure_kind() == Some(FailureKind::Injected)
    }));
}

#[rstest]
#[tokio::test]
async fn body_errors_and_panics_become_failures(harness: Harness) {
    let errored = harness
        .run(
            "[C1] io",
            TestOptions::default(),
            TestBody::from_fn(|_handle| {
                let parsed: u8 = "many".parse()?;
                assert_eq!(parsed, 0);
                Ok(())
            }),
        )
        .await;
    assert_eq!(
        summary(&errored),
        [(Some("C1"), TestStatus::Failed, Some("invalid digit found in string"))]
    );
    assert_eq!(
        errored.first().and_then(TestOutcome::failure_kind),
        Some(FailureKind::Body)
    );

    let panicked = harness
        .run(
            "[C2] panics",
            TestOptions::default(),
            TestBody::from_fn(|_handle| panic!("unexpected state")),
        )
        .await;
    assert_eq!(
        summary(&panicked),
        [(Some("C2"), TestStatus::Failed, Some("test body panicked: unexpected state"))]
    );
}

#[rstest]
#[tokio::test]
async fn timeout_aborts_the_body(harness: Harness) {
    let reached = Arc::new(AtomicBool::new(false));
    let sentinel = Arc::clone(&reached);
    let outcomes = harness
        .run(
            "[C1] slow",
            TestOptions::default().timeout(Duration::from_millis(50)),
            TestBody::new(move |_handle| async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                sentinel.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await;
    assert!(!reached.load(Ordering::SeqCst));
    assert_eq!(
        summary(&outcomes),
        [(Some("C1"), TestStatus::Failed, Some("test timed out after 50 ms"))]
    );
    assert_eq!(
        outcomes.first().and_then(TestOutcome::failure_kind),
        Some(FailureKind::Timeout)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_blocking_body_cannot_report_after_the_verdict(harness: Harness) {
    let stepped = Arc::new(AtomicBool::new(false));
    let sentinel = Arc::clone(&stepped);
    let outcomes = harness
        .run(
            "[C1] stuck",
            TestOptions::default().timeout(Duration::from_millis(50)),
            TestBody::from_fn(move |handle| {
                std::thread::sleep(Duration::from_millis(300));
                tokio::runtime::Handle::current().block_on(handle.step("late step"));
                sentinel.store(true, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await;
    assert_eq!(
        summary(&outcomes),
        [(Some("C1"), TestStatus::Failed, Some("test timed out after 50 ms"))]
    );
    for _ in 0..100 {
        if stepped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(stepped.load(Ordering::SeqCst), "the abandoned body finishes in the background");
    assert!(harness.recorder.events().is_empty());
    assert_eq!(
        harness.recorder.verdicts(),
        [Recorded::Fail(Some("C1".into()), "test timed out after 50 ms".into())]
    );
}

#[rstest]
#[tokio::test]
async fn body_can_skip_itself(harness: Harness) {
    let outcomes = harness
        .run(
            "[C1] needs staging",
            TestOptions::default(),
            TestBody::new(|handle| async move {
                if handle.test_ids().len() == 1 {
                    return Err(handle.skip("staging unavailable"));
                }
                Ok(())
            }),
        )
        .await;
    assert_eq!(
        summary(&outcomes),
        [(Some("C1"), TestStatus::Skipped, Some("staging unavailable"))]
    );
    assert_eq!(
        harness.recorder.verdicts(),
        [Recorded::Skip(Some("C1".into()), "staging unavailable".into())]
    );
}

#[rstest]
#[tokio::test]
async fn steps_are_numbered_without_gaps(harness: Harness) {
    harness
        .run(
            "[C1] steps",
            TestOptions::default(),
            TestBody::new(|handle| async move {
                for text in ["open page", "log in", "check banner"] {
                    handle.step(text).await;
                }
                handle.reporter().info("between steps").await;
                handle.step("log out").await;
                Ok(())
            }),
        )
        .await;
    assert_eq!(harness.recorder.step_sequences(), [1, 2, 3, 4]);
}

#[rstest]
#[tokio::test]
async fn faulty_reporters_do_not_affect_outcomes() {
    let harness = Harness::with(Vec::new(), true);
    let outcomes = harness
        .run(
            "[C1][C2] noisy",
            TestOptions::default().halt_on_verify_failure(false),
            TestBody::new(|handle| async move {
                handle.step("only step").await;
                handle.fail("bad", Some("C2"))?;
                Ok(())
            }),
        )
        .await;
    assert_eq!(
        summary(&outcomes),
        [
            (Some("C1"), TestStatus::Passed, None),
            (Some("C2"), TestStatus::Failed, Some("bad")),
        ]
    );
    assert_eq!(harness.recorder.step_sequences(), [1]);
    assert_eq!(harness.recorder.verdicts().len(), 2);
}

#[rstest]
#[tokio::test]
async fn lifecycle_callbacks_fire_after_resolution(harness: Harness) {
    let done = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));
    let counter = |count: &Arc<AtomicUsize>| {
        let count = Arc::clone(count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    };
    let options = TestOptions::default()
        .on_event(LifecycleEvent::Fail, || Err("cleanup hook broke".into()))
        .on_event(LifecycleEvent::Done, counter(&done))
        .on_event(LifecycleEvent::Fail, counter(&failed))
        .on_event(LifecycleEvent::Skip, counter(&skipped));

    harness.run("[C1] ok", options.clone(), passing_body()).await;
    assert_eq!(
        (done.load(Ordering::SeqCst), failed.load(Ordering::SeqCst)),
        (1, 0)
    );

    let outcomes = harness
        .run(
            "[C1] bad",
            options,
            TestBody::new(|handle| async move {
                handle.verify(&true, &false)?;
                Ok(())
            }),
        )
        .await;
    assert_eq!(
        (done.load(Ordering::SeqCst), failed.load(Ordering::SeqCst)),
        (2, 1)
    );
    assert_eq!(skipped.load(Ordering::SeqCst), 0);
    assert_eq!(outcomes.first().map(TestOutcome::status), Some(TestStatus::Failed));
    assert!(
        harness
            .recorder
            .events()
            .iter()
            .any(|event| event.text() == "'fail' callback #0 returned an error: cleanup hook broke")
    );
}

#[rstest]
#[tokio::test]
async fn zero_timeout_is_a_programmer_error(harness: Harness) {
    let engine = TestExecutionEngine::new(
        Arc::clone(&harness.registry),
        "[C1] misconfigured",
        TestOptions::default().timeout(Duration::ZERO),
    );
    let result = engine.run(passing_body()).await;
    assert!(matches!(result, Err(EngineError::InvalidOptions(_))));
    assert!(harness.recorder.records().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn engines_run_concurrently_over_one_registry(harness: Harness) {
    let runs = (0..8).map(|index| {
        let registry = Arc::clone(&harness.registry);
        tokio::spawn(async move {
            let description = format!("[C{index}] parallel");
            run_test(
                registry,
                &description,
                TestBody::new(move |handle| async move {
                    handle.step("work").await;
                    handle.verify(&index, &index)?;
                    Ok(())
                }),
                TestOptions::default(),
            )
            .await
        })
    });
    for run in runs.collect::<Vec<_>>() {
        let Ok(Ok(outcomes)) = run.await else {
            panic!("parallel run failed");
        };
        assert_eq!(outcomes.first().map(TestOutcome::status), Some(TestStatus::Passed));
    }
    assert_eq!(harness.recorder.step_sequences(), [1; 8]);
}
