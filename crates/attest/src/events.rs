//! Lifecycle callbacks fired after a test resolves.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::isolation::{PluginError, isolate};
use crate::reporting::Reporter;

/// Lifecycle points a callback can be attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleEvent {
    /// Fired once for every test, whatever its outcome.
    Done,
    /// Fired when at least one outcome failed.
    Fail,
    /// Fired when the test was skipped.
    Skip,
}

impl LifecycleEvent {
    /// Lowercase event name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type CallbackFuture = Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send>>;
type Callback = Arc<dyn Fn() -> CallbackFuture + Send + Sync>;

/// Ordered callbacks keyed by [`LifecycleEvent`].
///
/// # Examples
///
/// ```
/// use attest::{EventDispatcher, LifecycleEvent};
///
/// let mut events = EventDispatcher::new();
/// events.register_sync(LifecycleEvent::Done, || Ok(()));
/// assert_eq!(events.len(LifecycleEvent::Done), 1);
/// assert_eq!(events.len(LifecycleEvent::Fail), 0);
/// ```
#[derive(Clone, Default)]
pub struct EventDispatcher {
    callbacks: BTreeMap<LifecycleEvent, Vec<Callback>>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an asynchronous callback for `event`.
    pub fn register<F, Fut>(&mut self, event: LifecycleEvent, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PluginError>> + Send + 'static,
    {
        let callback: Callback = Arc::new(move || Box::pin(callback()));
        self.callbacks.entry(event).or_default().push(callback);
    }

    /// Appends a synchronous callback for `event`.
    pub fn register_sync<F>(&mut self, event: LifecycleEvent, callback: F)
    where
        F: Fn() -> Result<(), PluginError> + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        self.register(event, move || {
            let callback = Arc::clone(&callback);
            async move { callback() }
        });
    }

    /// Number of callbacks registered for `event`.
    #[must_use]
    pub fn len(&self, event: LifecycleEvent) -> usize {
        self.callbacks.get(&event).map_or(0, Vec::len)
    }

    /// Returns `true` when no callbacks are registered for any event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.values().all(Vec::is_empty)
    }

    /// Runs every callback for `event` in registration order and waits for
    /// each to finish.
    ///
    /// Each callback is isolated and bounded by `timeout`. Faults are
    /// reported as error events through `reporter` regardless of its
    /// threshold, and do not stop later callbacks. Returns the number of callbacks that faulted.
    pub async fn dispatch(
        &self,
        event: LifecycleEvent,
        reporter: &Reporter,
        timeout: Duration,
    ) -> usize {
        let Some(callbacks) = self.callbacks.get(&event) else {
            return 0;
        };
        let mut faults = 0;
        for (index, callback) in callbacks.iter().enumerate() {
            if let Err(fault) = isolate(timeout, callback()).await {
                faults += 1;
                log::warn!(
                    "'{event}' callback #{index} {fault} for '{}'",
                    reporter.description()
                );
                reporter
                    .alert(format!("'{event}' callback #{index} {fault}"))
                    .await;
            }
        }
        faults
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (event, callbacks) in &self.callbacks {
            map.entry(event, &callbacks.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::TestDescription;
    use crate::level::LevelFilter;
    use crate::registry::{PluginRegistry, ReporterRegistration};
    use crate::reporting::ReportingPlugin;
    use crate::test_support::RecordingPlugin;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    type Journal = Arc<Mutex<Vec<&'static str>>>;

    fn entries(log: &Journal) -> MutexGuard<'_, Vec<&'static str>> {
        log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reporter(recorder: &Arc<RecordingPlugin>) -> Reporter {
        reporter_at(recorder, LevelFilter::Info)
    }

    fn reporter_at(recorder: &Arc<RecordingPlugin>, threshold: LevelFilter) -> Reporter {
        let Ok(registry) = PluginRegistry::builder()
            .reporter(ReporterRegistration::new(
                "rec",
                Arc::clone(recorder) as Arc<dyn ReportingPlugin>,
            ))
            .build()
        else {
            panic!("test registry must build");
        };
        Reporter::new(registry, &TestDescription::parse("[C9] hooks"), threshold)
    }

    fn push_to(
        log: &Journal,
        entry: &'static str,
    ) -> impl Fn() -> Result<(), PluginError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move || {
            entries(&log).push(entry);
            Ok(())
        }
    }

    #[tokio::test]
    async fn runs_callbacks_in_registration_order() {
        let log: Journal = Arc::default();
        let mut events = EventDispatcher::new();
        events.register_sync(LifecycleEvent::Done, push_to(&log, "first"));
        let async_log = Arc::clone(&log);
        events.register(LifecycleEvent::Done, move || {
            let log = Arc::clone(&async_log);
            async move {
                tokio::task::yield_now().await;
                entries(&log).push("second");
                Ok(())
            }
        });
        events.register_sync(LifecycleEvent::Fail, push_to(&log, "fail only"));
        let recorder = Arc::new(RecordingPlugin::new());
        let faults = events
            .dispatch(LifecycleEvent::Done, &reporter(&recorder), Duration::from_secs(1))
            .await;
        assert_eq!(faults, 0);
        assert_eq!(*entries(&log), ["first", "second"]);
    }

    #[tokio::test]
    async fn faulting_callback_is_reported_and_skipped_over() {
        let log: Journal = Arc::default();
        let mut events = EventDispatcher::new();
        events.register_sync(LifecycleEvent::Done, || Err("cleanup failed".into()));
        events.register_sync(LifecycleEvent::Done, || panic!("cleanup exploded"));
        events.register_sync(LifecycleEvent::Done, push_to(&log, "survivor"));
        let recorder = Arc::new(RecordingPlugin::new());
        let faults = events
            .dispatch(LifecycleEvent::Done, &reporter(&recorder), Duration::from_secs(1))
            .await;
        assert_eq!(faults, 2);
        assert_eq!(*entries(&log), ["survivor"]);
        let texts: Vec<_> = recorder.events().iter().map(|event| event.text().to_owned()).collect();
        assert_eq!(
            texts,
            [
                "'done' callback #0 returned an error: cleanup failed",
                "'done' callback #1 panicked: cleanup exploded",
            ]
        );
    }

    #[tokio::test]
    async fn callback_faults_ignore_threshold_and_seal() {
        let mut events = EventDispatcher::new();
        events.register_sync(LifecycleEvent::Fail, || Err("teardown refused".into()));
        let recorder = Arc::new(RecordingPlugin::new());
        let reporter = reporter_at(&recorder, LevelFilter::None);
        reporter.seal().await;
        reporter.error("dropped").await;
        let faults = events
            .dispatch(LifecycleEvent::Fail, &reporter, Duration::from_secs(1))
            .await;
        assert_eq!(faults, 1);
        let texts: Vec<_> = recorder.events().iter().map(|event| event.text().to_owned()).collect();
        assert_eq!(texts, ["'fail' callback #0 returned an error: teardown refused"]);
    }

    #[tokio::test]
    async fn unregistered_event_is_a_no_op() {
        let recorder = Arc::new(RecordingPlugin::new());
        let faults = EventDispatcher::new()
            .dispatch(LifecycleEvent::Skip, &reporter(&recorder), Duration::from_secs(1))
            .await;
        assert_eq!(faults, 0);
        assert!(recorder.records().is_empty());
    }
}
