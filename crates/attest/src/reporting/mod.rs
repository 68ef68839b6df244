//! Fan-out reporting facade.
//!
//! A [`Reporter`] belongs to one test invocation. It formats each call into a
//! [`ReportingEvent`], filters it against the configured threshold, and hands
//! it to every registered [`ReportingPlugin`] in registration order. Plugin
//! faults are logged through the `log` facade and counted, never propagated.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, RwLock};

use crate::description::TestDescription;
use crate::isolation::{PluginError, isolate};
use crate::level::{Level, LevelFilter};
use crate::registry::PluginRegistry;

mod event;
/// JSON writer for test outcomes.
pub mod json;
mod log_plugin;
mod plugin;

pub use event::ReportingEvent;
pub use log_plugin::LogPlugin;
pub use plugin::ReportingPlugin;

/// Per-test reporting facade.
///
/// Step numbers start at 1 and increase by one per [`Reporter::step`] call.
/// A step is numbered and delivered under one lock, so plugins see sequence
/// numbers in order even when handle clones step concurrently.
/// Pass, fail, and skip notifications bypass the threshold.
///
/// Once the engine knows the body's terminal state it seals the reporter:
/// leveled and step events arriving after that are dropped, while verdicts
/// and callback faults are still delivered.
pub struct Reporter {
    registry: Arc<PluginRegistry>,
    description: String,
    threshold: LevelFilter,
    last_step: Mutex<u32>,
    sealed: RwLock<bool>,
    faults: AtomicUsize,
}

impl Reporter {
    /// Creates a reporter for one test.
    #[must_use]
    pub fn new(
        registry: Arc<PluginRegistry>,
        description: &TestDescription,
        threshold: LevelFilter,
    ) -> Self {
        Self {
            registry,
            description: description.text().to_owned(),
            threshold,
            last_step: Mutex::new(0),
            sealed: RwLock::new(false),
            faults: AtomicUsize::new(0),
        }
    }

    /// Description of the test this reporter serves.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Threshold applied to leveled events.
    #[must_use]
    pub fn threshold(&self) -> LevelFilter {
        self.threshold
    }

    /// Number of plugin invocations that faulted so far.
    #[must_use]
    pub fn fault_count(&self) -> usize {
        self.faults.load(Ordering::Relaxed)
    }

    /// Emits a leveled event. [`Level::Step`] is routed through
    /// [`Reporter::step`] so it receives a sequence number.
    pub async fn log(&self, level: Level, text: impl Into<String>) {
        if level == Level::Step {
            self.step(text).await;
            return;
        }
        let event = ReportingEvent::new(level, self.description.as_str(), None, text);
        self.emit(event).await;
    }

    /// Emits an error event.
    pub async fn error(&self, text: impl Into<String>) {
        self.log(Level::Error, text).await;
    }

    /// Emits a warning event.
    pub async fn warn(&self, text: impl Into<String>) {
        self.log(Level::Warn, text).await;
    }

    /// Emits an informational event.
    pub async fn info(&self, text: impl Into<String>) {
        self.log(Level::Info, text).await;
    }

    /// Emits a debug event.
    pub async fn debug(&self, text: impl Into<String>) {
        self.log(Level::Debug, text).await;
    }

    /// Emits a trace event.
    pub async fn trace(&self, text: impl Into<String>) {
        self.log(Level::Trace, text).await;
    }

    /// Emits a step event and returns its sequence number.
    pub async fn step(&self, text: impl Into<String>) -> u32 {
        let mut last = self.last_step.lock().await;
        *last = last.saturating_add(1);
        let sequence = *last;
        let event = ReportingEvent::new(Level::Step, self.description.as_str(), Some(sequence), text);
        self.emit(event).await;
        sequence
    }

    /// Stops delivery of leveled and step events.
    ///
    /// Waits for deliveries already in flight, so no body event reaches a
    /// plugin after this returns.
    pub(crate) async fn seal(&self) {
        *self.sealed.write().await = true;
    }

    /// Emits an error event that ignores both the threshold and the seal.
    pub(crate) async fn alert(&self, text: impl Into<String>) {
        let event = ReportingEvent::new(Level::Error, self.description.as_str(), None, text);
        self.deliver("alert", None, |plugin| {
            let event = event.clone();
            async move { plugin.log(&event).await }
        })
        .await;
    }

    /// Notifies plugins that `test_id` passed.
    pub async fn pass(&self, test_id: Option<&str>) {
        let test_id = test_id.map(str::to_owned);
        self.deliver("pass", None, |plugin| {
            let test_id = test_id.clone();
            async move { plugin.on_pass(test_id.as_deref()).await }
        })
        .await;
    }

    /// Notifies plugins that `test_id` failed.
    pub async fn fail(&self, test_id: Option<&str>, message: &str) {
        let test_id = test_id.map(str::to_owned);
        let message = message.to_owned();
        self.deliver("fail", None, |plugin| {
            let test_id = test_id.clone();
            let message = message.clone();
            async move { plugin.on_fail(test_id.as_deref(), &message).await }
        })
        .await;
    }

    /// Notifies plugins that `test_id` was skipped.
    pub async fn skip(&self, test_id: Option<&str>, reason: &str) {
        let test_id = test_id.map(str::to_owned);
        let reason = reason.to_owned();
        self.deliver("skip", None, |plugin| {
            let test_id = test_id.clone();
            let reason = reason.clone();
            async move { plugin.on_skip(test_id.as_deref(), &reason).await }
        })
        .await;
    }

    async fn emit(&self, event: ReportingEvent) {
        let sealed = self.sealed.read().await;
        if *sealed {
            log::debug!(
                "dropped {} event for '{}' after the body resolved: {}",
                event.level().as_str(),
                self.description,
                event.text()
            );
            return;
        }
        let level = event.level();
        self.deliver(level.as_str(), Some(level), |plugin| {
            let event = event.clone();
            async move { plugin.log(&event).await }
        })
        .await;
        drop(sealed);
    }

    async fn deliver<F, Fut>(&self, what: &str, level: Option<Level>, call: F)
    where
        F: Fn(Arc<dyn ReportingPlugin>) -> Fut,
        Fut: Future<Output = Result<(), PluginError>> + Send + 'static,
    {
        for registration in self.registry.reporters() {
            let threshold = registration.level_override().unwrap_or(self.threshold);
            if level.is_some_and(|level| !threshold.allows(level)) {
                continue;
            }
            let call = call(Arc::clone(registration.plugin()));
            if let Err(fault) = isolate(self.registry.plugin_timeout(), call).await {
                self.faults.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "reporting plugin '{}' {fault} while handling a {what} event for '{}'",
                    registration.name(),
                    self.description
                );
            }
        }
    }
}
