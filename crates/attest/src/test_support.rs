//! Plugin doubles for exercising the engine in tests.
//!
//! Compiled for this crate's unit tests and, behind the `test-support`
//! feature, for downstream behavioural tests.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::isolation::PluginError;
use crate::policy::PolicyPlugin;
use crate::reporting::{ReportingEvent, ReportingPlugin};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One call received by a [`RecordingPlugin`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// A log or step event.
    Log(ReportingEvent),
    /// A pass notification.
    Pass(Option<String>),
    /// A fail notification with its message.
    Fail(Option<String>, String),
    /// A skip notification with its reason.
    Skip(Option<String>, String),
}

/// Reporting plugin that stores every call in arrival order.
#[derive(Debug, Default)]
pub struct RecordingPlugin {
    records: Mutex<Vec<Recorded>>,
}

impl RecordingPlugin {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call received so far.
    #[must_use]
    pub fn records(&self) -> Vec<Recorded> {
        lock(&self.records).clone()
    }

    /// Log and step events only.
    #[must_use]
    pub fn events(&self) -> Vec<ReportingEvent> {
        lock(&self.records)
            .iter()
            .filter_map(|record| match record {
                Recorded::Log(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sequence numbers of step events in arrival order.
    #[must_use]
    pub fn step_sequences(&self) -> Vec<u32> {
        self.events()
            .iter()
            .filter_map(ReportingEvent::sequence)
            .collect()
    }

    /// Pass, fail, and skip notifications only.
    #[must_use]
    pub fn verdicts(&self) -> Vec<Recorded> {
        lock(&self.records)
            .iter()
            .filter(|record| !matches!(record, Recorded::Log(_)))
            .cloned()
            .collect()
    }

    fn push(&self, record: Recorded) {
        lock(&self.records).push(record);
    }
}

#[async_trait]
impl ReportingPlugin for RecordingPlugin {
    async fn log(&self, event: &ReportingEvent) -> Result<(), PluginError> {
        self.push(Recorded::Log(event.clone()));
        Ok(())
    }

    async fn on_pass(&self, test_id: Option<&str>) -> Result<(), PluginError> {
        self.push(Recorded::Pass(test_id.map(str::to_owned)));
        Ok(())
    }

    async fn on_fail(&self, test_id: Option<&str>, message: &str) -> Result<(), PluginError> {
        self.push(Recorded::Fail(test_id.map(str::to_owned), message.to_owned()));
        Ok(())
    }

    async fn on_skip(&self, test_id: Option<&str>, reason: &str) -> Result<(), PluginError> {
        self.push(Recorded::Skip(test_id.map(str::to_owned), reason.to_owned()));
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fault {
    Error,
    Panic,
    Hang,
}

/// Plugin that faults on every call, usable as a reporting or policy plugin.
#[derive(Debug)]
pub struct FaultyPlugin {
    fault: Fault,
}

impl FaultyPlugin {
    /// Returns an error from every call.
    #[must_use]
    pub const fn erroring() -> Self {
        Self { fault: Fault::Error }
    }

    /// Panics in every call.
    #[must_use]
    pub const fn panicking() -> Self {
        Self { fault: Fault::Panic }
    }

    /// Never completes within any reasonable plugin bound.
    #[must_use]
    pub const fn hanging() -> Self {
        Self { fault: Fault::Hang }
    }

    async fn misbehave<T: Send>(&self) -> Result<T, PluginError> {
        match self.fault {
            Fault::Error => Err("faulty plugin refused".into()),
            Fault::Panic => panic!("faulty plugin panicked"),
            Fault::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err("faulty plugin woke up".into())
            }
        }
    }
}

#[async_trait]
impl ReportingPlugin for FaultyPlugin {
    async fn log(&self, _event: &ReportingEvent) -> Result<(), PluginError> {
        self.misbehave().await
    }

    async fn on_pass(&self, _test_id: Option<&str>) -> Result<(), PluginError> {
        self.misbehave().await
    }

    async fn on_fail(&self, _test_id: Option<&str>, _message: &str) -> Result<(), PluginError> {
        self.misbehave().await
    }

    async fn on_skip(&self, _test_id: Option<&str>, _reason: &str) -> Result<(), PluginError> {
        self.misbehave().await
    }
}

#[async_trait]
impl PolicyPlugin for FaultyPlugin {
    async fn should_run(&self, _test_ids: &[String]) -> Result<bool, PluginError> {
        self.misbehave().await
    }
}

/// Policy plugin returning a fixed verdict and remembering each query.
#[derive(Debug)]
pub struct StaticPolicy {
    allow: bool,
    queries: Mutex<Vec<Vec<String>>>,
}

impl StaticPolicy {
    /// Approves every test.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allow: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Vetoes every test.
    #[must_use]
    pub fn deny() -> Self {
        Self {
            allow: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Id sets this policy was asked about, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<Vec<String>> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl PolicyPlugin for StaticPolicy {
    async fn should_run(&self, test_ids: &[String]) -> Result<bool, PluginError> {
        lock(&self.queries).push(test_ids.to_vec());
        Ok(self.allow)
    }
}
