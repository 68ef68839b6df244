//! Core runtime for `attest`.
//!
//! `attest` wraps individual test bodies with uniform lifecycle control:
//! policy plugins decide whether a test runs, the body verifies values
//! through a [`TestHandle`], reporting plugins receive structured events, and
//! lifecycle callbacks fire once the outcome is known. A single body may carry
//! several external test-case ids (`[C1234]`), each resolving to its own
//! [`TestOutcome`].
//!
//! Plugins are registered once into a [`PluginRegistry`] and shared across
//! every engine instance. Each call into a plugin or callback is isolated, so
//! a faulty integration never changes a test's result.
//!
//! # Examples
//!
//! ```
//! use attest::{PluginRegistry, TestBody, TestOptions, TestStatus, run_test};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = PluginRegistry::builder().build().unwrap();
//! let outcomes = run_test(
//!     registry,
//!     "[C2345][C3344] demo",
//!     TestBody::new(|handle| async move {
//!         handle.fail("oops", Some("C2345"))?;
//!         Ok(())
//!     }),
//!     TestOptions::default().halt_on_verify_failure(false),
//! )
//! .await
//! .unwrap();
//! let statuses: Vec<_> = outcomes.iter().map(|o| (o.test_id(), o.status())).collect();
//! assert_eq!(
//!     statuses,
//!     [(Some("C2345"), TestStatus::Failed), (Some("C3344"), TestStatus::Passed)]
//! );
//! # });
//! ```

mod config;
mod description;
mod events;
mod execution;
mod isolation;
mod level;
mod matcher;
mod outcome;
mod panic;
mod policy;
mod registry;
pub mod reporting;
mod verification;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{ConfigError, DEFAULT_PLUGIN_TIMEOUT, RuntimeConfig};
pub use description::TestDescription;
pub use events::{EventDispatcher, LifecycleEvent};
pub use execution::{
    BodyFuture, EngineError, TestAbort, TestBody, TestExecutionEngine, TestHandle, TestOptions,
    run_test,
};
pub use isolation::{PluginError, PluginFault};
pub use level::{Level, LevelFilter};
pub use matcher::{Matcher, Predicate, evaluate};
pub use outcome::{FailureKind, TestOutcome, TestStatus};
pub use panic::panic_message;
pub use policy::{PolicyDecision, PolicyEngine, PolicyFaultMode, PolicyPlugin};
pub use registry::{
    LOG_LEVEL_OPTION, PluginRegistration, PluginRegistry, PluginRegistryBuilder,
    PolicyRegistration, ReporterRegistration,
};
pub use reporting::{LogPlugin, Reporter, ReportingEvent, ReportingPlugin};
pub use verification::VerificationResult;
