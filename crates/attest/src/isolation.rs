//! Fault isolation for plugin and callback invocations.
//!
//! Every call into third-party code is spawned as its own Tokio task and
//! bounded by a timeout. Errors, panics, and hangs are converted into a
//! [`PluginFault`] so the caller can log them and carry on.

use std::error::Error;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

use crate::panic::panic_message;

/// Boxed error returned by plugins and lifecycle callbacks.
pub type PluginError = Box<dyn Error + Send + Sync + 'static>;

/// Why an isolated invocation did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginFault {
    /// The invocation returned an error.
    #[error("returned an error: {0}")]
    Failed(String),
    /// The invocation panicked.
    #[error("panicked: {0}")]
    Panicked(String),
    /// The invocation did not finish within the bound.
    #[error("timed out after {} ms", .0.as_millis())]
    TimedOut(Duration),
    /// The task was cancelled before it finished.
    #[error("was cancelled")]
    Cancelled,
}

impl From<JoinError> for PluginFault {
    fn from(err: JoinError) -> Self {
        err.try_into_panic()
            .map_or(Self::Cancelled, |payload| {
                Self::Panicked(panic_message(payload.as_ref()))
            })
    }
}

/// Runs `call` on its own task, bounded by `timeout`.
///
/// The task is aborted when the bound elapses so a hung plugin cannot keep
/// running in the background.
pub(crate) async fn isolate<T, F>(timeout: Duration, call: F) -> Result<T, PluginFault>
where
    T: Send + 'static,
    F: Future<Output = Result<T, PluginError>> + Send + 'static,
{
    let mut handle = tokio::spawn(call);
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(err))) => Err(PluginFault::Failed(err.to_string())),
        Ok(Err(join)) => Err(PluginFault::from(join)),
        Err(_) => {
            handle.abort();
            Err(PluginFault::TimedOut(timeout))
        }
    }
}
