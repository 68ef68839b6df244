//! Owned, type-erased test bodies.

use std::fmt;
use std::future::Future;
use std::panic;
use std::pin::Pin;

use crate::execution::{TestAbort, TestHandle};

/// Future produced by a started test body.
pub type BodyFuture = Pin<Box<dyn Future<Output = Result<(), TestAbort>> + Send>>;

/// An async test body awaiting its [`TestHandle`].
///
/// # Examples
///
/// ```
/// use attest::TestBody;
///
/// let body = TestBody::new(|handle| async move {
///     handle.verify(&(2 + 2), &4)?;
///     Ok(())
/// });
/// # drop(body);
/// ```
pub struct TestBody {
    inner: Box<dyn FnOnce(TestHandle) -> BodyFuture + Send>,
}

impl TestBody {
    /// Wraps an async closure as a test body.
    #[must_use]
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(TestHandle) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TestAbort>> + Send + 'static,
    {
        Self {
            inner: Box::new(move |handle| Box::pin(body(handle))),
        }
    }

    /// Wraps a synchronous closure as a test body.
    ///
    /// The closure runs on Tokio's blocking pool, so a body that blocks its
    /// thread cannot stall the runtime or hold off the engine's timeout. A
    /// timed-out closure is abandoned and keeps its thread until it returns.
    /// Panics are re-raised on the engine's side with their payload intact.
    #[must_use]
    pub fn from_fn<F>(body: F) -> Self
    where
        F: FnOnce(TestHandle) -> Result<(), TestAbort> + Send + 'static,
    {
        Self::new(move |handle| async move {
            tokio::task::spawn_blocking(move || body(handle))
                .await
                .unwrap_or_else(|join| {
                    join.try_into_panic().map_or_else(
                        |_| Err(TestAbort::Body("test body was cancelled".to_owned())),
                        |payload| panic::resume_unwind(payload),
                    )
                })
        })
    }

    pub(crate) fn start(self, handle: TestHandle) -> BodyFuture {
        (self.inner)(handle)
    }
}

impl fmt::Debug for TestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestBody").finish_non_exhaustive()
    }
}
