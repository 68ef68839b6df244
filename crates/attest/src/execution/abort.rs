//! The signal a test body uses to stop early.
//!
//! [`TestAbort`] is returned from the body future rather than raised as a
//! panic. The engine tells the variants apart so a halting verification, an
//! injected failure, a skip request, and an arbitrary body error each resolve
//! to the right outcome.

use std::error::Error;
use std::fmt;

use crate::verification::VerificationResult;

/// Early exit from a test body.
///
/// Any [`std::error::Error`] converts into [`TestAbort::Body`], so `?` works on
/// fallible calls inside a body. `TestAbort` deliberately does not implement
/// `Error` itself, which keeps that blanket conversion coherent.
///
/// # Examples
///
/// ```
/// use attest::TestAbort;
///
/// fn parse(raw: &str) -> Result<u16, TestAbort> {
///     Ok(raw.parse::<u16>()?)
/// }
///
/// let Err(abort) = parse("port") else { panic!("parse should fail") };
/// assert!(matches!(abort, TestAbort::Body(_)));
/// ```
pub enum TestAbort {
    /// A `verify` check failed while halting was enabled.
    Verification(VerificationResult),
    /// The body injected a halting failure.
    Failure {
        /// Failure message.
        message: String,
        /// Id the failure was aimed at, if any.
        test_id: Option<String>,
    },
    /// The body asked to be skipped.
    Skip {
        /// Why the test was skipped.
        reason: String,
    },
    /// The body failed for a reason unrelated to verification.
    Body(String),
}

impl TestAbort {
    /// Builds a body fault from a message.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body(message.into())
    }

    /// Human-readable description used as the outcome message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Verification(result) => result
                .message()
                .map_or_else(|| "verification failed".to_owned(), str::to_owned),
            Self::Failure { message, .. } | Self::Skip { reason: message } | Self::Body(message) => {
                message.clone()
            }
        }
    }

    /// Returns `true` for a skip request.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

impl<E> From<E> for TestAbort
where
    E: Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::Body(err.to_string())
    }
}

impl fmt::Display for TestAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verification(_) => write!(f, "verification failed: {}", self.message()),
            Self::Failure { message, .. } => write!(f, "failure injected: {message}"),
            Self::Skip { reason } => write!(f, "skip requested: {reason}"),
            Self::Body(message) => write!(f, "test body failed: {message}"),
        }
    }
}

impl fmt::Debug for TestAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verification(result) => f.debug_tuple("Verification").field(result).finish(),
            Self::Failure { message, test_id } => f
                .debug_struct("Failure")
                .field("message", message)
                .field("test_id", test_id)
                .finish(),
            Self::Skip { reason } => f.debug_struct("Skip").field("reason", reason).finish(),
            Self::Body(message) => f.debug_tuple("Body").field(message).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TestAbort;
    use crate::matcher::Matcher;
    use serde_json::json;

    #[test]
    fn question_mark_turns_errors_into_body_faults() {
        fn read() -> Result<(), TestAbort> {
            serde_json::from_str::<serde_json::Value>("{")?;
            Ok(())
        }
        let Err(TestAbort::Body(message)) = read() else {
            panic!("malformed JSON must abort as a body fault");
        };
        assert!(message.contains("EOF"), "unexpected message: {message}");
    }

    #[test]
    fn verification_message_comes_from_result() {
        let result = Matcher::equaling(json!(2)).evaluate(json!(1));
        let abort = TestAbort::Verification(result);
        assert_eq!(abort.message(), "expected 1 to equal 2");
        assert_eq!(abort.to_string(), "verification failed: expected 1 to equal 2");
    }

    #[test]
    fn skip_is_recognised() {
        let abort = TestAbort::Skip {
            reason: "flaky upstream".into(),
        };
        assert!(abort.is_skip());
        assert_eq!(abort.message(), "flaky upstream");
    }
}
