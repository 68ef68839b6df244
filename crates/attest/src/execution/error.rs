//! Errors returned by the execution entry points.

use thiserror::Error;

/// Programmer errors rejected before a test runs.
///
/// Failures inside the body never surface here; they resolve to failed
/// outcomes instead.
///
/// # Examples
///
/// ```
/// use attest::EngineError;
///
/// let err = EngineError::InvalidOptions("timeout must be greater than zero".into());
/// assert_eq!(
///     err.to_string(),
///     "invalid test options: timeout must be greater than zero"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The supplied [`TestOptions`](crate::TestOptions) cannot be honoured.
    #[error("invalid test options: {0}")]
    InvalidOptions(String),
}
