//! Errors raised by harness adapters.

use attest::EngineError;
use thiserror::Error;

/// Why a harness could not produce outcomes for a request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HarnessError {
    /// The engine rejected the request's options.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The harness could not set up its runtime.
    #[error("failed to start the harness runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
