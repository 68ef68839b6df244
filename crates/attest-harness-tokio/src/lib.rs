//! Tokio harness adapter for `attest`.
//!
//! This crate provides a blocking harness that drives the async `attest`
//! engine inside a current-thread Tokio runtime, so plain `#[test]` functions
//! can run engine-managed bodies.

mod tokio_harness;

pub use tokio_harness::TokioHarness;
