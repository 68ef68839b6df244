//! Harness adapter contracts for `attest`.
//!
//! This crate provides a framework-agnostic interface for handing a test to
//! the `attest` engine from a host test runner, and for translating the
//! resulting outcomes into the host's pass, fail, or skip signal.

mod adapter;
mod error;
mod runner;
mod verdict;

pub use adapter::HarnessAdapter;
pub use error::HarnessError;
pub use runner::TestRunRequest;
pub use verdict::HostVerdict;
